//! Posts one weather tweet to `/tweet` every 1 to 5 seconds.

use serde_json::json;

use crate::payload::PayloadProfile;
use crate::swarm::{Scheduler, SwarmUser, TaskResult};
use crate::task;
use crate::SwarmError;

pub const TWEET_PATH: &str = "/tweet";

/// Declare the basic behavior on `scheduler`.
pub fn register<S: Scheduler>(scheduler: &mut S) -> Result<(), SwarmError> {
    scheduler.register_task(task!(send_tweet).set_name("send_tweet"))?;
    scheduler.set_pacing(1.0, 5.0)
}

/// Post a tweet. The response is not inspected.
pub async fn send_tweet(user: &mut SwarmUser) -> TaskResult {
    let tweet = PayloadProfile::BASIC.build(user.rng());
    debug!(
        "[user {}]: tweeting {} from {}",
        user.weighted_users_index, tweet.weather, tweet.municipality
    );
    let _response = user.post(TWEET_PATH, &json!(tweet), &[]).await?;

    Ok(())
}
