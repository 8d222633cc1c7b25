//! Posts weather tweets to `/api/tweets` and checks `/health`, pacing 0.1 to 0.5
//! seconds.
//!
//! A tweet answered with anything but `200 OK` prints one diagnostic line:
//!
//! ```text
//! Error: 500 - server error
//! ```

use http::StatusCode;
use serde_json::json;

use crate::payload::{Municipality, PayloadProfile};
use crate::swarm::{Scheduler, SwarmUser, TaskResult};
use crate::task;
use crate::SwarmError;

pub const TWEETS_PATH: &str = "/api/tweets";
pub const HEALTH_PATH: &str = "/health";

/// Municipality assigned to each last digit of a student id.
///
/// Not consulted when building tweets: every tweet reports from
/// [`PINNED_MUNICIPALITY`](../../payload/constant.PINNED_MUNICIPALITY.html).
pub const MUNICIPALITY_BY_DIGIT: [Municipality; 10] = [
    Municipality::Mixco,
    Municipality::Mixco,
    Municipality::Mixco,
    Municipality::Guatemala,
    Municipality::Guatemala,
    Municipality::Guatemala,
    Municipality::Amatitlan,
    Municipality::Amatitlan,
    Municipality::Chinautla,
    Municipality::Chinautla,
];

/// Declare the extended behavior on `scheduler`.
pub fn register<S: Scheduler>(scheduler: &mut S) -> Result<(), SwarmError> {
    scheduler.register_task(task!(send_weather_tweet).set_name("send_weather_tweet"))?;
    scheduler.register_task(task!(health_check).set_name("health_check"))?;
    scheduler.set_pacing(0.1, 0.5)
}

/// Post a tweet, printing a diagnostic if it isn't accepted with `200 OK`.
pub async fn send_weather_tweet(user: &mut SwarmUser) -> TaskResult {
    let tweet = PayloadProfile::EXTENDED.build(user.rng());
    let response = user
        .post(
            TWEETS_PATH,
            &json!(tweet),
            &[("Content-Type", "application/json")],
        )
        .await?;

    if response.status != StatusCode::OK {
        user.diagnostic(&format!(
            "Error: {} - {}",
            response.status.as_u16(),
            response.body
        ));
    }

    Ok(())
}

/// Load `/health`. Any status is fine.
pub async fn health_check(user: &mut SwarmUser) -> TaskResult {
    let _response = user.get(HEALTH_PATH).await?;

    Ok(())
}
