use tweetswarm::prelude::*;
use tweetswarm::tweets;

#[tokio::main]
async fn main() -> Result<(), SwarmError> {
    let summary = SwarmAttack::initialize()?
        .register_behavior(tweets::basic()?)
        .register_behavior(tweets::extended()?)
        .execute()
        .await?;
    println!("{}", summary);

    Ok(())
}
