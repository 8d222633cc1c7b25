//! The weather tweet behaviors.
//!
//! - [`basic`](./basic/index.html): one task posting to `/tweet`, pacing 1 to 5 seconds.
//! - [`extended`](./extended/index.html): posting to `/api/tweets` and checking
//!   `/health`, pacing 0.1 to 0.5 seconds.
//!
//! Each module declares its tasks through a [`Scheduler`](../swarm/trait.Scheduler.html),
//! so they can be registered with any scheduler. [`basic()`] and [`extended()`] build a
//! ready to run [`Behavior`](../swarm/struct.Behavior.html).

pub mod basic;
pub mod extended;

use crate::swarm::Behavior;
use crate::SwarmError;

/// Name of the basic behavior, as passed to `--behavior`.
pub const BASIC: &str = "basic";
/// Name of the extended behavior, as passed to `--behavior`.
pub const EXTENDED: &str = "extended";

/// Build the basic behavior.
pub fn basic() -> Result<Behavior, SwarmError> {
    let mut behavior = Behavior::new(BASIC);
    basic::register(&mut behavior)?;
    Ok(behavior)
}

/// Build the extended behavior.
pub fn extended() -> Result<Behavior, SwarmError> {
    let mut behavior = Behavior::new(EXTENDED);
    extended::register(&mut behavior)?;
    Ok(behavior)
}
