//! # tweetswarm
//!
//! A load generator that simulates users posting synthetic "weather tweets" to an
//! HTTP API.
//!
//! Each simulated user repeatedly picks a task from its [`Behavior`](./swarm/struct.Behavior.html),
//! runs it, and then idles for a randomly sampled pacing interval. Two behaviors are
//! provided in the [`tweets`](./tweets/index.html) module:
//!
//! - `basic`: posts a tweet to `/tweet` every 1 to 5 seconds.
//! - `extended`: posts a tweet to `/api/tweets` or checks `/health` every 0.1 to 0.5
//!   seconds, printing a diagnostic line when a tweet is not accepted with `200 OK`.
//!
//! ## Running a swarm
//!
//! ```bash
//! $ tweetswarm --host http://localhost:8080 --behavior extended --users 50 --hatch-rate 10 --run-time 5m
//! ```
//!
//! ## Embedding
//!
//! Behaviors are plain data. Tasks are async functions that take a
//! [`SwarmUser`](./swarm/struct.SwarmUser.html) and are wrapped with the
//! [`task!`](macro.task.html) macro:
//!
//! ```rust,no_run
//! use tweetswarm::prelude::*;
//! use tweetswarm::tweets;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), SwarmError> {
//!     let summary = SwarmAttack::initialize()?
//!         .register_behavior(tweets::basic()?)
//!         .register_behavior(tweets::extended()?)
//!         .execute()
//!         .await?;
//!     println!("{}", summary);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## License
//!
//! Licensed under the Apache License, Version 2.0 (the "License");
//! you may not use this file except in compliance with the License.
//! You may obtain a copy of the License at
//!
//! <http://www.apache.org/licenses/LICENSE-2.0>
//!
//! Unless required by applicable law or agreed to in writing, software
//! distributed under the License is distributed on an "AS IS" BASIS,
//! WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//! See the License for the specific language governing permissions and
//! limitations under the License.

#[macro_use]
extern crate log;

pub mod client;
pub mod config;
pub mod logger;
pub mod payload;
pub mod prelude;
pub mod swarm;
pub mod tweets;
mod user;
pub mod util;

use chrono::prelude::*;
use gumdrop::Options;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::{fmt, io, time};

use crate::client::{HttpClient, ReqwestClient};
use crate::config::SwarmConfiguration;
use crate::logger::{DiagnosticWriter, StdoutDiagnostics};
use crate::swarm::{Behavior, SwarmUser, SwarmUserCommand};

/// Set by the ctrl-c handler, checked by the parent while launching and running users.
pub(crate) static CANCELED: AtomicBool = AtomicBool::new(false);

/// How often the parent wakes to check if the swarm should stop.
const PARENT_POLL_MS: u64 = 100;

/// An enumeration of all errors a [`SwarmAttack`](./struct.SwarmAttack.html) can return.
#[derive(Debug)]
pub enum SwarmError {
    /// Wraps a [`std::io::Error`](https://doc.rust-lang.org/std/io/struct.Error.html).
    Io(io::Error),
    /// Wraps a [`reqwest::Error`](https://docs.rs/reqwest/*/reqwest/struct.Error.html).
    Reqwest(reqwest::Error),
    /// Wraps a ['tokio::task::JoinError'](https://docs.rs/tokio/*/tokio/task/struct.JoinError.html).
    TokioJoin(tokio::task::JoinError),
    /// Failed to parse a hostname.
    InvalidHost {
        /// The invalid hostname that caused this error.
        host: String,
        /// An optional explanation of the error.
        detail: String,
        /// Wraps a [`url::ParseError`](https://docs.rs/url/*/url/enum.ParseError.html).
        parse_error: url::ParseError,
    },
    /// Invalid option or value specified, may only be invalid in context.
    InvalidOption {
        /// The invalid option that caused this error, may be only invalid in context.
        option: String,
        /// The invalid value that caused this error, may be only invalid in context.
        value: String,
        /// An optional explanation of the error.
        detail: String,
    },
    /// Invalid pacing interval specified.
    InvalidWaitTime {
        /// The specified minimum wait, in seconds.
        min_wait: f64,
        /// The specified maximum wait, in seconds.
        max_wait: f64,
        /// An optional explanation of the error.
        detail: String,
    },
    /// Invalid weight specified.
    InvalidWeight {
        /// The specified weight.
        weight: usize,
        /// An optional explanation of the error.
        detail: String,
    },
    /// [`SwarmAttack`](./struct.SwarmAttack.html) has no [`Behavior`](./swarm/struct.Behavior.html) registered.
    NoBehaviors {
        /// An optional explanation of the error.
        detail: String,
    },
}
/// Implement a helper to provide a text description of all possible types of errors.
impl SwarmError {
    fn describe(&self) -> &str {
        match *self {
            SwarmError::Io(_) => "io::Error",
            SwarmError::Reqwest(_) => "reqwest::Error",
            SwarmError::TokioJoin(_) => "tokio::task::JoinError",
            SwarmError::InvalidHost { .. } => "failed to parse hostname",
            SwarmError::InvalidOption { .. } => "invalid option or value specified",
            SwarmError::InvalidWaitTime { .. } => "invalid wait time specified",
            SwarmError::InvalidWeight { .. } => "invalid weight specified",
            SwarmError::NoBehaviors { .. } => "no behaviors registered",
        }
    }
}

impl fmt::Display for SwarmError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            SwarmError::Io(ref source) => write!(f, "SwarmError: {} ({})", self.describe(), source),
            SwarmError::Reqwest(ref source) => {
                write!(f, "SwarmError: {} ({})", self.describe(), source)
            }
            SwarmError::TokioJoin(ref source) => {
                write!(f, "SwarmError: {} ({})", self.describe(), source)
            }
            SwarmError::InvalidHost {
                ref host,
                ref parse_error,
                ..
            } => write!(
                f,
                "SwarmError: {} {} ({})",
                self.describe(),
                host,
                parse_error
            ),
            SwarmError::InvalidOption {
                ref option,
                ref value,
                ref detail,
            } => write!(
                f,
                "SwarmError: {}: {}={} ({})",
                self.describe(),
                option,
                value,
                detail
            ),
            SwarmError::InvalidWaitTime {
                min_wait,
                max_wait,
                ref detail,
            } => write!(
                f,
                "SwarmError: {}: {}..{} ({})",
                self.describe(),
                min_wait,
                max_wait,
                detail
            ),
            _ => write!(f, "SwarmError: {}", self.describe()),
        }
    }
}

// Define the lower level source of this error, if any.
impl std::error::Error for SwarmError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match *self {
            SwarmError::Io(ref source) => Some(source),
            SwarmError::Reqwest(ref source) => Some(source),
            SwarmError::TokioJoin(ref source) => Some(source),
            SwarmError::InvalidHost {
                ref parse_error, ..
            } => Some(parse_error),
            _ => None,
        }
    }
}

/// Auto-convert Reqwest errors.
impl From<reqwest::Error> for SwarmError {
    fn from(err: reqwest::Error) -> SwarmError {
        SwarmError::Reqwest(err)
    }
}

/// Auto-convert IO errors.
impl From<io::Error> for SwarmError {
    fn from(err: io::Error) -> SwarmError {
        SwarmError::Io(err)
    }
}

/// Auto-convert TokioJoin errors.
impl From<tokio::task::JoinError> for SwarmError {
    fn from(err: tokio::task::JoinError) -> SwarmError {
        SwarmError::TokioJoin(err)
    }
}

/// What a completed [`SwarmAttack`](./struct.SwarmAttack.html) reports back.
#[derive(Clone, Debug)]
pub struct SwarmSummary {
    /// Name of the behavior every user ran.
    pub behavior: String,
    /// How many users were launched.
    pub users: usize,
    /// Wall clock time the first user was launched.
    pub started: DateTime<Utc>,
    /// Wall clock time the last user exited.
    pub stopped: DateTime<Utc>,
    /// How long the swarm ran.
    pub duration: time::Duration,
}
impl fmt::Display for SwarmSummary {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} users ran {} for {:.2}s ({} - {})",
            self.users,
            self.behavior,
            self.duration.as_secs_f64(),
            self.started.format("%Y-%m-%d %H:%M:%S"),
            self.stopped.format("%Y-%m-%d %H:%M:%S"),
        )
    }
}

/// The default scheduler: launches simulated users, lets them run their behavior, and
/// stops them when the run time expires or ctrl-c is caught.
pub struct SwarmAttack {
    /// Every behavior that can be selected with `--behavior`.
    behaviors: Vec<Behavior>,
    /// Configuration object holding options set when launching the swarm.
    configuration: SwarmConfiguration,
    /// Optional client shared by all users, a `ReqwestClient` is built if not set.
    client: Option<Arc<dyn HttpClient>>,
    /// Where tasks write diagnostic lines.
    diagnostics: Arc<dyn DiagnosticWriter>,
}
impl SwarmAttack {
    /// Load configuration from the command line and initialize a
    /// [`SwarmAttack`](./struct.SwarmAttack.html).
    pub fn initialize() -> Result<SwarmAttack, SwarmError> {
        SwarmAttack::initialize_with_config(SwarmConfiguration::parse_args_default_or_exit())
    }

    /// Initialize a [`SwarmAttack`](./struct.SwarmAttack.html) with an already loaded
    /// configuration.
    ///
    /// # Example
    /// ```rust
    /// use tweetswarm::SwarmAttack;
    /// use tweetswarm::config::SwarmConfiguration;
    /// use gumdrop::Options;
    ///
    /// let configuration = SwarmConfiguration::parse_args_default(&["--host", "http://localhost"]).unwrap();
    /// let swarm = SwarmAttack::initialize_with_config(configuration);
    /// assert!(swarm.is_ok());
    /// ```
    pub fn initialize_with_config(
        configuration: SwarmConfiguration,
    ) -> Result<SwarmAttack, SwarmError> {
        Ok(SwarmAttack {
            behaviors: Vec::new(),
            configuration,
            client: None,
            diagnostics: Arc::new(StdoutDiagnostics),
        })
    }

    /// Register a behavior that can be selected with `--behavior`. The first registered
    /// behavior runs when `--behavior` is not set.
    pub fn register_behavior(mut self, behavior: Behavior) -> Self {
        trace!("register_behavior: {}", behavior.name);
        self.behaviors.push(behavior);
        self
    }

    /// Replace the default reqwest client, shared by all users.
    pub fn set_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.client = Some(client);
        self
    }

    /// Replace the default stdout diagnostic writer.
    pub fn set_diagnostics(mut self, diagnostics: Arc<dyn DiagnosticWriter>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    // Find the behavior named by --behavior, or the first registered one.
    fn select_behavior(&self) -> Result<Behavior, SwarmError> {
        if self.configuration.behavior.is_empty() {
            // Caller already confirmed at least one behavior is registered.
            if let Some(behavior) = self.behaviors.first() {
                return Ok(behavior.clone());
            }
        }
        self.behaviors
            .iter()
            .find(|behavior| behavior.name == self.configuration.behavior)
            .cloned()
            .ok_or_else(|| SwarmError::InvalidOption {
                option: "--behavior".to_string(),
                value: self.configuration.behavior.clone(),
                detail: format!(
                    "Unknown behavior, available: {}.",
                    self.behaviors
                        .iter()
                        .map(|behavior| behavior.name.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            })
    }

    // Each user owns its random source. A configured seed makes user `n` replay the
    // same sequence on every run.
    fn user_rng(&self, weighted_users_index: usize) -> StdRng {
        match self.configuration.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(weighted_users_index as u64)),
            None => StdRng::from_os_rng(),
        }
    }

    /// Execute the [`SwarmAttack`](./struct.SwarmAttack.html).
    pub async fn execute(mut self) -> Result<SwarmSummary, SwarmError> {
        // If version flag is set, display package name and version and exit.
        if self.configuration.version {
            println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
            std::process::exit(0);
        }

        if self.behaviors.is_empty() {
            return Err(SwarmError::NoBehaviors {
                detail: "No behaviors are registered.".to_string(),
            });
        }

        // Display behaviors and tasks, then exit.
        if self.configuration.list {
            println!("Available behaviors:");
            for behavior in &self.behaviors {
                println!(" - {} (pacing: {})", behavior.name, behavior.describe_pacing());
                for task in &behavior.tasks {
                    println!("    o {} (weight: {})", task.name, task.weight);
                }
            }
            std::process::exit(0);
        }

        self.configuration.configure();
        self.configuration.validate()?;
        self.configuration.initialize_logger();
        match serde_json::to_string(&self.configuration) {
            Ok(configuration) => debug!("configuration: {}", configuration),
            Err(e) => warn!("failed to serialize configuration: {}", e),
        }

        let behavior = self.select_behavior()?;
        let base_url = util::parse_host(&self.configuration.host)?;
        let client: Arc<dyn HttpClient> = match self.client.take() {
            Some(client) => client,
            None => Arc::new(ReqwestClient::new(
                base_url,
                self.configuration.request_timeout()?,
            )?),
        };

        let run_time = util::parse_timespan(&self.configuration.run_time);
        let users = self.configuration.users.unwrap_or(1);
        let hatch_rate = util::get_float_from_string(self.configuration.hatch_rate.clone())
            .unwrap_or(1.0);
        let hatch_interval = self.configuration.hatch_interval()?;

        util::setup_ctrlc_handler();

        info!(
            "launching {} users running {} at {} per second against {}",
            users, behavior.name, hatch_rate, self.configuration.host
        );
        let started = time::Instant::now();
        let started_at = Utc::now();

        let mut user_handles = Vec::with_capacity(users);
        let mut user_channels = Vec::with_capacity(users);
        for weighted_users_index in 0..users {
            if stop_requested(started, run_time) {
                break;
            }

            let (parent_sender, user_receiver) = flume::unbounded();
            let user = SwarmUser::new(
                weighted_users_index,
                client.clone(),
                self.user_rng(weighted_users_index),
                self.diagnostics.clone(),
            );
            user_handles.push(tokio::spawn(user::user_main(
                weighted_users_index,
                behavior.clone(),
                user,
                user_receiver,
            )));
            user_channels.push(parent_sender);

            if weighted_users_index + 1 < users {
                sleep_unless_stopped(hatch_interval, started, run_time).await;
            }
        }
        let launched = user_handles.len();
        info!("launched {} users", launched);

        while !stop_requested(started, run_time) {
            tokio::time::sleep(time::Duration::from_millis(PARENT_POLL_MS)).await;
        }

        info!("stopping {} users...", launched);
        for sender in &user_channels {
            // A user that already exited has dropped its receiver.
            let _ = sender.send(SwarmUserCommand::Exit);
        }
        for result in futures::future::join_all(user_handles).await {
            result?;
        }

        let summary = SwarmSummary {
            behavior: behavior.name,
            users: launched,
            started: started_at,
            stopped: Utc::now(),
            duration: started.elapsed(),
        };
        info!("{}", summary);

        Ok(summary)
    }
}

// The swarm stops on ctrl-c, or once the run time expires if one was configured.
fn stop_requested(started: time::Instant, run_time: usize) -> bool {
    CANCELED.load(Ordering::SeqCst) || (run_time > 0 && util::timer_expired(started, run_time))
}

async fn sleep_unless_stopped(duration: time::Duration, started: time::Instant, run_time: usize) {
    let slice = time::Duration::from_millis(PARENT_POLL_MS);
    let mut remaining = duration;
    while remaining > time::Duration::ZERO && !stop_requested(started, run_time) {
        let sleep_duration = remaining.min(slice);
        tokio::time::sleep(sleep_duration).await;
        remaining -= sleep_duration;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tweets;

    fn configuration(args: &[&str]) -> SwarmConfiguration {
        SwarmConfiguration::parse_args_default(args).unwrap()
    }

    #[test]
    fn select_first_behavior_by_default() {
        let swarm = SwarmAttack::initialize_with_config(configuration(&[]))
            .unwrap()
            .register_behavior(tweets::basic().unwrap())
            .register_behavior(tweets::extended().unwrap());
        assert_eq!(swarm.select_behavior().unwrap().name, tweets::BASIC);
    }

    #[test]
    fn select_behavior_by_name() {
        let swarm = SwarmAttack::initialize_with_config(configuration(&["-b", "extended"]))
            .unwrap()
            .register_behavior(tweets::basic().unwrap())
            .register_behavior(tweets::extended().unwrap());
        assert_eq!(swarm.select_behavior().unwrap().name, tweets::EXTENDED);
    }

    #[test]
    fn select_unknown_behavior() {
        let swarm = SwarmAttack::initialize_with_config(configuration(&["-b", "nope"]))
            .unwrap()
            .register_behavior(tweets::basic().unwrap());
        match swarm.select_behavior() {
            Err(SwarmError::InvalidOption { value, .. }) => assert_eq!(value, "nope"),
            _ => panic!("expected an invalid option error"),
        }
    }

    #[test]
    fn seeded_users_are_reproducible() {
        use rand::Rng;

        let swarm =
            SwarmAttack::initialize_with_config(configuration(&["--seed", "7"])).unwrap();
        let first: u64 = swarm.user_rng(3).random();
        let again: u64 = swarm.user_rng(3).random();
        let other: u64 = swarm.user_rng(4).random();
        assert_eq!(first, again);
        assert_ne!(first, other);
    }

    #[tokio::test]
    async fn execute_rejects_unrepresentable_durations() {
        for args in &[
            ["-H", "http://localhost", "--timeout", "1e20"],
            ["-H", "http://localhost", "-r", "1e-320"],
            ["-H", "http://localhost", "-t", "9999999999999999h"],
        ] {
            let swarm = SwarmAttack::initialize_with_config(configuration(args))
                .unwrap()
                .register_behavior(tweets::basic().unwrap());
            assert!(matches!(
                swarm.execute().await,
                Err(SwarmError::InvalidOption { .. })
            ));
        }
    }

    #[tokio::test]
    async fn execute_without_behaviors() {
        let swarm =
            SwarmAttack::initialize_with_config(configuration(&["-H", "http://localhost"]))
                .unwrap();
        assert!(matches!(
            swarm.execute().await,
            Err(SwarmError::NoBehaviors { .. })
        ));
    }
}
