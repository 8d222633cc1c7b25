//! Functions and structures related to configuring a swarm.
//!
//! A swarm is configured at run time by passing in the options and flags defined by
//! the [`SwarmConfiguration`] structure.

use gumdrop::Options;
use serde::{Deserialize, Serialize};
use simplelog::*;
use std::path::PathBuf;
use std::time::Duration;

use crate::util;
use crate::SwarmError;

/// Per-request timeout used when `--timeout` is not set.
const DEFAULT_TIMEOUT_SECONDS: f64 = 60.0;

/// Runtime options available when launching a swarm.
///
/// Help is generated for all of these options by passing a `-h` flag. The help text is
/// derived from this structure by [`gumdrop`](https://docs.rs/gumdrop/).
#[derive(Options, Debug, Clone, Default, Serialize, Deserialize)]
#[options(
    help = r#"tweetswarm floods a weather API with synthetic weather tweets.

The following runtime options are available when launching a swarm:"#
)]
pub struct SwarmConfiguration {
    /// Displays this help
    #[options(short = "h")]
    pub help: bool,
    /// Prints version information
    #[options(short = "V")]
    pub version: bool,
    /// Lists all behaviors and tasks and exits
    // Add a blank line after this option
    #[options(short = "l", help = "Lists all behaviors and tasks and exits\n")]
    pub list: bool,

    /// Defines host to load test (ie http://10.21.32.33)
    #[options(short = "H")]
    pub host: String,
    /// Selects the behavior to run (default: first registered)
    #[options(short = "b", meta = "NAME")]
    pub behavior: String,
    /// Sets concurrent users (default: 1)
    #[options(short = "u")]
    pub users: Option<usize>,
    /// Sets per-second user hatch rate (default: 1)
    #[options(short = "r", meta = "RATE")]
    pub hatch_rate: Option<String>,
    /// Stops swarm after (30s, 20m, 3h, 1h30m, etc)
    #[options(short = "t", meta = "TIME")]
    pub run_time: String,
    /// Seeds each user's random source for repeatable payloads
    #[options(no_short, meta = "SEED")]
    pub seed: Option<u64>,
    /// Sets per-request timeout, in seconds (default: 60)
    // Add a blank line and then a 'Logging:' header after this option
    #[options(
        no_short,
        meta = "VALUE",
        help = "Sets per-request timeout, in seconds (default: 60)\n\nLogging:"
    )]
    pub timeout: Option<String>,

    /// Enables log file and sets name
    #[options(short = "G", meta = "NAME")]
    pub log_file: String,
    /// Increases log file level (-g, -gg, etc)
    #[options(short = "g", count)]
    pub log_level: u8,
    /// Decreases verbosity (-q, -qq, etc)
    #[options(count, short = "q")]
    pub quiet: u8,
    /// Increases verbosity (-v, -vv, etc)
    #[options(count, short = "v")]
    pub verbose: u8,
}

impl SwarmConfiguration {
    /// Fill in defaults for anything not set on the command line.
    pub(crate) fn configure(&mut self) {
        if self.users.is_none() {
            self.users = Some(1);
        }
        if self.hatch_rate.is_none() {
            self.hatch_rate = Some("1".to_string());
        }
        if self.run_time.is_empty() {
            self.run_time = "0".to_string();
        }
    }

    /// Confirm the configured options make sense together.
    pub(crate) fn validate(&self) -> Result<(), SwarmError> {
        // Can't set both --verbose and --quiet.
        if self.verbose > 0 && self.quiet > 0 {
            return Err(SwarmError::InvalidOption {
                option: "`configuration.verbose`".to_string(),
                value: self.verbose.to_string(),
                detail: "`configuration.verbose` can not be set with `configuration.quiet`."
                    .to_string(),
            });
        }

        if self.host.is_empty() {
            return Err(SwarmError::InvalidOption {
                option: "`configuration.host`".to_string(),
                value: self.host.to_string(),
                detail: "A host must be defined via the --host option.".to_string(),
            });
        }
        util::parse_host(&self.host)?;

        // Validate `users`.
        if let Some(users) = self.users.as_ref() {
            if users == &0 {
                return Err(SwarmError::InvalidOption {
                    option: "`configuration.users`".to_string(),
                    value: users.to_string(),
                    detail: "`configuration.users` must be set to at least 1.".to_string(),
                });
            }
        }

        // If set, hatch rate must be a number greater than zero, and slow enough that
        // the interval between two users is still a duration.
        if let Some(hatch_rate) = self.hatch_rate.as_ref() {
            match util::get_float_from_string(Some(hatch_rate.clone())) {
                Some(rate) if rate > 0.0 => {
                    seconds_to_duration("`configuration.hatch_rate`", hatch_rate, 1.0 / rate)?;
                }
                _ => {
                    return Err(SwarmError::InvalidOption {
                        option: "`configuration.hatch_rate`".to_string(),
                        value: hatch_rate.to_string(),
                        detail: "`configuration.hatch_rate` must be greater than 0.".to_string(),
                    });
                }
            }
        }

        // If set, timeout must be a number greater than zero.
        if let Some(timeout) = self.timeout.as_ref() {
            match util::get_float_from_string(Some(timeout.clone())) {
                Some(seconds) if seconds > 0.0 => {
                    seconds_to_duration("`configuration.timeout`", timeout, seconds)?;
                }
                _ => {
                    return Err(SwarmError::InvalidOption {
                        option: "`configuration.timeout`".to_string(),
                        value: timeout.to_string(),
                        detail: "`configuration.timeout` must be greater than 0.".to_string(),
                    });
                }
            }
        }

        // A run time that isn't a time span would silently run until ctrl-c.
        if !self.run_time.is_empty() && util::try_parse_timespan(&self.run_time).is_none() {
            return Err(SwarmError::InvalidOption {
                option: "`configuration.run_time`".to_string(),
                value: self.run_time.to_string(),
                detail: "`configuration.run_time` must be a time span such as 30s, 20m or 1h30m."
                    .to_string(),
            });
        }

        Ok(())
    }

    /// How long a single request may take before reqwest gives up on it.
    pub(crate) fn request_timeout(&self) -> Result<Duration, SwarmError> {
        match self.timeout.as_ref() {
            Some(timeout) => match util::get_float_from_string(Some(timeout.clone())) {
                Some(seconds) => seconds_to_duration("`configuration.timeout`", timeout, seconds),
                None => Err(SwarmError::InvalidOption {
                    option: "`configuration.timeout`".to_string(),
                    value: timeout.to_string(),
                    detail: "`configuration.timeout` must be a number.".to_string(),
                }),
            },
            None => Ok(Duration::from_secs_f64(DEFAULT_TIMEOUT_SECONDS)),
        }
    }

    /// How long to wait between launching two users.
    pub(crate) fn hatch_interval(&self) -> Result<Duration, SwarmError> {
        let hatch_rate = self.hatch_rate.clone().unwrap_or_else(|| "1".to_string());
        match util::get_float_from_string(Some(hatch_rate.clone())) {
            Some(rate) if rate > 0.0 => {
                seconds_to_duration("`configuration.hatch_rate`", &hatch_rate, 1.0 / rate)
            }
            _ => Err(SwarmError::InvalidOption {
                option: "`configuration.hatch_rate`".to_string(),
                value: hatch_rate,
                detail: "`configuration.hatch_rate` must be greater than 0.".to_string(),
            }),
        }
    }

    /// Initialize the logger which writes to standard out and optionally to a log file.
    pub(crate) fn initialize_logger(&self) {
        // Configure debug output level.
        let debug_level = match self.verbose {
            0 => match self.quiet {
                0 => LevelFilter::Info,
                _ => LevelFilter::Warn,
            },
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        };

        // Configure log file level.
        let log_level = match self.log_level {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        };

        let log_file: Option<PathBuf> = if !self.log_file.is_empty() {
            Some(PathBuf::from(&self.log_file))
        } else {
            None
        };

        let mut loggers: Vec<Box<dyn SharedLogger>> =
            vec![SimpleLogger::new(debug_level, Config::default())];
        if let Some(log_to_file) = log_file.as_ref() {
            match std::fs::File::create(log_to_file) {
                Ok(file) => loggers.push(WriteLogger::new(log_level, Config::default(), file)),
                Err(e) => eprintln!(
                    "failed to create log file {}: {}",
                    log_to_file.display(),
                    e
                ),
            }
        }

        match CombinedLogger::init(loggers) {
            Ok(_) => (),
            Err(e) => {
                info!("failed to initialize CombinedLogger: {}", e);
            }
        }
        if let Some(log_to_file) = log_file {
            info!("Writing to log file: {}", log_to_file.display());
        }

        info!("Output verbosity level: {}", debug_level);
        info!("Logfile verbosity level: {}", log_level);
    }
}

// Options in seconds must fit in a `Duration`.
fn seconds_to_duration(option: &str, value: &str, seconds: f64) -> Result<Duration, SwarmError> {
    Duration::try_from_secs_f64(seconds).map_err(|e| SwarmError::InvalidOption {
        option: option.to_string(),
        value: value.to_string(),
        detail: format!("{} ({}).", option, e),
    })
}

#[cfg(test)]
mod test {
    use super::*;

    fn configuration(args: &[&str]) -> SwarmConfiguration {
        let mut configuration = SwarmConfiguration::parse_args_default(args).unwrap();
        configuration.configure();
        configuration
    }

    #[test]
    fn parse_options() {
        let configuration = SwarmConfiguration::parse_args_default(&[
            "-H",
            "http://localhost:8080",
            "-b",
            "extended",
            "-u",
            "20",
            "-r",
            "2.5",
            "-t",
            "1m",
            "--seed",
            "42",
            "--timeout",
            "3",
            "-vv",
        ])
        .unwrap();
        assert_eq!(configuration.host, "http://localhost:8080");
        assert_eq!(configuration.behavior, "extended");
        assert_eq!(configuration.users, Some(20));
        assert_eq!(configuration.hatch_rate, Some("2.5".to_string()));
        assert_eq!(configuration.run_time, "1m");
        assert_eq!(configuration.seed, Some(42));
        assert_eq!(configuration.request_timeout().unwrap(), Duration::from_secs(3));
        assert_eq!(configuration.verbose, 2);
    }

    #[test]
    fn set_defaults() {
        let configuration = configuration(&["-H", "http://localhost"]);
        assert_eq!(configuration.users, Some(1));
        assert_eq!(configuration.hatch_rate, Some("1".to_string()));
        assert_eq!(configuration.run_time, "0");
        assert_eq!(configuration.seed, None);
        assert_eq!(
            configuration.request_timeout().unwrap(),
            Duration::from_secs(60)
        );
        assert_eq!(
            configuration.hatch_interval().unwrap(),
            Duration::from_secs(1)
        );
        assert!(configuration.validate().is_ok());
    }

    #[test]
    fn invalid_options() {
        // Host is required.
        assert!(configuration(&[]).validate().is_err());
        // Host must include a scheme.
        assert!(matches!(
            configuration(&["-H", "localhost"]).validate(),
            Err(SwarmError::InvalidHost { .. })
        ));
        // Verbose and quiet are mutually exclusive.
        assert!(configuration(&["-H", "http://localhost", "-v", "-q"])
            .validate()
            .is_err());
        // Zero users.
        assert!(configuration(&["-H", "http://localhost", "-u", "0"])
            .validate()
            .is_err());
        // Zero or unparseable hatch rate.
        assert!(configuration(&["-H", "http://localhost", "-r", "0"])
            .validate()
            .is_err());
        assert!(configuration(&["-H", "http://localhost", "-r", "fast"])
            .validate()
            .is_err());
        // Zero timeout.
        assert!(configuration(&["-H", "http://localhost", "--timeout", "0"])
            .validate()
            .is_err());
        // Timeout too large to be a duration.
        let huge_timeout = configuration(&["-H", "http://localhost", "--timeout", "1e20"]);
        assert!(matches!(
            huge_timeout.validate(),
            Err(SwarmError::InvalidOption { .. })
        ));
        assert!(huge_timeout.request_timeout().is_err());
        // Hatch rate so small the interval between users is not a duration.
        let slow_hatch = configuration(&["-H", "http://localhost", "-r", "1e-320"]);
        assert!(matches!(
            slow_hatch.validate(),
            Err(SwarmError::InvalidOption { .. })
        ));
        assert!(slow_hatch.hatch_interval().is_err());
        // Run time must be a time span.
        for run_time in &["5min", "foo", "1s1m", "9999999999999999h"] {
            assert!(
                configuration(&["-H", "http://localhost", "-t", *run_time])
                    .validate()
                    .is_err(),
                "run time {} should be rejected",
                run_time
            );
        }
    }

    #[test]
    fn valid_run_times() {
        for run_time in &["0", "0s", "30", "30s", "20m", "1h30m"] {
            assert!(
                configuration(&["-H", "http://localhost", "-t", *run_time])
                    .validate()
                    .is_ok(),
                "run time {} should be accepted",
                run_time
            );
        }
        let fast_hatch = configuration(&["-H", "http://localhost", "-r", "4"]);
        assert_eq!(
            fast_hatch.hatch_interval().unwrap(),
            Duration::from_millis(250)
        );
    }

    #[test]
    fn configuration_serializes() {
        let configuration = configuration(&["-H", "http://localhost", "-b", "extended"]);
        let json = serde_json::to_string(&configuration).unwrap();
        assert!(json.contains(r#""host":"http://localhost""#));
        assert!(json.contains(r#""behavior":"extended""#));
        let restored: SwarmConfiguration = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.run_time, "0");
    }
}
