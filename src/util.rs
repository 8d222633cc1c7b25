//! Utility functions used by the swarm, and available when writing behaviors.

use regex::Regex;
use std::str::FromStr;
use std::sync::atomic::Ordering;
use std::time;
use url::Url;

use crate::{SwarmError, CANCELED};

/// Parse a string representing a time span and return the number of seconds.
///
/// Can be specified as an integer, indicating seconds. Or can use integers
/// together with one or more of "h", "m", and "s", in that order, indicating
/// "hours", "minutes", and "seconds".
///
/// Valid formats include: 20, 20s, 3m, 2h, 1h20m, 3h30m10s, etc.
///
/// # Example
/// ```rust
/// use tweetswarm::util;
///
/// // 1 hour 2 minutes and 3 seconds is 3,723 seconds.
/// assert_eq!(util::parse_timespan("1h2m3s"), 3_723);
///
/// // 45 seconds is 45 seconds.
/// assert_eq!(util::parse_timespan("45"), 45);
///
/// // Invalid value is 0 seconds.
/// assert_eq!(util::parse_timespan("foo"), 0);
/// ```
pub fn parse_timespan(time_str: &str) -> usize {
    try_parse_timespan(time_str).unwrap_or(0)
}

/// Strict form of [`parse_timespan`](fn.parse_timespan.html), returning `None` if the
/// string is not a time span or the span doesn't fit in a `usize`.
///
/// # Example
/// ```rust
/// use tweetswarm::util;
///
/// assert_eq!(util::try_parse_timespan("1h30m"), Some(5_400));
/// assert_eq!(util::try_parse_timespan("5min"), None);
/// assert_eq!(util::try_parse_timespan("99999999999999999999h"), None);
/// ```
pub fn try_parse_timespan(time_str: &str) -> Option<usize> {
    if let Ok(seconds) = usize::from_str(time_str) {
        trace!("{} is integer: {} seconds", time_str, seconds);
        return Some(seconds);
    }

    let re = match Regex::new(r"^(?:(?P<hours>\d+)h)?(?:(?P<minutes>\d+)m)?(?:(?P<seconds>\d+)s)?$")
    {
        Ok(re) => re,
        Err(e) => {
            warn!("failed to compile timespan regex: {}", e);
            return None;
        }
    };
    let time_matches = re.captures(time_str)?;
    // The empty string matches with no components.
    if time_matches.get(0).map_or(true, |whole| whole.as_str().is_empty()) {
        return None;
    }
    let component = |name: &str| match time_matches.name(name) {
        Some(value) => usize::from_str(value.as_str()).ok(),
        None => Some(0),
    };
    let hours = component("hours")?;
    let minutes = component("minutes")?;
    let seconds = component("seconds")?;
    let total = hours
        .checked_mul(60 * 60)?
        .checked_add(minutes.checked_mul(60)?)?
        .checked_add(seconds)?;
    trace!(
        "{} hours {} minutes {} seconds: {} seconds",
        hours,
        minutes,
        seconds,
        total
    );
    Some(total)
}

/// Calculate the greatest common divisor of two integers using binary GCD (or Stein's)
/// algorithm.
///
/// # Example
/// ```rust
/// use tweetswarm::util;
///
/// assert_eq!(util::gcd(2, 4), 2);
/// assert_eq!(util::gcd(1, 4), 1);
/// assert_eq!(util::gcd(9, 102), 3);
/// ```
pub fn gcd(u: usize, v: usize) -> usize {
    match ((u, v), (u & 1, v & 1)) {
        ((x, y), _) if x == y => y,
        ((0, x), _) | ((x, 0), _) => x,
        ((x, y), (0, 1)) | ((y, x), (1, 0)) => gcd(x >> 1, y),
        ((x, y), (0, 0)) => gcd(x >> 1, y >> 1) << 1,
        ((x, y), (1, 1)) => {
            let (x, y) = (x.min(y), x.max(y));
            gcd((y - x) >> 1, x)
        }
        _ => unreachable!(),
    }
}

/// Determine if a timer expired, with second granularity.
///
/// # Example
/// ```rust
/// use tweetswarm::util;
///
/// let started = std::time::Instant::now();
/// assert_eq!(util::timer_expired(started, 60), false);
/// ```
pub fn timer_expired(started: time::Instant, run_time: usize) -> bool {
    run_time > 0 && started.elapsed().as_secs() >= run_time as u64
}

/// Convert optional string to f64, otherwise return None.
///
/// # Example
/// ```rust
/// use tweetswarm::util;
///
/// assert_eq!(util::get_float_from_string(Some("1.5".to_string())), Some(1.5));
/// assert_eq!(util::get_float_from_string(Some("nan-ish".to_string())), None);
/// assert_eq!(util::get_float_from_string(None), None);
/// ```
pub fn get_float_from_string(string: Option<String>) -> Option<f64> {
    string.and_then(|value| match f64::from_str(&value) {
        Ok(float) if float.is_finite() => Some(float),
        _ => None,
    })
}

/// Parse a host into the base URL all requests are joined onto.
///
/// # Example
/// ```rust
/// use tweetswarm::util;
///
/// // Hostname is a valid URL.
/// assert!(util::parse_host("http://localhost/").is_ok());
///
/// // IP with port is a valid URL.
/// assert!(util::parse_host("http://127.0.0.1:8080").is_ok());
///
/// // Protocol is required.
/// assert!(util::parse_host("example.com/").is_err());
/// ```
pub fn parse_host(host: &str) -> Result<Url, SwarmError> {
    let url = Url::parse(host).map_err(|parse_error| SwarmError::InvalidHost {
        host: host.to_string(),
        detail: "Invalid host.".to_string(),
        parse_error,
    })?;
    if url.cannot_be_a_base() {
        return Err(SwarmError::InvalidHost {
            host: host.to_string(),
            detail: "Host can not be used as a base URL.".to_string(),
            parse_error: url::ParseError::RelativeUrlWithCannotBeABaseBase,
        });
    }
    Ok(url)
}

// Internal helper to configure the control-c handler. Shutdown cleanly on the first
// ctrl-c. Exit abruptly on the second ctrl-c.
pub(crate) fn setup_ctrlc_handler() {
    match ctrlc::set_handler(move || {
        // We've caught a ctrl-c, determine if it's the first time or an additional time.
        if CANCELED.swap(true, Ordering::SeqCst) {
            warn!("caught another ctrl-c, exiting immediately...");
            std::process::exit(1);
        } else {
            warn!("caught ctrl-c, stopping...");
        }
    }) {
        Ok(_) => (),
        Err(e) => {
            // When running in tests the handler is already installed, reset CANCELED
            // so each swarm starts fresh.
            CANCELED.store(false, Ordering::SeqCst);
            info!("reset ctrl-c handler: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timespan() {
        assert_eq!(parse_timespan("0"), 0);
        assert_eq!(parse_timespan(""), 0);
        assert_eq!(parse_timespan("foo"), 0);
        assert_eq!(parse_timespan("1"), 1);
        assert_eq!(parse_timespan("1s"), 1);
        assert_eq!(parse_timespan("1m"), 60);
        assert_eq!(parse_timespan("61"), 61);
        assert_eq!(parse_timespan("1m1s"), 61);
        assert_eq!(parse_timespan("10m5s"), 605);
        assert_eq!(parse_timespan("1h"), 3600);
        assert_eq!(parse_timespan("1h30m"), 5400);
        assert_eq!(parse_timespan("1h5m13s"), 3913);
        // Overflow is not a time span.
        assert_eq!(parse_timespan("9999999999999999h"), 0);
    }

    #[test]
    fn strict_timespan() {
        assert_eq!(try_parse_timespan("0"), Some(0));
        assert_eq!(try_parse_timespan("0s"), Some(0));
        assert_eq!(try_parse_timespan("3h30m10s"), Some(12_610));
        assert_eq!(try_parse_timespan(""), None);
        assert_eq!(try_parse_timespan("foo"), None);
        assert_eq!(try_parse_timespan("5min"), None);
        assert_eq!(try_parse_timespan("1s1m"), None);
        assert_eq!(try_parse_timespan("9999999999999999h"), None);
        assert_eq!(try_parse_timespan("99999999999999999999"), None);
    }

    #[test]
    fn greatest_common_divisor() {
        assert_eq!(gcd(1, 1), 1);
        assert_eq!(gcd(5, 0), 5);
        assert_eq!(gcd(6, 9), 3);
        assert_eq!(gcd(12, 18), 6);
        assert_eq!(gcd(7, 3), 1);
    }

    #[test]
    fn float_from_string() {
        assert_eq!(get_float_from_string(Some("10".to_string())), Some(10.0));
        assert_eq!(get_float_from_string(Some("0.25".to_string())), Some(0.25));
        assert_eq!(get_float_from_string(Some("inf".to_string())), None);
        assert_eq!(get_float_from_string(Some("".to_string())), None);
    }

    #[test]
    fn host() {
        assert!(parse_host("http://127.0.0.1:8080").is_ok());
        assert!(parse_host("https://weather.example.com/").is_ok());
        assert!(parse_host("localhost").is_err());
        assert!(parse_host("mailto:weather@example.com").is_err());
    }

    #[test]
    fn timer() {
        let started = time::Instant::now();
        assert!(!timer_expired(started, 0));
        assert!(!timer_expired(started, 10));
    }
}
