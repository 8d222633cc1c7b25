//! Synthetic weather tweets.
//!
//! A [`TweetPayload`] is built fresh for every request and thrown away once sent.
//! Every field is sampled independently from the ranges in a [`PayloadProfile`]:
//!
//! ```rust
//! use rand::SeedableRng;
//! use rand::rngs::StdRng;
//! use tweetswarm::payload::{Municipality, PayloadProfile};
//!
//! let mut rng = StdRng::seed_from_u64(42);
//! let tweet = PayloadProfile::EXTENDED.build(&mut rng);
//! assert_eq!(tweet.municipality, Municipality::Chinautla);
//! assert!((15..=35).contains(&tweet.temperature));
//! ```

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use strum_macros::{Display, EnumIter, EnumString};

/// Municipalities a tweet can be reported from.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Municipality {
    Mixco,
    Guatemala,
    Amatitlan,
    Chinautla,
}

/// Every tweet reports from this municipality.
pub const PINNED_MUNICIPALITY: Municipality = Municipality::Chinautla;

/// Weather conditions a tweet can report.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Weather {
    Sunny,
    Cloudy,
    Rainy,
    Foggy,
}

const WEATHERS: [Weather; 4] = [
    Weather::Sunny,
    Weather::Cloudy,
    Weather::Rainy,
    Weather::Foggy,
];

/// The body posted for each tweet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TweetPayload {
    pub municipality: Municipality,
    /// Degrees Celsius.
    pub temperature: i32,
    /// Relative humidity, percent.
    pub humidity: u8,
    pub weather: Weather,
}

/// Sampling ranges for the numeric fields of a tweet. Both ranges are inclusive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PayloadProfile {
    pub temperature: RangeInclusive<i32>,
    pub humidity: RangeInclusive<u8>,
}
impl PayloadProfile {
    /// Ranges used by the `basic` behavior.
    pub const BASIC: PayloadProfile = PayloadProfile {
        temperature: -10..=40,
        humidity: 0..=100,
    };

    /// Ranges used by the `extended` behavior.
    pub const EXTENDED: PayloadProfile = PayloadProfile {
        temperature: 15..=35,
        humidity: 30..=90,
    };

    /// Sample a new tweet.
    pub fn build<R: Rng + ?Sized>(&self, rng: &mut R) -> TweetPayload {
        TweetPayload {
            municipality: PINNED_MUNICIPALITY,
            temperature: rng.random_range(self.temperature.clone()),
            humidity: rng.random_range(self.humidity.clone()),
            weather: WEATHERS[rng.random_range(0..WEATHERS.len())],
        }
    }
}
