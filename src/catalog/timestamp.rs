// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Lenient timestamp decoding for API payloads.
//!
//! The content API is not consistent about how it encodes instants: dates
//! arrive as RFC 3339 strings, as naive `YYYY-MM-DD HH:MM:SS` strings (taken
//! as UTC), as bare dates and, for subscriptions, as Unix seconds or
//! milliseconds.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, de::Error as _};

const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"];

/// Epoch values beyond this magnitude are milliseconds, not seconds
const MILLIS_THRESHOLD: i64 = 20_000_000_000;

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Seconds(i64),
    FractionalSeconds(f64),
    Text(String),
}

/// Parse a timestamp string in any of the formats the API emits
pub fn parse_timestamp(text: &str) -> Option<DateTime<FixedOffset>> {
    let text = text.trim();

    if let Ok(seconds) = text.parse::<i64>() {
        return from_unix(seconds);
    }

    DateTime::parse_from_rfc3339(text)
        .or_else(|_| DateTime::parse_from_rfc2822(text))
        .ok()
        .or_else(|| {
            NAIVE_FORMATS.iter().find_map(|format| {
                NaiveDateTime::parse_from_str(text, format)
                    .ok()
                    .map(|naive| naive.and_utc().fixed_offset())
            })
        })
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(|naive| naive.and_utc().fixed_offset())
        })
}

fn from_unix(value: i64) -> Option<DateTime<FixedOffset>> {
    let dt = if value.unsigned_abs() > MILLIS_THRESHOLD as u64 {
        DateTime::<Utc>::from_timestamp_millis(value)
    } else {
        DateTime::<Utc>::from_timestamp(value, 0)
    };
    dt.map(|dt| dt.fixed_offset())
}

fn decode(raw: RawTimestamp) -> Result<Option<DateTime<FixedOffset>>, String> {
    match raw {
        RawTimestamp::Seconds(0) => Ok(None),
        RawTimestamp::Seconds(seconds) => from_unix(seconds)
            .map(Some)
            .ok_or_else(|| format!("timestamp {seconds} is out of range")),
        RawTimestamp::FractionalSeconds(seconds) if seconds == 0.0 => Ok(None),
        RawTimestamp::FractionalSeconds(seconds) => from_unix(seconds.trunc() as i64)
            .map(Some)
            .ok_or_else(|| format!("timestamp {seconds} is out of range")),
        RawTimestamp::Text(text) if text.trim().is_empty() || text.trim() == "0" => Ok(None),
        RawTimestamp::Text(text) => parse_timestamp(&text)
            .map(Some)
            .ok_or_else(|| format!("unrecognized timestamp '{text}'")),
    }
}

/// Deserialize a required timestamp
pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<FixedOffset>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = RawTimestamp::deserialize(deserializer)?;
    decode(raw)
        .map_err(D::Error::custom)?
        .ok_or_else(|| D::Error::custom("timestamp must not be zero"))
}

/// Deserialize an optional timestamp where `null` and a raw zero both mean absent
pub mod optional {
    use super::*;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<FixedOffset>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<RawTimestamp>::deserialize(deserializer)? {
            Some(raw) => decode(raw).map_err(D::Error::custom),
            None => Ok(None),
        }
    }
}
