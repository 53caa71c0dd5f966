//! Scheduled publishing: `publish_at` parsing and visibility resolution.

use anyhow::{bail, Result};
use chrono::{DateTime, FixedOffset, NaiveDateTime, SecondsFormat, TimeZone, Utc};

const OFFSET_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M%:z", "%Y-%m-%d %H:%M:%S%:z", "%Y-%m-%d %H:%M%:z"];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// What the upload should do with a requested `publish_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishPlan {
    /// No schedule requested.
    Immediate,
    /// Future instant: upload private, let the platform flip it public.
    Scheduled { publish_at: String },
    /// Already past; publish now with the requested privacy.
    Stale { requested: String },
    /// Could not be read; publish now with the requested privacy.
    Unparseable { raw: String, reason: String },
}

impl PublishPlan {
    /// `(privacyStatus, publishAt)` to send, given the requested privacy.
    pub fn visibility(&self, requested_privacy: &str) -> (String, Option<String>) {
        match self {
            PublishPlan::Scheduled { publish_at } => ("private".to_string(), Some(publish_at.clone())),
            _ => (requested_privacy.to_string(), None),
        }
    }
}

/// Parse `raw` as an instant. An explicit offset or `Z` is respected;
/// naive forms are read in `reference`.
pub fn parse_publish_at(raw: &str, reference: FixedOffset) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        bail!("publish_at is empty");
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }

    let zulu_normalized = match raw.strip_suffix(['Z', 'z']) {
        Some(rest) => format!("{rest}+00:00"),
        None => raw.to_string(),
    };
    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(&zulu_normalized, format) {
            return Ok(dt.with_timezone(&Utc));
        }
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return match reference.from_local_datetime(&naive).single() {
                Some(dt) => Ok(dt.with_timezone(&Utc)),
                None => bail!("publish_at {raw:?} is not a valid local time"),
            };
        }
    }

    bail!("unrecognized publish_at format {raw:?}")
}

pub fn format_publish_at(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Decide scheduling for `raw` relative to `now`.
pub fn plan_publish(raw: Option<&str>, now: DateTime<Utc>, reference: FixedOffset) -> PublishPlan {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return PublishPlan::Immediate;
    };

    match parse_publish_at(raw, reference) {
        Ok(instant) if instant > now => PublishPlan::Scheduled {
            publish_at: format_publish_at(instant),
        },
        Ok(instant) => PublishPlan::Stale {
            requested: format_publish_at(instant),
        },
        Err(e) => PublishPlan::Unparseable {
            raw: raw.to_string(),
            reason: e.to_string(),
        },
    }
}
