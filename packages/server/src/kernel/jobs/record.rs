//! Job record model persisted in the per-domain status documents.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ============================================================================
// Enums
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    #[default]
    Processing,
    Completed,
    Error,
}

impl JobState {
    /// Terminal states are absorbing: no transition out of them is allowed.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Error)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Processing => "processing",
            JobState::Completed => "completed",
            JobState::Error => "error",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which pipeline owns a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobDomain {
    Youtube,
    Wordpress,
    WordpressImage,
}

impl JobDomain {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobDomain::Youtube => "youtube",
            JobDomain::Wordpress => "wordpress",
            JobDomain::WordpressImage => "wordpress-image",
        }
    }

    /// File name of the status document, `None` for domains that keep no records.
    pub fn status_file(&self) -> Option<&'static str> {
        match self {
            JobDomain::Youtube => Some("youtube_status.json"),
            JobDomain::Wordpress => Some("wp_status.json"),
            JobDomain::WordpressImage => None,
        }
    }
}

impl fmt::Display for JobDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Record
// ============================================================================

/// One job's status record. Serializes flat: `{"state": "...", ...attributes}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct JobRecord {
    #[serde(default)]
    pub state: JobState,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl JobRecord {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(Value::as_str)
    }
}

/// Partial update merged key-wise into an existing record.
#[derive(Debug, Clone, Default)]
pub struct JobPatch {
    pub state: Option<JobState>,
    pub attributes: Map<String, Value>,
}

impl JobPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(mut self, state: JobState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn set(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.to_string(), value.into());
        self
    }

    /// Set only when `value` is `Some`.
    pub fn set_opt<V: Into<Value>>(self, key: &str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.set(key, v),
            None => self,
        }
    }

    /// Merge another patch on top of this one; later keys win.
    pub fn merge(mut self, other: JobPatch) -> Self {
        if other.state.is_some() {
            self.state = other.state;
        }
        self.attributes.extend(other.attributes);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.state.is_none() && self.attributes.is_empty()
    }
}

/// Outcome of applying a patch to a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchEffect {
    Applied,
    /// Attributes merged but the state change was refused (record already terminal).
    StateRejected { kept: JobState, attempted: JobState },
}

impl JobRecord {
    /// Shallow merge; a terminal state is never replaced.
    pub fn apply(&mut self, patch: JobPatch) -> PatchEffect {
        // `state` lives in its own field; never let it sneak in as an attribute
        let mut attributes = patch.attributes;
        attributes.remove("state");
        self.attributes.extend(attributes);

        match patch.state {
            Some(next) if self.state.is_terminal() && next != self.state => {
                PatchEffect::StateRejected {
                    kept: self.state,
                    attempted: next,
                }
            }
            Some(next) => {
                self.state = next;
                PatchEffect::Applied
            }
            None => PatchEffect::Applied,
        }
    }
}

/// Current UTC time as RFC 3339 with a `Z` suffix.
pub fn now_utc_iso() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_serializes_flat() {
        let mut record = JobRecord::default();
        record.apply(JobPatch::new().set("channel", "UK").set("title", "T"));

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value, json!({"state": "processing", "channel": "UK", "title": "T"}));
    }

    #[test]
    fn test_record_deserializes_without_state() {
        let record: JobRecord = serde_json::from_value(json!({"title": "T"})).unwrap();
        assert_eq!(record.state, JobState::Processing);
        assert_eq!(record.get_str("title"), Some("T"));
    }

    #[test]
    fn test_apply_preserves_unspecified_keys() {
        let mut record = JobRecord::default();
        record.apply(JobPatch::new().set("a", 1).set("b", 2));
        record.apply(JobPatch::new().set("b", 3));

        assert_eq!(record.get("a"), Some(&json!(1)));
        assert_eq!(record.get("b"), Some(&json!(3)));
    }

    #[test]
    fn test_terminal_state_is_absorbing() {
        let mut record = JobRecord::default();
        assert_eq!(
            record.apply(JobPatch::new().state(JobState::Completed)),
            PatchEffect::Applied
        );

        let effect = record.apply(
            JobPatch::new()
                .state(JobState::Error)
                .set("bunny_delete", json!({"ok": true})),
        );

        assert_eq!(
            effect,
            PatchEffect::StateRejected {
                kept: JobState::Completed,
                attempted: JobState::Error
            }
        );
        assert_eq!(record.state, JobState::Completed);
        // non-state fields still land
        assert_eq!(record.get("bunny_delete"), Some(&json!({"ok": true})));
    }

    #[test]
    fn test_state_attribute_cannot_bypass_guard() {
        let mut record = JobRecord::default();
        record.apply(JobPatch::new().state(JobState::Error));
        record.apply(JobPatch::new().set("state", "processing"));

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["state"], "error");
    }

    #[test]
    fn test_same_terminal_state_is_not_a_rejection() {
        let mut record = JobRecord::default();
        record.apply(JobPatch::new().state(JobState::Completed));
        assert_eq!(
            record.apply(JobPatch::new().state(JobState::Completed)),
            PatchEffect::Applied
        );
    }

    #[test]
    fn test_domain_status_files() {
        assert_eq!(JobDomain::Youtube.status_file(), Some("youtube_status.json"));
        assert_eq!(JobDomain::Wordpress.status_file(), Some("wp_status.json"));
        assert_eq!(JobDomain::WordpressImage.status_file(), None);
        assert_eq!(JobDomain::WordpressImage.to_string(), "wordpress-image");
    }
}
