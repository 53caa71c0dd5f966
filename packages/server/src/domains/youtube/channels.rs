//! Location → YouTube channel routing.
//!
//! Rules are data: an ordered list of case-insensitive substring patterns.
//! The first rule whose pattern occurs in the location wins; no match (or no
//! location) falls back to the default channel.

use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChannelRule {
    pub pattern: String,
    pub channel: String,
}

impl ChannelRule {
    pub fn new(pattern: &str, channel: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            channel: channel.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelRouter {
    rules: Vec<ChannelRule>,
    default_channel: String,
}

impl ChannelRouter {
    pub fn new(rules: Vec<ChannelRule>, default_channel: impl Into<String>) -> Self {
        let rules = rules
            .into_iter()
            .map(|rule| ChannelRule {
                pattern: rule.pattern.to_lowercase(),
                channel: rule.channel,
            })
            .filter(|rule| !rule.pattern.is_empty())
            .collect();
        Self {
            rules,
            default_channel: default_channel.into(),
        }
    }

    pub fn rules(&self) -> &[ChannelRule] {
        &self.rules
    }

    pub fn default_channel(&self) -> &str {
        &self.default_channel
    }

    /// Every channel this router can emit, default first, without duplicates.
    pub fn channels(&self) -> Vec<String> {
        let mut channels = vec![self.default_channel.clone()];
        for rule in &self.rules {
            if !channels.contains(&rule.channel) {
                channels.push(rule.channel.clone());
            }
        }
        channels
    }

    pub fn select(&self, location: Option<&str>) -> &str {
        let location = location.unwrap_or_default().to_lowercase();
        self.rules
            .iter()
            .find(|rule| location.contains(&rule.pattern))
            .map(|rule| rule.channel.as_str())
            .unwrap_or(&self.default_channel)
    }
}

impl Default for ChannelRouter {
    fn default() -> Self {
        Self::new(
            vec![
                ChannelRule::new("united kingdom", "UK"),
                ChannelRule::new("north america", "US"),
                ChannelRule::new("asia", "Asia"),
            ],
            "UK",
        )
    }
}
