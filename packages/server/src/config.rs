use anyhow::{Context, Result};
use chrono::FixedOffset;
use dotenvy::dotenv;
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

use crate::domains::youtube::channels::{ChannelRouter, ChannelRule};

/// Default catalog listing endpoint (paged JSON).
pub const DEFAULT_CATALOG_ENDPOINT: &str =
    "https://engtechgroup.com/wp-content/themes/ETG/machines/filter-machines.php";

/// OAuth client credentials for one YouTube channel.
#[derive(Debug, Clone)]
pub struct ChannelCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

/// WordPress REST credentials (application password).
#[derive(Debug, Clone)]
pub struct WordPressConfig {
    /// e.g. `https://example.com/wp-json/wp/v2`
    pub api_base: String,
    pub user: String,
    pub app_password: String,
}

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Directory holding `youtube_status.json` and `wp_status.json`.
    pub status_dir: PathBuf,
    /// Directory for per-job temporary media files.
    pub temp_dir: PathBuf,
    /// Zone assumed for `publish_at` values that carry no offset.
    pub reference_offset: FixedOffset,
    /// How many recent media items the reconciler scans after a search miss.
    pub reconcile_scan_depth: u32,
    pub youtube_token_uri: String,
    pub channel_router: ChannelRouter,
    pub youtube_channels: HashMap<String, ChannelCredentials>,
    pub wordpress: Option<WordPressConfig>,
    pub bunny_api_key: Option<String>,
    pub catalog_endpoint: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        let channel_router = match env::var("YT_CHANNEL_RULES") {
            Ok(raw) => {
                let rules: Vec<ChannelRule> = serde_json::from_str(&raw)
                    .context("YT_CHANNEL_RULES must be a JSON array of {pattern, channel}")?;
                let default = env::var("YT_DEFAULT_CHANNEL").unwrap_or_else(|_| "UK".to_string());
                ChannelRouter::new(rules, default)
            }
            Err(_) => match env::var("YT_DEFAULT_CHANNEL") {
                Ok(default) => ChannelRouter::new(ChannelRouter::default().rules().to_vec(), default),
                Err(_) => ChannelRouter::default(),
            },
        };

        let youtube_channels = channel_router
            .channels()
            .into_iter()
            .filter_map(|channel| {
                channel_credentials_from_env(&channel).map(|creds| (channel, creds))
            })
            .collect::<HashMap<_, _>>();

        if youtube_channels.is_empty() {
            tracing::warn!("No YouTube channel credentials configured; YouTube jobs will fail at authentication");
        }

        let wordpress = match env::var("WP_API_BASE") {
            Ok(base) if !base.trim().is_empty() => Some(WordPressConfig {
                api_base: base.trim_end_matches('/').to_string(),
                user: env::var("WP_USER").context("WP_USER must be set when WP_API_BASE is set")?,
                app_password: env::var("WP_APP_PASSWORD")
                    .context("WP_APP_PASSWORD must be set when WP_API_BASE is set")?,
            }),
            _ => None,
        };

        Ok(Self {
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            status_dir: env::var("STATUS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".")),
            temp_dir: env::var("TEMP_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| env::temp_dir()),
            reference_offset: parse_utc_offset(
                &env::var("REFERENCE_UTC_OFFSET").unwrap_or_else(|_| "+00:00".to_string()),
            )?,
            reconcile_scan_depth: env::var("RECONCILE_SCAN_DEPTH")
                .unwrap_or_else(|_| "50".to_string())
                .parse()
                .context("RECONCILE_SCAN_DEPTH must be a valid number")?,
            youtube_token_uri: env::var("YOUTUBE_TOKEN_URI")
                .unwrap_or_else(|_| "https://oauth2.googleapis.com/token".to_string()),
            channel_router,
            youtube_channels,
            wordpress,
            bunny_api_key: env::var("BUNNY_API_KEY").ok(),
            catalog_endpoint: env::var("CATALOG_ENDPOINT")
                .unwrap_or_else(|_| DEFAULT_CATALOG_ENDPOINT.to_string()),
        })
    }
}

/// Reads `YT_<CHANNEL>_CLIENT_ID`, `_CLIENT_SECRET` and `_REFRESH_TOKEN`.
fn channel_credentials_from_env(channel: &str) -> Option<ChannelCredentials> {
    let prefix = format!("YT_{}", channel.to_uppercase().replace([' ', '-'], "_"));
    Some(ChannelCredentials {
        client_id: env::var(format!("{prefix}_CLIENT_ID")).ok()?,
        client_secret: env::var(format!("{prefix}_CLIENT_SECRET")).ok()?,
        refresh_token: env::var(format!("{prefix}_REFRESH_TOKEN")).ok()?,
    })
}

/// Parse `+HH:MM`, `-HH:MM` or `Z` into a fixed offset.
pub fn parse_utc_offset(raw: &str) -> Result<FixedOffset> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("z") || raw.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0).context("zero offset is always valid");
    }

    let (sign, rest) = match raw.split_at_checked(1) {
        Some(("+", rest)) => (1, rest),
        Some(("-", rest)) => (-1, rest),
        _ => anyhow::bail!("REFERENCE_UTC_OFFSET must look like +HH:MM, got {raw:?}"),
    };
    let (hours, minutes) = rest
        .split_once(':')
        .with_context(|| format!("REFERENCE_UTC_OFFSET must look like +HH:MM, got {raw:?}"))?;
    let hours: i32 = hours.parse().context("invalid offset hours")?;
    let minutes: i32 = minutes.parse().context("invalid offset minutes")?;

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
        .with_context(|| format!("offset out of range: {raw}"))
}
