use serde::Deserialize;

use crate::common::{non_blank, InvalidRequest, TagsInput};
use crate::domains::youtube::channels::ChannelRouter;

/// Body of `POST /upload-to-youtube`, as loosely sent by webhook callers.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct YoutubeUploadRequest {
    pub video_url: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Option<TagsInput>,
    pub privacy: Option<String>,
    pub thumbnail_url: Option<String>,
    pub bunny_delete_url: Option<String>,
    pub location: Option<String>,
    pub publish_at: Option<String>,
}

/// A validated YouTube upload, ready to run.
#[derive(Debug, Clone, PartialEq)]
pub struct YoutubeUploadJob {
    pub video_url: String,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub privacy: String,
    pub thumbnail_url: Option<String>,
    pub bunny_delete_url: Option<String>,
    /// Raw `location`, kept on the record as `location_raw`.
    pub location: String,
    pub channel: String,
    pub publish_at: Option<String>,
}

impl YoutubeUploadRequest {
    pub fn validate(self, router: &ChannelRouter) -> Result<YoutubeUploadJob, InvalidRequest> {
        let (Some(video_url), Some(title), Some(description)) = (
            non_blank(self.video_url),
            non_blank(self.title),
            non_blank(self.description),
        ) else {
            return Err(InvalidRequest::new("Missing video_url, title, or description"));
        };

        let location = self.location.unwrap_or_default();
        let channel = router.select(Some(&location)).to_string();

        Ok(YoutubeUploadJob {
            video_url,
            title,
            description,
            tags: self.tags.map(TagsInput::into_tags).unwrap_or_default(),
            privacy: non_blank(self.privacy).unwrap_or_else(|| "unlisted".to_string()),
            thumbnail_url: non_blank(self.thumbnail_url),
            bunny_delete_url: non_blank(self.bunny_delete_url),
            location,
            channel,
            publish_at: non_blank(self.publish_at),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: serde_json::Value) -> YoutubeUploadRequest {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_minimal_request_gets_defaults() {
        let job = parse(serde_json::json!({
            "video_url": "http://x/a.mp4",
            "title": "T",
            "description": "D"
        }))
        .validate(&ChannelRouter::default())
        .unwrap();

        assert_eq!(job.privacy, "unlisted");
        assert_eq!(job.channel, "UK");
        assert!(job.tags.is_empty());
        assert_eq!(job.publish_at, None);
    }

    #[test]
    fn test_missing_or_blank_required_fields() {
        let router = ChannelRouter::default();
        let err = parse(serde_json::json!({"video_url": "http://x/a.mp4"}))
            .validate(&router)
            .unwrap_err();
        assert_eq!(err.to_string(), "Missing video_url, title, or description");

        assert!(parse(serde_json::json!({"video_url": "u", "title": " ", "description": "D"}))
            .validate(&router)
            .is_err());
        assert!(YoutubeUploadRequest::default().validate(&router).is_err());
    }

    #[test]
    fn test_location_picks_channel_and_tags_parse() {
        let job = parse(serde_json::json!({
            "video_url": "http://x/a.mp4",
            "title": "T",
            "description": "D",
            "location": "Chicago, North America",
            "tags": "cnc, milling",
            "privacy": "public"
        }))
        .validate(&ChannelRouter::default())
        .unwrap();

        assert_eq!(job.channel, "US");
        assert_eq!(job.tags, vec!["cnc", "milling"]);
        assert_eq!(job.privacy, "public");
        assert_eq!(job.location, "Chicago, North America");
    }
}
