use serde::Deserialize;

use crate::common::{non_blank, strip_query, InvalidRequest, PostIdInput};
use crate::kernel::MediaPatch;

/// Body of `POST /upload-to-wordpress`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WordPressUploadRequest {
    pub video_url: Option<String>,
    pub filename: Option<String>,
    pub title: Option<String>,
    pub alt_text: Option<String>,
    pub post_id: Option<PostIdInput>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WordPressUploadJob {
    pub video_url: String,
    pub filename: Option<String>,
    pub title: Option<String>,
    pub alt_text: Option<String>,
    pub post_id: Option<u64>,
    pub location: Option<String>,
}

impl WordPressUploadRequest {
    pub fn validate(self) -> Result<WordPressUploadJob, InvalidRequest> {
        let video_url = non_blank(self.video_url).ok_or_else(|| InvalidRequest::new("Missing video_url"))?;
        let post_id = match &self.post_id {
            Some(input) => input.resolve()?,
            None => None,
        };

        Ok(WordPressUploadJob {
            video_url,
            filename: non_blank(self.filename),
            title: non_blank(self.title),
            alt_text: non_blank(self.alt_text),
            post_id,
            location: non_blank(self.location),
        })
    }
}

/// Body of `POST /upload-image-to-wordpress`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ImageUploadRequest {
    pub file_url: Option<String>,
    pub filename: Option<String>,
    pub title: Option<String>,
    pub alt_text: Option<String>,
    pub post_id: Option<PostIdInput>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageUploadJob {
    pub file_url: String,
    pub filename: Option<String>,
    pub title: Option<String>,
    pub alt_text: Option<String>,
    pub post_id: Option<u64>,
}

impl ImageUploadRequest {
    pub fn validate(self) -> Result<ImageUploadJob, InvalidRequest> {
        let file_url = non_blank(self.file_url).ok_or_else(|| InvalidRequest::new("Missing file_url"))?;
        let post_id = match &self.post_id {
            Some(input) => input.resolve()?,
            None => None,
        };

        Ok(ImageUploadJob {
            file_url,
            filename: non_blank(self.filename),
            title: non_blank(self.title),
            alt_text: non_blank(self.alt_text),
            post_id,
        })
    }
}

/// Body of `POST /upload-product-images`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProductImagesRequest {
    pub image_urls: Vec<Option<String>>,
    pub featured_url: Option<String>,
    pub title_prefix: Option<String>,
    pub alt_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProductImageBatch {
    /// Query-stripped, `_thumb`-free, de-duplicated, in request order.
    pub urls: Vec<String>,
    pub featured_url: Option<String>,
    pub title_prefix: Option<String>,
    pub alt_text: Option<String>,
}

impl ProductImagesRequest {
    pub fn validate(self) -> Result<ProductImageBatch, InvalidRequest> {
        let mut urls: Vec<String> = Vec::new();
        for url in self.image_urls.into_iter().filter_map(non_blank) {
            let url = strip_query(&url).to_string();
            if url.contains("_thumb") || urls.contains(&url) {
                continue;
            }
            urls.push(url);
        }

        if urls.is_empty() {
            return Err(InvalidRequest::new("No valid image_urls"));
        }

        Ok(ProductImageBatch {
            urls,
            featured_url: non_blank(self.featured_url).map(|u| strip_query(&u).to_string()),
            title_prefix: non_blank(self.title_prefix),
            alt_text: non_blank(self.alt_text),
        })
    }
}

/// Title / alt / parent post applied after the media item exists.
pub fn metadata_patch(title: Option<&str>, alt_text: Option<&str>, post_id: Option<u64>) -> MediaPatch {
    MediaPatch {
        title: title.map(str::to_string),
        alt_text: alt_text.map(str::to_string),
        post: post_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wordpress_request_requires_video_url() {
        let req: WordPressUploadRequest = serde_json::from_value(json!({"title": "x"})).unwrap();
        assert_eq!(req.validate().unwrap_err().to_string(), "Missing video_url");
    }

    #[test]
    fn test_wordpress_request_accepts_string_post_id() {
        let req: WordPressUploadRequest = serde_json::from_value(json!({
            "video_url": "https://cdn.x/clip.mp4",
            "post_id": "812",
            "title": "Clip"
        }))
        .unwrap();
        let job = req.validate().unwrap();
        assert_eq!(job.post_id, Some(812));
        assert_eq!(job.title.as_deref(), Some("Clip"));
        assert_eq!(job.filename, None);
    }

    #[test]
    fn test_image_request_requires_file_url() {
        assert!(ImageUploadRequest::default().validate().is_err());
    }

    #[test]
    fn test_product_urls_are_cleaned() {
        let req: ProductImagesRequest = serde_json::from_value(json!({
            "image_urls": [
                "https://cdn.x/a.png?v=1",
                "https://cdn.x/a.png?v=2",
                "https://cdn.x/a_thumb.png",
                null,
                "",
                "https://cdn.x/b.jpg"
            ],
            "featured_url": "https://cdn.x/b.jpg?size=large"
        }))
        .unwrap();

        let batch = req.validate().unwrap();
        assert_eq!(batch.urls, vec!["https://cdn.x/a.png", "https://cdn.x/b.jpg"]);
        assert_eq!(batch.featured_url.as_deref(), Some("https://cdn.x/b.jpg"));
    }

    #[test]
    fn test_product_batch_needs_one_valid_url() {
        let req: ProductImagesRequest =
            serde_json::from_value(json!({"image_urls": ["https://cdn.x/only_thumb.png"]})).unwrap();
        assert_eq!(req.validate().unwrap_err().to_string(), "No valid image_urls");
    }

    #[test]
    fn test_metadata_patch() {
        assert!(metadata_patch(None, None, None).is_empty());
        let patch = metadata_patch(Some("T"), None, Some(3));
        assert_eq!(patch.title.as_deref(), Some("T"));
        assert_eq!(patch.post, Some(3));
    }
}
