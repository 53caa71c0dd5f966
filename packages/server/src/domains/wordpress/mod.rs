//! WordPress domain - video and image uploads into the media library,
//! plus marker-based reconciliation for uploads whose response was lost

pub mod actions;
pub mod images;
pub mod models;
pub mod pipeline;
pub mod reconcile;

pub use images::{normalize_to_16_9, ProductImagesReport};
pub use models::{
    ImageUploadJob, ImageUploadRequest, ProductImageBatch, ProductImagesRequest, WordPressUploadJob,
    WordPressUploadRequest,
};
pub use reconcile::Reconciliation;
