//! YouTube domain - video uploads routed to per-region channels

pub mod actions;
pub mod channels;
pub mod models;
pub mod pipeline;
pub mod schedule;

pub use channels::{ChannelRouter, ChannelRule};
pub use models::{YoutubeUploadJob, YoutubeUploadRequest};
pub use schedule::PublishPlan;
