//! Kernel module - server infrastructure and dependencies.

pub mod bunny_client;
pub mod deps;
pub mod http_transfer;
pub mod jobs;
pub mod test_dependencies;
pub mod traits;
pub mod transfer;
pub mod wordpress_client;
pub mod youtube_client;

pub use deps::ServerDeps;
pub use test_dependencies::TestDependencies;
pub use traits::*;
pub use transfer::{ProgressReporter, TracingProgress, TransferError};
