// Media upload relay - API Core
//
// Accepts webhook uploads for YouTube and WordPress, acknowledges them at once
// and runs the transfer on a background task. Job state lives in flat JSON
// status files so polling survives restarts.

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::*;
