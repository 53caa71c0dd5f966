// HTTP routes
pub mod catalog;
pub mod health;
pub mod wordpress;
pub mod youtube;

pub use catalog::*;
pub use health::*;
pub use wordpress::*;
pub use youtube::*;
