pub mod content_hash;
pub mod urls;

pub use content_hash::*;
pub use urls::*;
