// Business domains
pub mod catalog;
pub mod wordpress;
pub mod youtube;
