//! Catalog domain - product listing scraper

pub mod scraper;

pub use scraper::{CatalogError, CatalogQuery, CatalogScraper, CatalogSummary, Product};
