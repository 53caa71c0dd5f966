//! Test fixtures.

use std::io::Cursor;

use image::{ImageFormat, Rgb, RgbImage};
use uploader_core::kernel::{MediaItem, Rendered};

/// A solid-colour PNG of the given size.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([200, 30, 30]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

/// An existing media item that carries `marker` in its description.
pub fn media_item_with_marker(id: u64, marker: &str) -> MediaItem {
    MediaItem {
        id,
        source_url: Some(format!("https://example.com/wp-content/uploads/{id}.mp4")),
        description: Rendered::from(marker),
        ..Default::default()
    }
}
