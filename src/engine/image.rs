//! Screenshot cropping and image template matching

use image::{DynamicImage, GrayImage, ImageFormat};
use std::io::Cursor;
use tracing::debug;

use crate::element::found::FoundElement;
use crate::engine::types::{ImageTemplate, Rectangle};
use crate::{Error, Result};

/// Tag of the elements found by image
pub const IMAGE_MATCH_TAG: &str = "ImageMatch";

/// Crop an encoded screenshot and re-encode the area as PNG
pub fn crop_png(screen: &[u8], x: f64, y: f64, width: f64, height: f64) -> Result<Vec<u8>> {
    let image = image::load_from_memory(screen)?;

    let x = x.max(0.0) as u32;
    let y = y.max(0.0) as u32;
    let width = (width.max(0.0) as u32).min(image.width().saturating_sub(x));
    let height = (height.max(0.0) as u32).min(image.height().saturating_sub(y));
    if width == 0 || height == 0 {
        return Err(Error::internal("empty screenshot area"));
    }

    encode_png(&image.crop_imm(x, y, width, height))
}

pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    image.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)?;
    Ok(buffer)
}

/// Non-overlapping occurrences of `template` in `screen`, inside `area` when given
pub fn find_occurrences(
    screen: &[u8],
    template: &ImageTemplate,
    area: Option<Rectangle>,
) -> Result<Vec<Rectangle>> {
    let screen = image::load_from_memory(screen)?.to_luma8();
    let pattern = image::load_from_memory(&template.data)?.to_luma8();

    let (tw, th) = pattern.dimensions();
    if tw == 0 || th == 0 || tw > screen.width() || th > screen.height() {
        return Ok(Vec::new());
    }

    let bounds = Rectangle::new(0.0, 0.0, screen.width() as f64, screen.height() as f64);
    let area = area.unwrap_or(bounds);
    let x0 = area.x.max(0.0) as u32;
    let y0 = area.y.max(0.0) as u32;
    let x1 = (area.right().min(bounds.right()) as u32).saturating_sub(tw);
    let y1 = (area.bottom().min(bounds.bottom()) as u32).saturating_sub(th);

    let limit = template.tolerance * 255.0 * (tw * th) as f64;
    let mut matches: Vec<Rectangle> = Vec::new();

    for y in y0..=y1 {
        for x in x0..=x1 {
            let candidate = Rectangle::new(x as f64, y as f64, tw as f64, th as f64);
            if matches.iter().any(|m| m.intersects(&candidate)) {
                continue;
            }
            if difference_within(&screen, &pattern, x, y, limit) {
                matches.push(candidate);
            }
        }
    }

    debug!("Image template found {} time(s)", matches.len());
    Ok(matches)
}

fn difference_within(screen: &GrayImage, pattern: &GrayImage, x: u32, y: u32, limit: f64) -> bool {
    let mut total = 0.0;
    for (px, py, p) in pattern.enumerate_pixels() {
        let s = screen.get_pixel(x + px, y + py);
        total += (s.0[0] as f64 - p.0[0] as f64).abs();
        if total > limit {
            return false;
        }
    }
    true
}

/// Wrap image matches as found elements
pub fn to_found_elements(rects: Vec<Rectangle>) -> Vec<FoundElement> {
    rects
        .into_iter()
        .enumerate()
        .map(|(i, rect)| FoundElement::new(format!("image-{}", i), IMAGE_MATCH_TAG, rect))
        .collect()
}
