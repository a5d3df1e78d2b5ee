use image::GrayImage;

use crate::shared::frame::Frame;

/// Convert a capture frame to contrast-equalized grayscale.
///
/// Accepts 1 (gray), 3 (BGR) and 4 (BGRA) channel layouts. Returns `None`
/// for empty frames, other channel counts and buffers that don't match
/// the declared dimensions.
pub fn to_equalized_gray(frame: &Frame) -> Option<GrayImage> {
    if frame.is_empty() {
        return None;
    }
    let gray = to_gray(frame)?;
    Some(imageproc::contrast::equalize_histogram(&gray))
}

fn to_gray(frame: &Frame) -> Option<GrayImage> {
    let pixels = frame.as_ndarray()?;
    let (width, height) = (frame.width(), frame.height());

    match frame.channels() {
        1 => GrayImage::from_raw(width, height, frame.data().to_vec()),
        3 | 4 => Some(GrayImage::from_fn(width, height, |x, y| {
            let (x, y) = (x as usize, y as usize);
            let b = pixels[[y, x, 0]];
            let g = pixels[[y, x, 1]];
            let r = pixels[[y, x, 2]];
            image::Luma([luma(r, g, b)])
        })),
        _ => None,
    }
}

/// ITU-R BT.601 luma.
fn luma(r: u8, g: u8, b: u8) -> u8 {
    (0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64)
        .round()
        .clamp(0.0, 255.0) as u8
}
