//! Image decoding and normalization strategies.
//!
//! Portal challenge images are small, noisy, and usually colored. Each
//! strategy turns one into a black-on-white (or white-on-black) binary
//! image that OCR engines read far more reliably than the raw input.

use std::io::Cursor;

use image::{GrayImage, ImageFormat, Luma};

use crate::types::{Strategy, VisionError, VisionResult};

/// Fixed threshold used by [`Strategy::BinaryThreshold`].
const BINARY_LEVEL: u8 = 127;

/// Gaussian sigma equivalent to an 11x11 adaptive block.
const ADAPTIVE_SIGMA: f32 = 2.0;

/// Constant subtracted from the local mean in adaptive thresholding.
const ADAPTIVE_OFFSET: i16 = 2;

/// Gaussian sigma equivalent to a 5x5 smoothing kernel.
const SMOOTH_SIGMA: f32 = 1.1;

/// Decode raw image bytes (PNG, JPEG, GIF, BMP, ...) into grayscale.
pub fn load_grayscale(bytes: &[u8]) -> VisionResult<GrayImage> {
    if bytes.is_empty() {
        return Err(VisionError::InvalidInput("empty image payload".to_string()));
    }
    let img = image::load_from_memory(bytes)?;
    Ok(img.to_luma8())
}

/// Encode a grayscale image as PNG.
pub fn encode_png(img: &GrayImage) -> VisionResult<Vec<u8>> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
    Ok(buf)
}

/// Apply one normalization strategy.
pub fn apply(strategy: Strategy, img: &GrayImage) -> GrayImage {
    match strategy {
        Strategy::BinaryThreshold => close(&threshold(img, BINARY_LEVEL)),
        Strategy::AdaptiveThreshold => adaptive_threshold(img),
        Strategy::LaplacianOtsu => laplacian_otsu(img),
    }
}

/// Global binary threshold: pixels strictly above `level` become white.
pub fn threshold(img: &GrayImage, level: u8) -> GrayImage {
    GrayImage::from_fn(img.width(), img.height(), |x, y| {
        let v = img.get_pixel(x, y).0[0];
        Luma([if v > level { 255 } else { 0 }])
    })
}

/// Otsu's threshold: the level that maximizes between-class variance.
pub fn otsu_level(img: &GrayImage) -> u8 {
    let mut histogram = [0u64; 256];
    for p in img.pixels() {
        histogram[p.0[0] as usize] += 1;
    }

    let total: u64 = histogram.iter().sum();
    if total == 0 {
        return BINARY_LEVEL;
    }
    let weighted_total: f64 = histogram
        .iter()
        .enumerate()
        .map(|(level, &count)| level as f64 * count as f64)
        .sum();

    let mut background_weight = 0u64;
    let mut background_sum = 0f64;
    let mut best_level = 0u8;
    let mut best_variance = -1f64;

    for (level, &count) in histogram.iter().enumerate() {
        background_weight += count;
        if background_weight == 0 {
            continue;
        }
        let foreground_weight = total - background_weight;
        if foreground_weight == 0 {
            break;
        }
        background_sum += level as f64 * count as f64;

        let mean_bg = background_sum / background_weight as f64;
        let mean_fg = (weighted_total - background_sum) / foreground_weight as f64;
        let variance =
            background_weight as f64 * foreground_weight as f64 * (mean_bg - mean_fg).powi(2);

        if variance > best_variance {
            best_variance = variance;
            best_level = level as u8;
        }
    }

    best_level
}

fn adaptive_threshold(img: &GrayImage) -> GrayImage {
    let local_mean = image::imageops::blur(img, ADAPTIVE_SIGMA);
    GrayImage::from_fn(img.width(), img.height(), |x, y| {
        let v = img.get_pixel(x, y).0[0] as i16;
        let t = local_mean.get_pixel(x, y).0[0] as i16 - ADAPTIVE_OFFSET;
        Luma([if v > t { 255 } else { 0 }])
    })
}

fn laplacian_otsu(img: &GrayImage) -> GrayImage {
    let smooth = image::imageops::blur(img, SMOOTH_SIGMA);
    let (w, h) = smooth.dimensions();

    // Sharpen by subtracting the 4-neighbour Laplacian.
    let enhanced = GrayImage::from_fn(w, h, |x, y| {
        let at = |dx: i64, dy: i64| -> i32 {
            let nx = (x as i64 + dx).clamp(0, w as i64 - 1) as u32;
            let ny = (y as i64 + dy).clamp(0, h as i64 - 1) as u32;
            smooth.get_pixel(nx, ny).0[0] as i32
        };
        let center = at(0, 0);
        let laplacian = at(-1, 0) + at(1, 0) + at(0, -1) + at(0, 1) - 4 * center;
        Luma([(center - laplacian).clamp(0, 255) as u8])
    });

    let level = otsu_level(&enhanced);
    threshold(&enhanced, level)
}

/// 2x2 morphological close: dilation followed by erosion.
fn close(img: &GrayImage) -> GrayImage {
    let dilated = window_reduce(img, -1, u8::max);
    window_reduce(&dilated, 0, u8::min)
}

fn window_reduce(img: &GrayImage, origin: i64, reduce: fn(u8, u8) -> u8) -> GrayImage {
    let (w, h) = img.dimensions();
    GrayImage::from_fn(w, h, |x, y| {
        let mut acc = img.get_pixel(x, y).0[0];
        for dy in origin..origin + 2 {
            for dx in origin..origin + 2 {
                let nx = (x as i64 + dx).clamp(0, w as i64 - 1) as u32;
                let ny = (y as i64 + dy).clamp(0, h as i64 - 1) as u32;
                acc = reduce(acc, img.get_pixel(nx, ny).0[0]);
            }
        }
        Luma([acc])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bimodal(w: u32, h: u32) -> GrayImage {
        GrayImage::from_fn(w, h, |x, _| Luma([if x < w / 2 { 40 } else { 210 }]))
    }

    #[test]
    fn test_threshold_is_binary() {
        let img = GrayImage::from_fn(16, 16, |x, y| Luma([((x * 16 + y) % 256) as u8]));
        let out = threshold(&img, 127);
        assert!(out.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
    }

    #[test]
    fn test_otsu_splits_bimodal_image() {
        let level = otsu_level(&bimodal(20, 10));
        assert!((40..210).contains(&level), "level {level} not between modes");
    }

    #[test]
    fn test_every_strategy_preserves_dimensions() {
        let img = bimodal(30, 12);
        for strategy in Strategy::ALL {
            let out = apply(strategy, &img);
            assert_eq!(out.dimensions(), (30, 12), "{}", strategy.name());
            assert!(out.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
        }
    }

    #[test]
    fn test_close_fills_single_pixel_hole() {
        let mut img = GrayImage::from_pixel(6, 6, Luma([255]));
        img.put_pixel(3, 3, Luma([0]));
        let out = close(&img);
        assert_eq!(out.get_pixel(3, 3).0[0], 255);
    }

    #[test]
    fn test_png_roundtrip_through_loader() {
        let img = bimodal(8, 8);
        let png = encode_png(&img).unwrap();
        let back = load_grayscale(&png).unwrap();
        assert_eq!(back, img);
    }

    #[test]
    fn test_load_rejects_garbage() {
        assert!(load_grayscale(b"").is_err());
        assert!(load_grayscale(b"definitely not an image").is_err());
    }
}
