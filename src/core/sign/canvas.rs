//! 画布归一化 - 将任意宽高比的手部区域等比缩放后居中贴到固定尺寸的白色方形画布上

use std::io::Cursor;

use image::imageops::{self, FilterType};
use image::{ImageOutputFormat, Rgb, RgbImage};

use super::error::SignError;
use super::frame::Frame;
use super::region::Region;

pub const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);

/// Fixed `S x S` classifier input.
#[derive(Debug, Clone)]
pub struct Canvas {
    image: RgbImage,
}

impl Canvas {
    pub fn blank(size: u32) -> Self {
        Self {
            image: RgbImage::from_pixel(size, size, BACKGROUND),
        }
    }

    pub fn size(&self) -> u32 {
        self.image.width()
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// RGB values scaled to `[0, 1]`, row-major HWC.
    pub fn to_tensor(&self) -> Vec<f32> {
        self.image
            .as_raw()
            .iter()
            .map(|&v| v as f32 / 255.0)
            .collect()
    }

    pub fn encode_jpeg(&self, quality: u8) -> Result<Vec<u8>, SignError> {
        let mut buffer = Cursor::new(Vec::new());
        self.image
            .write_to(&mut buffer, ImageOutputFormat::Jpeg(quality))?;
        Ok(buffer.into_inner())
    }

    /// Bounding box `(x, y, width, height)` of the pixels that differ from the background.
    pub fn content_bounds(&self) -> Option<(u32, u32, u32, u32)> {
        let mut min_x = u32::MAX;
        let mut min_y = u32::MAX;
        let mut max_x = 0;
        let mut max_y = 0;
        for (x, y, pixel) in self.image.enumerate_pixels() {
            if *pixel != BACKGROUND {
                min_x = min_x.min(x);
                min_y = min_y.min(y);
                max_x = max_x.max(x);
                max_y = max_y.max(y);
            }
        }
        if min_x == u32::MAX {
            None
        } else {
            Some((min_x, min_y, max_x - min_x + 1, max_y - min_y + 1))
        }
    }
}

/// Where the resized crop lands on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Placement {
    /// Portrait regions fill the full height and are centered horizontally;
    /// landscape and square regions fill the full width and are centered vertically.
    pub fn letterbox(region_width: u32, region_height: u32, size: u32) -> Placement {
        let (w, h, s) = (region_width as u64, region_height as u64, size as u64);
        if h > w {
            let w_cal = scaled_side(s, h, w);
            let gap = half_gap(s, w_cal);
            Placement {
                x: gap as u32,
                y: 0,
                width: w_cal as u32,
                height: size,
            }
        } else {
            let h_cal = scaled_side(s, w, h);
            let gap = half_gap(s, h_cal);
            Placement {
                x: 0,
                y: gap as u32,
                width: size,
                height: h_cal as u32,
            }
        }
    }
}

/// `ceil(size / long_side * short_side)` in f64, matching the float math the
/// classifier's training canvases were built with. The product can land one
/// past `size` (e.g. 300 / 73 * 73), hence the clamp.
fn scaled_side(size: u64, long_side: u64, short_side: u64) -> u64 {
    let k = size as f64 / long_side as f64;
    ((k * short_side as f64).ceil() as u64).min(size)
}

fn half_gap(size: u64, side: u64) -> u64 {
    ((size - side) as f64 / 2.0).ceil() as u64
}

#[derive(Debug, Clone, Copy)]
pub struct CanvasNormalizer {
    size: u32,
    filter: FilterType,
}

impl CanvasNormalizer {
    pub fn new(size: u32) -> Self {
        Self {
            size,
            filter: FilterType::Triangle,
        }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn normalize(&self, frame: &Frame, region: &Region) -> Result<Canvas, SignError> {
        if region.is_empty() || region.x2 > frame.width || region.y2 > frame.height {
            return Err(SignError::EmptyRegion);
        }

        let crop = crop_rgb(frame, region)?;

        let placement = Placement::letterbox(region.width(), region.height(), self.size);
        let resized = imageops::resize(&crop, placement.width, placement.height, self.filter);

        let mut canvas = Canvas::blank(self.size);
        imageops::replace(
            &mut canvas.image,
            &resized,
            placement.x as i64,
            placement.y as i64,
        );
        Ok(canvas)
    }
}

/// Copies `region` out of the RGBA frame, dropping alpha.
fn crop_rgb(frame: &Frame, region: &Region) -> Result<RgbImage, SignError> {
    if frame.data.len() != frame.pixel_count() * 4 {
        return Err(SignError::InvalidFrame {
            width: frame.width,
            height: frame.height,
            len: frame.data.len(),
        });
    }
    let stride = frame.width as usize;
    Ok(RgbImage::from_fn(region.width(), region.height(), |x, y| {
        let idx = ((region.y1 + y) as usize * stride + (region.x1 + x) as usize) * 4;
        Rgb([frame.data[idx], frame.data[idx + 1], frame.data[idx + 2]])
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn red_frame(width: u32, height: u32) -> Frame {
        Frame::filled(width, height, [200, 10, 10, 255], 0, 0).unwrap()
    }

    fn full_region(width: u32, height: u32) -> Region {
        Region {
            x1: 0,
            y1: 0,
            x2: width,
            y2: height,
        }
    }

    #[test]
    fn test_portrait_placement() {
        let p = Placement::letterbox(50, 100, 300);
        assert_eq!(
            p,
            Placement {
                x: 75,
                y: 0,
                width: 150,
                height: 300
            }
        );
    }

    #[test]
    fn test_landscape_placement_rounds_up() {
        // k * h = 300 / 70 * 40 = 171.43 -> 172, gap = ceil(128 / 2) = 64
        let p = Placement::letterbox(70, 40, 300);
        assert_eq!(
            p,
            Placement {
                x: 0,
                y: 64,
                width: 300,
                height: 172
            }
        );
    }

    #[test]
    fn test_square_region_fills_canvas() {
        let p = Placement::letterbox(33, 33, 300);
        assert_eq!(
            p,
            Placement {
                x: 0,
                y: 0,
                width: 300,
                height: 300
            }
        );
    }

    #[test]
    fn test_portrait_uses_float_scale() {
        // 300 / 33 * 11 = 100.00000000000001 in f64 -> 101
        let p = Placement::letterbox(11, 33, 300);
        assert_eq!((p.width, p.x), (101, 100));
        assert_eq!(p.height, 300);
    }

    #[test]
    fn test_square_overshoot_clamped_to_canvas() {
        // 300 / 73 * 73 rounds just above 300 in f64
        let p = Placement::letterbox(73, 73, 300);
        assert_eq!(
            p,
            Placement {
                x: 0,
                y: 0,
                width: 300,
                height: 300
            }
        );
    }

    #[test]
    fn test_odd_gap_stays_inside_canvas() {
        let p = Placement::letterbox(3, 2, 7);
        assert_eq!(p.height, 5);
        assert_eq!(p.y, 1);
        assert!(p.y + p.height <= 7);
    }

    #[test]
    fn test_normalize_is_always_square() {
        let normalizer = CanvasNormalizer::new(64);
        for (w, h) in [(1, 1), (1, 50), (50, 1), (17, 31), (40, 40), (99, 12)] {
            let frame = red_frame(w, h);
            let canvas = normalizer.normalize(&frame, &full_region(w, h)).unwrap();
            assert_eq!(canvas.image().dimensions(), (64, 64));
        }
    }

    #[test]
    fn test_letterbox_keeps_aspect_ratio() {
        let normalizer = CanvasNormalizer::new(300);
        for (w, h) in [(40, 100), (100, 40), (120, 90), (37, 61)] {
            let frame = red_frame(w, h);
            let canvas = normalizer.normalize(&frame, &full_region(w, h)).unwrap();
            let (_, _, cw, ch) = canvas.content_bounds().unwrap();

            let expected = h as f64 / w as f64;
            // One pixel of rounding on the short side.
            let lo = (ch as f64 - 1.0) / cw as f64;
            let hi = (ch as f64 + 1.0) / cw as f64;
            assert!(
                lo <= expected && expected <= hi,
                "{}x{} gave content {}x{}",
                w,
                h,
                cw,
                ch
            );
        }
    }

    #[test]
    fn test_background_is_white_outside_content() {
        let normalizer = CanvasNormalizer::new(100);
        let frame = red_frame(20, 80);
        let canvas = normalizer.normalize(&frame, &full_region(20, 80)).unwrap();

        assert_eq!(*canvas.image().get_pixel(0, 50), BACKGROUND);
        assert_eq!(*canvas.image().get_pixel(99, 50), BACKGROUND);
        let inside = canvas.image().get_pixel(50, 50).0;
        assert!(inside[0] > 150 && inside[1] < 50, "{:?}", inside);
    }

    #[test]
    fn test_crop_uses_region_offset() {
        let mut frame = Frame::filled(10, 10, [0, 0, 0, 255], 0, 0).unwrap();
        // Right half is green.
        for y in 0..10usize {
            for x in 5..10usize {
                let idx = (y * 10 + x) * 4;
                frame.data[idx..idx + 4].copy_from_slice(&[0, 255, 0, 255]);
            }
        }
        let region = Region {
            x1: 5,
            y1: 0,
            x2: 10,
            y2: 10,
        };
        let canvas = CanvasNormalizer::new(20).normalize(&frame, &region).unwrap();
        let pixel = canvas.image().get_pixel(10, 10).0;
        assert!(pixel[1] > 200 && pixel[0] < 50, "{:?}", pixel);
    }

    #[test]
    fn test_empty_region_rejected() {
        let normalizer = CanvasNormalizer::new(32);
        let frame = red_frame(10, 10);
        let empty = Region {
            x1: 4,
            y1: 4,
            x2: 4,
            y2: 9,
        };
        assert!(matches!(
            normalizer.normalize(&frame, &empty),
            Err(SignError::EmptyRegion)
        ));

        let outside = full_region(11, 10);
        assert!(matches!(
            normalizer.normalize(&frame, &outside),
            Err(SignError::EmptyRegion)
        ));
    }

    #[test]
    fn test_tensor_and_jpeg() {
        let canvas = Canvas::blank(8);
        let tensor = canvas.to_tensor();
        assert_eq!(tensor.len(), 8 * 8 * 3);
        assert!(tensor.iter().all(|&v| (v - 1.0).abs() < f32::EPSILON));

        let jpeg = canvas.encode_jpeg(80).unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
        assert!(canvas.content_bounds().is_none());
    }
}
