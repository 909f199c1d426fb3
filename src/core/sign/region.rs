//! 手部区域选择 - 单手取第一个检测框，双手取两个检测框的并集

use serde::{Deserialize, Serialize};

/// Detector output for one hand, in source-frame pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> i64 {
        self.x as i64 + self.width as i64
    }

    pub fn bottom(&self) -> i64 {
        self.y as i64 + self.height as i64
    }

    /// Smallest box containing both `self` and `other`.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        let min_x = self.x.min(other.x);
        let min_y = self.y.min(other.y);
        let max_x = self.right().max(other.right());
        let max_y = self.bottom().max(other.bottom());

        BoundingBox {
            x: min_x,
            y: min_y,
            width: u32::try_from(max_x - min_x as i64).unwrap_or(u32::MAX),
            height: u32::try_from(max_y - min_y as i64).unwrap_or(u32::MAX),
        }
    }
}

/// Padded, frame-clamped rectangle. Always satisfies `x1 <= x2 <= frame_width`
/// and `y1 <= y2 <= frame_height`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl Region {
    pub fn width(&self) -> u32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> u32 {
        self.y2 - self.y1
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandMode {
    #[default]
    Single,
    Double,
}

impl HandMode {
    pub fn toggled(self) -> Self {
        match self {
            HandMode::Single => HandMode::Double,
            HandMode::Double => HandMode::Single,
        }
    }

    /// Number of detected hands this mode needs before it can produce a region.
    pub fn required_hands(self) -> usize {
        match self {
            HandMode::Single => 1,
            HandMode::Double => 2,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RegionSelector {
    padding: u32,
}

impl RegionSelector {
    pub fn new(padding: u32) -> Self {
        Self { padding }
    }

    pub fn padding(&self) -> u32 {
        self.padding
    }

    /// Picks the region to normalize for this frame, or `None` when there are
    /// too few hands for `mode` or the clamped region has no area.
    pub fn select(
        &self,
        hands: &[BoundingBox],
        mode: HandMode,
        frame_width: u32,
        frame_height: u32,
    ) -> Option<Region> {
        let target = match mode {
            HandMode::Single => *hands.first()?,
            HandMode::Double => match hands {
                [first, second, ..] => first.union(second),
                _ => return None,
            },
        };
        self.pad_and_clamp(&target, frame_width, frame_height)
    }

    pub fn pad_and_clamp(
        &self,
        bbox: &BoundingBox,
        frame_width: u32,
        frame_height: u32,
    ) -> Option<Region> {
        let pad = self.padding as i64;
        let (x1, x2) = clamp_span(bbox.x as i64 - pad, bbox.right() + pad, frame_width);
        let (y1, y2) = clamp_span(bbox.y as i64 - pad, bbox.bottom() + pad, frame_height);

        let region = Region { x1, y1, x2, y2 };
        if region.is_empty() {
            None
        } else {
            Some(region)
        }
    }
}

fn clamp_span(start: i64, end: i64, limit: u32) -> (u32, u32) {
    let limit = limit as i64;
    let lo = start.clamp(0, limit);
    let hi = end.clamp(lo, limit);
    (lo as u32, hi as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_union_of_two_boxes() {
        let a = BoundingBox::new(0, 0, 10, 10);
        let b = BoundingBox::new(20, 20, 5, 5);
        assert_eq!(a.union(&b), BoundingBox::new(0, 0, 25, 25));
        assert_eq!(b.union(&a), BoundingBox::new(0, 0, 25, 25));
    }

    #[test]
    fn test_union_of_extreme_boxes_saturates() {
        let a = BoundingBox::new(i32::MIN, 0, 10, 10);
        let b = BoundingBox::new(i32::MAX, 0, u32::MAX, 10);
        let union = a.union(&b);
        assert_eq!(union.x, i32::MIN);
        assert_eq!(union.width, u32::MAX);
        assert_eq!(union.height, 10);
    }

    #[test]
    fn test_double_mode_uses_union_before_padding() {
        let selector = RegionSelector::new(0);
        let hands = [BoundingBox::new(0, 0, 10, 10), BoundingBox::new(20, 20, 5, 5)];
        let region = selector.select(&hands, HandMode::Double, 100, 100).unwrap();
        assert_eq!(
            region,
            Region {
                x1: 0,
                y1: 0,
                x2: 25,
                y2: 25
            }
        );
    }

    #[test]
    fn test_single_mode_pads_first_hand() {
        let selector = RegionSelector::new(20);
        let hands = [BoundingBox::new(100, 100, 50, 80), BoundingBox::new(0, 0, 5, 5)];
        let region = selector.select(&hands, HandMode::Single, 640, 480).unwrap();
        assert_eq!(
            region,
            Region {
                x1: 80,
                y1: 80,
                x2: 170,
                y2: 200
            }
        );
    }

    #[test]
    fn test_padding_clamped_to_frame() {
        let selector = RegionSelector::new(20);
        let hands = [BoundingBox::new(5, 460, 50, 40)];
        let region = selector.select(&hands, HandMode::Single, 640, 480).unwrap();
        assert_eq!(region.x1, 0);
        assert_eq!(region.y2, 480);
        assert!(region.x2 <= 640 && region.y1 <= region.y2);
    }

    #[test]
    fn test_not_enough_hands() {
        let selector = RegionSelector::new(20);
        assert!(selector.select(&[], HandMode::Single, 640, 480).is_none());
        let one = [BoundingBox::new(10, 10, 10, 10)];
        assert!(selector.select(&one, HandMode::Double, 640, 480).is_none());
    }

    #[test]
    fn test_region_outside_frame_is_none() {
        let selector = RegionSelector::new(20);
        let hands = [BoundingBox::new(700, 10, 30, 30)];
        assert!(selector.select(&hands, HandMode::Single, 640, 480).is_none());

        let above = [BoundingBox::new(10, -200, 30, 30)];
        assert!(selector.select(&above, HandMode::Single, 640, 480).is_none());
    }

    #[test]
    fn test_mode_toggle() {
        assert_eq!(HandMode::Single.toggled(), HandMode::Double);
        assert_eq!(HandMode::Double.toggled(), HandMode::Single);
        assert_eq!(HandMode::Double.required_hands(), 2);
    }
}
