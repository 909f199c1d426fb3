use super::frame::Frame;
use super::region::BoundingBox;

/// External hand detector. Only the first two boxes are ever used.
pub trait HandDetector: Send + Sync {
    fn detect(&self, frame: &Frame) -> Vec<BoundingBox>;
}

pub struct MockHandDetector {
    // 按帧编号返回预设的检测框
    pattern: Box<dyn Fn(u64) -> Vec<BoundingBox> + Send + Sync>,
}

impl MockHandDetector {
    pub fn new() -> Self {
        Self::with_pattern(|_| Vec::new())
    }

    pub fn with_pattern<F>(pattern: F) -> Self
    where
        F: Fn(u64) -> Vec<BoundingBox> + Send + Sync + 'static,
    {
        Self {
            pattern: Box::new(pattern),
        }
    }

    /// Same boxes on every frame.
    pub fn constant(hands: Vec<BoundingBox>) -> Self {
        Self::with_pattern(move |_| hands.clone())
    }

    /// Boxes only on the listed frame numbers, nothing elsewhere.
    pub fn on_frames(frames: Vec<u64>, hands: Vec<BoundingBox>) -> Self {
        Self::with_pattern(move |n| {
            if frames.contains(&n) {
                hands.clone()
            } else {
                Vec::new()
            }
        })
    }
}

impl Default for MockHandDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl HandDetector for MockHandDetector {
    fn detect(&self, frame: &Frame) -> Vec<BoundingBox> {
        (self.pattern)(frame.frame_number)
    }
}
