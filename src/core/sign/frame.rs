use std::time::Duration;

use super::error::SignError;

/// 帧数据结构 (RGBA)
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    pub timestamp: Duration,
    pub frame_number: u64,
}

impl Frame {
    pub fn new(
        width: u32,
        height: u32,
        data: Vec<u8>,
        timestamp_ms: u64,
        frame_number: u64,
    ) -> Result<Self, SignError> {
        if width == 0 || height == 0 || data.len() != width as usize * height as usize * 4 {
            return Err(SignError::InvalidFrame {
                width,
                height,
                len: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
            timestamp: Duration::from_millis(timestamp_ms),
            frame_number,
        })
    }

    /// Solid-color frame, mostly useful for tests and warm-up.
    pub fn filled(
        width: u32,
        height: u32,
        rgba: [u8; 4],
        timestamp_ms: u64,
        frame_number: u64,
    ) -> Result<Self, SignError> {
        let data = rgba
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect();
        Self::new(width, height, data, timestamp_ms, frame_number)
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn info(&self) -> FrameInfo {
        FrameInfo::from_frame(self)
    }
}

/// 帧元数据（轻量级，用于传递信息）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameInfo {
    pub width: u32,
    pub height: u32,
    pub timestamp_ms: u64,
    pub frame_number: u64,
}

impl FrameInfo {
    pub fn from_frame(frame: &Frame) -> Self {
        Self {
            width: frame.width,
            height: frame.height,
            timestamp_ms: frame.timestamp.as_millis() as u64,
            frame_number: frame.frame_number,
        }
    }
}

/// 从原生层传递的原始帧数据 (I420)
#[derive(Debug)]
pub struct RawFrame {
    pub width: u32,
    pub height: u32,
    pub y_plane: Vec<u8>,
    pub u_plane: Vec<u8>,
    pub v_plane: Vec<u8>,
    pub timestamp_ms: u64,
    pub frame_number: u64,
}

impl RawFrame {
    pub fn to_rgba(&self) -> Result<Frame, SignError> {
        let w = self.width as usize;
        let h = self.height as usize;
        let chroma_w = w.div_ceil(2);
        let chroma_len = chroma_w * h.div_ceil(2);

        if self.y_plane.len() < w * h
            || self.u_plane.len() < chroma_len
            || self.v_plane.len() < chroma_len
        {
            return Err(SignError::InvalidFrame {
                width: self.width,
                height: self.height,
                len: self.y_plane.len(),
            });
        }

        let mut rgba_data = vec![0u8; w * h * 4];

        for y in 0..h {
            for x in 0..w {
                let y_idx = y * w + x;
                let uv_idx = (y / 2) * chroma_w + x / 2;

                let y_val = self.y_plane[y_idx] as f32;
                let u_val = self.u_plane[uv_idx] as f32 - 128.0;
                let v_val = self.v_plane[uv_idx] as f32 - 128.0;

                let r = (y_val + 1.402 * v_val).clamp(0.0, 255.0) as u8;
                let g = (y_val - 0.344136 * u_val - 0.714136 * v_val).clamp(0.0, 255.0) as u8;
                let b = (y_val + 1.772 * u_val).clamp(0.0, 255.0) as u8;

                let rgba_idx = y_idx * 4;
                rgba_data[rgba_idx] = r;
                rgba_data[rgba_idx + 1] = g;
                rgba_data[rgba_idx + 2] = b;
                rgba_data[rgba_idx + 3] = 255;
            }
        }

        Frame::new(
            self.width,
            self.height,
            rgba_data,
            self.timestamp_ms,
            self.frame_number,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_creation() {
        let data = vec![255u8; 100 * 100 * 4];
        let frame = Frame::new(100, 100, data, 1000, 30).unwrap();

        assert_eq!(frame.width, 100);
        assert_eq!(frame.height, 100);
        assert_eq!(frame.pixel_count(), 10000);
        assert_eq!(frame.timestamp.as_millis(), 1000);
        assert_eq!(frame.frame_number, 30);
    }

    #[test]
    fn test_frame_rejects_short_buffer() {
        let result = Frame::new(10, 10, vec![0u8; 10], 0, 0);
        assert!(matches!(result, Err(SignError::InvalidFrame { len: 10, .. })));
    }

    #[test]
    fn test_filled_frame() {
        let frame = Frame::filled(4, 3, [10, 20, 30, 255], 0, 0).unwrap();
        assert_eq!(frame.data.len(), 48);
        assert_eq!(&frame.data[44..], &[10, 20, 30, 255]);
    }

    #[test]
    fn test_yuv_to_rgba() {
        let width = 64;
        let height = 64;
        let raw_frame = RawFrame {
            width,
            height,
            y_plane: vec![128u8; (width * height) as usize],
            u_plane: vec![128u8; (width * height / 4) as usize],
            v_plane: vec![128u8; (width * height / 4) as usize],
            timestamp_ms: 40,
            frame_number: 2,
        };

        let frame = raw_frame.to_rgba().unwrap();
        assert_eq!(frame.width, width);
        assert_eq!(frame.data.len(), (width * height * 4) as usize);
        assert_eq!(&frame.data[..4], &[128, 128, 128, 255]);
        assert_eq!(frame.info().frame_number, 2);
    }

    #[test]
    fn test_yuv_odd_dimensions() {
        let raw_frame = RawFrame {
            width: 3,
            height: 3,
            y_plane: vec![0u8; 9],
            u_plane: vec![128u8; 4],
            v_plane: vec![128u8; 4],
            timestamp_ms: 0,
            frame_number: 0,
        };
        assert!(raw_frame.to_rgba().is_ok());
    }

    #[test]
    fn test_yuv_missing_chroma() {
        let raw_frame = RawFrame {
            width: 4,
            height: 4,
            y_plane: vec![0u8; 16],
            u_plane: vec![],
            v_plane: vec![],
            timestamp_ms: 0,
            frame_number: 0,
        };
        assert!(raw_frame.to_rgba().is_err());
    }
}
