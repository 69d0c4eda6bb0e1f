use crate::core::error::PushupError;
use image::imageops::{self, FilterType};
use image::RgbaImage;
use std::time::Duration;

/// 帧数据结构
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>, // RGBA 格式
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
    ) -> Self {
        Self {
            width,
            height,
            data,
            timestamp: Duration::from_millis(timestamp_ms),
            frame_number,
        }
    }

    /// 纯色帧，测试和占位画面用
    pub fn filled(width: u32, height: u32, rgba: [u8; 4], frame_number: u64) -> Self {
        let len = (width as usize)
            .saturating_mul(height as usize)
            .saturating_mul(4);
        let data = rgba.iter().copied().cycle().take(len).collect();
        Self::new(width, height, data, 0, frame_number)
    }

    pub fn from_image(img: RgbaImage, timestamp: Duration, frame_number: u64) -> Self {
        Self {
            width: img.width(),
            height: img.height(),
            data: img.into_raw(),
            timestamp,
            frame_number,
        }
    }

    /// 像素数；超出 `usize` 时为 None
    pub fn pixel_count(&self) -> Option<usize> {
        (self.width as usize).checked_mul(self.height as usize)
    }

    /// 缓冲区长度与尺寸是否一致
    pub fn validate(&self) -> Result<(), PushupError> {
        if self.width == 0 || self.height == 0 {
            return Err(PushupError::Preprocess(format!(
                "empty frame {}x{}",
                self.width, self.height
            )));
        }
        let expected = self.pixel_count().and_then(|n| n.checked_mul(4));
        if expected != Some(self.data.len()) {
            return Err(PushupError::Preprocess(format!(
                "buffer length {} does not match {}x{} RGBA",
                self.data.len(),
                self.width,
                self.height
            )));
        }
        Ok(())
    }

    pub fn to_image(&self) -> Result<RgbaImage, PushupError> {
        self.validate()?;
        RgbaImage::from_raw(self.width, self.height, self.data.clone()).ok_or_else(|| {
            PushupError::Preprocess(format!("invalid {}x{} frame", self.width, self.height))
        })
    }

    pub fn resize_to(&self, target_width: u32, target_height: u32) -> Result<Frame, PushupError> {
        let img = self.to_image()?;
        let resized = imageops::resize(&img, target_width, target_height, FilterType::Triangle);

        Ok(Frame {
            width: target_width,
            height: target_height,
            data: resized.into_raw(),
            timestamp: self.timestamp,
            frame_number: self.frame_number,
        })
    }

    /// 水平镜像（前置摄像头）
    pub fn flip_horizontal(&self) -> Result<Frame, PushupError> {
        let img = self.to_image()?;
        let flipped = imageops::flip_horizontal(&img);

        Ok(Frame {
            data: flipped.into_raw(),
            ..self.clone_meta()
        })
    }

    /// 复制尺寸和元数据，像素缓冲区留空
    pub(crate) fn clone_meta(&self) -> Frame {
        Frame {
            width: self.width,
            height: self.height,
            data: Vec::new(),
            timestamp: self.timestamp,
            frame_number: self.frame_number,
        }
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_creation() {
        let data = vec![255u8; 100 * 100 * 4];
        let frame = Frame::new(100, 100, data, 1000, 30);

        assert_eq!(frame.width, 100);
        assert_eq!(frame.height, 100);
        assert_eq!(frame.pixel_count(), Some(10000));
        assert_eq!(frame.timestamp.as_millis(), 1000);
        assert_eq!(frame.frame_number, 30);
        assert!(frame.validate().is_ok());
    }

    #[test]
    fn test_frame_resize() {
        let frame = Frame::filled(100, 100, [255, 255, 255, 255], 7);
        let resized = frame.resize_to(32, 32).unwrap();

        assert_eq!(resized.width, 32);
        assert_eq!(resized.height, 32);
        assert_eq!(resized.data.len(), 32 * 32 * 4);
        assert_eq!(resized.frame_number, 7);
    }

    #[test]
    fn test_flip_horizontal() {
        // 2x1: 左红右蓝
        let data = vec![255, 0, 0, 255, 0, 0, 255, 255];
        let frame = Frame::new(2, 1, data, 0, 1);
        let flipped = frame.flip_horizontal().unwrap();

        assert_eq!(flipped.data, vec![0, 0, 255, 255, 255, 0, 0, 255]);
        assert_eq!(flipped.frame_number, 1);
    }

    #[test]
    fn test_invalid_buffer_rejected() {
        let frame = Frame::new(4, 4, vec![0u8; 10], 0, 0);
        assert!(matches!(frame.validate(), Err(PushupError::Preprocess(_))));
        assert!(frame.resize_to(2, 2).is_err());

        let empty = Frame::new(0, 4, Vec::new(), 0, 0);
        assert!(empty.validate().is_err());

        let huge = Frame::new(u32::MAX, u32::MAX, vec![0u8; 16], 0, 0);
        assert!(matches!(huge.validate(), Err(PushupError::Preprocess(_))));
    }

    #[test]
    fn test_frame_info() {
        let frame = Frame::new(8, 6, vec![0u8; 8 * 6 * 4], 66, 2);
        let info = FrameInfo::from_frame(&frame);
        assert_eq!(
            info,
            FrameInfo {
                width: 8,
                height: 6,
                timestamp_ms: 66,
                frame_number: 2,
            }
        );
    }
}
