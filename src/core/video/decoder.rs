//! 顺序解码器：视频文件回放时由流水线逐帧拉取

use super::frame::Frame;
use crate::core::error::PushupError;
use log::{debug, info};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::time::Duration;

const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

pub trait FrameDecoder {
    /// `Ok(None)` 表示流结束
    fn next_frame(&mut self) -> Result<Option<Frame>, PushupError>;
}

/// 内存中的帧序列（宿主推送的帧、测试）
pub struct MemoryDecoder {
    frames: VecDeque<Frame>,
}

impl MemoryDecoder {
    pub fn new(frames: Vec<Frame>) -> Self {
        Self {
            frames: frames.into(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl FrameDecoder for MemoryDecoder {
    fn next_frame(&mut self) -> Result<Option<Frame>, PushupError> {
        Ok(self.frames.pop_front())
    }
}

/// 目录中按文件名排序的图片序列（视频预先抽帧得到）
pub struct ImageSequenceDecoder {
    paths: VecDeque<PathBuf>,
    frame_interval: Duration,
    next_number: u64,
}

impl ImageSequenceDecoder {
    pub fn open(dir: impl AsRef<Path>, fps: f32) -> Result<Self, PushupError> {
        let dir = dir.as_ref();
        if !fps.is_finite() || fps <= 0.0 {
            return Err(PushupError::Config(format!("fps must be positive, got {fps}")));
        }

        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && has_image_extension(p))
            .collect();
        paths.sort();

        if paths.is_empty() {
            return Err(PushupError::Decode(format!("no image frames in {:?}", dir)));
        }

        info!("🎬 ImageSequenceDecoder: {} frames from {:?}", paths.len(), dir);
        Ok(Self {
            paths: paths.into(),
            frame_interval: Duration::from_nanos((1e9 / fps as f64).round() as u64),
            next_number: 1,
        })
    }

    pub fn remaining(&self) -> usize {
        self.paths.len()
    }
}

impl FrameDecoder for ImageSequenceDecoder {
    fn next_frame(&mut self) -> Result<Option<Frame>, PushupError> {
        let Some(path) = self.paths.pop_front() else {
            return Ok(None);
        };

        let img = image::open(&path)?.to_rgba8();
        let number = self.next_number;
        self.next_number += 1;
        debug!("ImageSequenceDecoder: decoded {:?} as frame {}", path, number);

        let timestamp = self.frame_interval * (number - 1) as u32;
        Ok(Some(Frame::from_image(img, timestamp, number)))
    }
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}
