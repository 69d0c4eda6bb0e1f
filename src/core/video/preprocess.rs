//! 帧预处理：降分辨率 → 轻度去噪 → 亮度直方图均衡
//!
//! 每一步可单独开关，失败时记录告警并沿用该步的输入，不向上抛错。

use super::frame::Frame;
use crate::core::error::PushupError;
use log::warn;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// 3x3 高斯核（σ = 1.0）的一维可分离权重
const GAUSS_SIDE: f32 = 0.274_068_6;
const GAUSS_CENTER: f32 = 0.451_862_8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PreprocessStep {
    Downscale,
    Denoise,
    Equalize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    pub downscale: bool,
    pub max_width: u32,
    pub denoise: bool,
    pub equalize: bool,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            downscale: true,
            max_width: 640,
            denoise: true,
            equalize: true,
        }
    }
}

impl PreprocessConfig {
    pub fn validate(&self) -> Result<(), PushupError> {
        if self.downscale && self.max_width == 0 {
            return Err(PushupError::Config("max_width must be positive".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Prepared {
    pub frame: Frame,
    /// 失败并被跳过的步骤
    pub warnings: Vec<PreprocessStep>,
}

impl Prepared {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

pub struct FramePreprocessor {
    config: PreprocessConfig,
}

impl FramePreprocessor {
    pub fn new() -> Self {
        Self::with_config(PreprocessConfig::default())
    }

    pub fn with_config(config: PreprocessConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PreprocessConfig {
        &self.config
    }

    pub fn prepare(&self, frame: Frame) -> Prepared {
        let mut warnings = Vec::new();
        let mut frame = frame;

        if self.config.downscale {
            let max_width = self.config.max_width;
            frame = Self::apply(PreprocessStep::Downscale, frame, &mut warnings, |f| {
                downscale(f, max_width)
            });
        }
        if self.config.denoise {
            frame = Self::apply(PreprocessStep::Denoise, frame, &mut warnings, denoise);
        }
        if self.config.equalize {
            frame = Self::apply(PreprocessStep::Equalize, frame, &mut warnings, equalize_luma);
        }

        Prepared { frame, warnings }
    }

    fn apply<F>(step: PreprocessStep, frame: Frame, warnings: &mut Vec<PreprocessStep>, op: F) -> Frame
    where
        F: FnOnce(&Frame) -> Result<Option<Frame>, PushupError>,
    {
        match op(&frame) {
            Ok(Some(out)) => out,
            Ok(None) => frame,
            Err(e) => {
                warn!("⚠️ FramePreprocessor: {:?} skipped on frame {}: {}", step, frame.frame_number, e);
                warnings.push(step);
                frame
            }
        }
    }
}

impl Default for FramePreprocessor {
    fn default() -> Self {
        Self::new()
    }
}

/// 宽度超过上限时等比缩放到 `max_width`，高度向下取整
pub fn downscale(frame: &Frame, max_width: u32) -> Result<Option<Frame>, PushupError> {
    frame.validate()?;
    if frame.width <= max_width {
        return Ok(None);
    }
    let new_height = ((frame.height as f64 * max_width as f64 / frame.width as f64) as u32).max(1);
    frame.resize_to(max_width, new_height).map(Some)
}

/// 3x3 高斯模糊，边缘像素取最近值，alpha 不变
pub fn denoise(frame: &Frame) -> Result<Option<Frame>, PushupError> {
    frame.validate()?;
    let w = frame.width as usize;
    let h = frame.height as usize;
    let row_len = w * 4;
    let src = &frame.data;

    let mut horizontal = vec![0u8; src.len()];
    horizontal
        .par_chunks_mut(row_len)
        .enumerate()
        .for_each(|(y, row)| {
            let base = y * row_len;
            for x in 0..w {
                let left = x.saturating_sub(1);
                let right = (x + 1).min(w - 1);
                for c in 0..3 {
                    let v = GAUSS_SIDE * src[base + left * 4 + c] as f32
                        + GAUSS_CENTER * src[base + x * 4 + c] as f32
                        + GAUSS_SIDE * src[base + right * 4 + c] as f32;
                    row[x * 4 + c] = v.round().clamp(0.0, 255.0) as u8;
                }
                row[x * 4 + 3] = src[base + x * 4 + 3];
            }
        });

    let mut out = vec![0u8; src.len()];
    out.par_chunks_mut(row_len).enumerate().for_each(|(y, row)| {
        let up = y.saturating_sub(1) * row_len;
        let mid = y * row_len;
        let down = (y + 1).min(h - 1) * row_len;
        for i in 0..row_len {
            if i % 4 == 3 {
                row[i] = horizontal[mid + i];
                continue;
            }
            let v = GAUSS_SIDE * horizontal[up + i] as f32
                + GAUSS_CENTER * horizontal[mid + i] as f32
                + GAUSS_SIDE * horizontal[down + i] as f32;
            row[i] = v.round().clamp(0.0, 255.0) as u8;
        }
    });

    Ok(Some(Frame {
        data: out,
        ..frame.clone_meta()
    }))
}

/// RGB → YCbCr，仅对 Y 做直方图均衡后转回 RGB
pub fn equalize_luma(frame: &Frame) -> Result<Option<Frame>, PushupError> {
    frame.validate()?;

    let luma: Vec<u8> = frame
        .data
        .par_chunks_exact(4)
        .map(|px| rgb_to_luma(px[0], px[1], px[2]))
        .collect();

    let mut hist = [0u32; 256];
    for &y in &luma {
        hist[y as usize] += 1;
    }

    let Some(lut) = equalization_lut(&hist) else {
        return Ok(None);
    };

    let mut data = frame.data.clone();
    data.par_chunks_exact_mut(4)
        .zip(luma.par_iter())
        .for_each(|(px, &y)| {
            let (r, g, b) = (px[0] as f32, px[1] as f32, px[2] as f32);
            let cb = -0.168_736 * r - 0.331_264 * g + 0.5 * b;
            let cr = 0.5 * r - 0.418_688 * g - 0.081_312 * b;
            let y_eq = lut[y as usize] as f32;

            px[0] = (y_eq + 1.402 * cr).round().clamp(0.0, 255.0) as u8;
            px[1] = (y_eq - 0.344_136 * cb - 0.714_136 * cr).round().clamp(0.0, 255.0) as u8;
            px[2] = (y_eq + 1.772 * cb).round().clamp(0.0, 255.0) as u8;
        });

    Ok(Some(Frame {
        data,
        ..frame.clone_meta()
    }))
}

fn rgb_to_luma(r: u8, g: u8, b: u8) -> u8 {
    (0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32)
        .round()
        .clamp(0.0, 255.0) as u8
}

/// 累积分布映射；只有一个灰度级时返回 None（保持原样）
fn equalization_lut(hist: &[u32; 256]) -> Option<[u8; 256]> {
    let total: u64 = hist.iter().map(|&c| c as u64).sum();
    let cdf_min = hist.iter().find(|&&c| c > 0).copied()? as u64;
    if total == cdf_min {
        return None;
    }

    let mut lut = [0u8; 256];
    let mut cdf = 0u64;
    let scale = 255.0 / (total - cdf_min) as f64;
    for (i, &count) in hist.iter().enumerate() {
        cdf += count as u64;
        lut[i] = (cdf.saturating_sub(cdf_min) as f64 * scale).round().clamp(0.0, 255.0) as u8;
    }
    Some(lut)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gray_frame(width: u32, height: u32, values: &[u8]) -> Frame {
        let data: Vec<u8> = (0..(width * height) as usize)
            .flat_map(|i| {
                let v = values[i % values.len()];
                [v, v, v, 255]
            })
            .collect();
        Frame::new(width, height, data, 0, 1)
    }

    #[test]
    fn test_downscale_wide_frame() {
        let frame = Frame::filled(1280, 720, [10, 20, 30, 255], 4);
        let out = downscale(&frame, 640).unwrap().unwrap();
        assert_eq!((out.width, out.height), (640, 360));
        assert_eq!(out.frame_number, 4);
    }

    #[test]
    fn test_downscale_truncates_height() {
        let frame = Frame::filled(641, 480, [0, 0, 0, 255], 0);
        let out = downscale(&frame, 640).unwrap().unwrap();
        assert_eq!((out.width, out.height), (640, 479));
    }

    #[test]
    fn test_downscale_keeps_small_frame() {
        let frame = Frame::filled(640, 480, [0, 0, 0, 255], 0);
        assert!(downscale(&frame, 640).unwrap().is_none());
    }

    #[test]
    fn test_denoise_uniform_unchanged() {
        let frame = Frame::filled(16, 9, [120, 60, 200, 255], 0);
        let out = denoise(&frame).unwrap().unwrap();
        assert_eq!(out.data, frame.data);
    }

    #[test]
    fn test_denoise_softens_spike() {
        let mut frame = gray_frame(5, 5, &[0]);
        let center = (2 * 5 + 2) * 4;
        frame.data[center..center + 3].copy_from_slice(&[255, 255, 255]);

        let out = denoise(&frame).unwrap().unwrap();
        assert!(out.data[center] < 255);
        assert!(out.data[center] > 0);
        // 相邻像素被抬高
        assert!(out.data[center + 4] > 0);
        assert_eq!(out.data[center + 3], 255);
    }

    #[test]
    fn test_equalize_uniform_unchanged() {
        let frame = Frame::filled(8, 8, [90, 90, 90, 255], 0);
        assert!(equalize_luma(&frame).unwrap().is_none());
    }

    #[test]
    fn test_equalize_stretches_low_contrast() {
        let frame = gray_frame(8, 8, &[100, 110]);
        let out = equalize_luma(&frame).unwrap().unwrap();

        let lumas: Vec<u8> = out.data.chunks_exact(4).map(|px| px[0]).collect();
        assert_eq!(*lumas.iter().min().unwrap(), 0);
        assert_eq!(*lumas.iter().max().unwrap(), 255);
        assert!(out.data.chunks_exact(4).all(|px| px[3] == 255));
    }

    #[test]
    fn test_prepare_full_chain() {
        let preprocessor = FramePreprocessor::new();
        let frame = gray_frame(1280, 720, &[40, 60, 80]);

        let prepared = preprocessor.prepare(frame);
        assert!(prepared.is_clean());
        assert_eq!((prepared.frame.width, prepared.frame.height), (640, 360));
    }

    #[test]
    fn test_prepare_fail_soft_on_bad_buffer() {
        let preprocessor = FramePreprocessor::new();
        let frame = Frame::new(1280, 720, vec![0u8; 16], 0, 9);

        let prepared = preprocessor.prepare(frame);
        assert_eq!(
            prepared.warnings,
            vec![
                PreprocessStep::Downscale,
                PreprocessStep::Denoise,
                PreprocessStep::Equalize
            ]
        );
        assert_eq!(prepared.frame.data.len(), 16);
        assert_eq!(prepared.frame.frame_number, 9);
    }

    #[test]
    fn test_prepare_fail_soft_on_oversized_dimensions() {
        let frame = Frame::new(70_000, 70_000, vec![0u8; 16], 0, 1);
        let prepared = FramePreprocessor::new().prepare(frame);

        assert_eq!(prepared.warnings.len(), 3);
        assert_eq!((prepared.frame.width, prepared.frame.height), (70_000, 70_000));
        assert_eq!(prepared.frame.data.len(), 16);
    }

    #[test]
    fn test_steps_can_be_disabled() {
        let preprocessor = FramePreprocessor::with_config(PreprocessConfig {
            downscale: false,
            denoise: false,
            equalize: false,
            ..Default::default()
        });
        let frame = gray_frame(1280, 2, &[100, 110]);
        let original = frame.data.clone();

        let prepared = preprocessor.prepare(frame);
        assert_eq!(prepared.frame.width, 1280);
        assert_eq!(prepared.frame.data, original);
    }
}
