//! 检测参数汇总，可从 JSON 覆盖部分字段

use crate::core::error::PushupError;
use crate::core::pose::{BodySide, EstimatorConfig, RepThresholds};
use crate::core::video::{CaptureConfig, PreprocessConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub thresholds: RepThresholds,
    /// 每 N 帧检测一次
    pub process_interval: u32,
    pub side: BodySide,
    pub preprocess: PreprocessConfig,
    pub estimator: EstimatorConfig,
    pub capture: CaptureConfig,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            thresholds: RepThresholds::default(),
            process_interval: 3,
            side: BodySide::Left,
            preprocess: PreprocessConfig::default(),
            estimator: EstimatorConfig::default(),
            capture: CaptureConfig::default(),
        }
    }
}

impl DetectorConfig {
    /// 低端设备：降低采集帧率和检测频率
    pub fn for_low_power() -> Self {
        Self {
            process_interval: 5,
            capture: CaptureConfig {
                target_fps: 15.0,
                ..CaptureConfig::default()
            },
            preprocess: PreprocessConfig {
                max_width: 480,
                ..PreprocessConfig::default()
            },
            ..Self::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, PushupError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, PushupError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn to_json(&self) -> Result<String, PushupError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), PushupError> {
        if self.process_interval == 0 {
            return Err(PushupError::Config("process_interval must be at least 1".to_string()));
        }
        self.thresholds.validate()?;
        self.preprocess.validate()?;
        self.estimator.validate()?;
        self.capture.validate()
    }
}
