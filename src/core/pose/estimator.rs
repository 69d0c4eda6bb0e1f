use crate::core::error::PushupError;
use crate::core::pose::joints::JointSet;
use crate::core::video::frame::Frame;
use serde::{Deserialize, Serialize};

/// 姿态估计能力（外部模型），帧 → 可选关节点集合。
///
/// 未能可靠检测到人体时返回 `None`，调用方视为"本帧无观测"。
pub trait PoseEstimator: Send {
    fn estimate(&mut self, frame: &Frame) -> Option<JointSet>;
}

/// 构造期参数，运行时不再修改
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    pub min_detection_confidence: f32,
    pub min_tracking_confidence: f32,
    /// 单个关键点可见度低于该值时视为缺失
    pub min_landmark_visibility: f32,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            min_detection_confidence: 0.5,
            min_tracking_confidence: 0.5,
            min_landmark_visibility: 0.5,
        }
    }
}

impl EstimatorConfig {
    pub fn validate(&self) -> Result<(), PushupError> {
        for (name, value) in [
            ("min_detection_confidence", self.min_detection_confidence),
            ("min_tracking_confidence", self.min_tracking_confidence),
            ("min_landmark_visibility", self.min_landmark_visibility),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(PushupError::Config(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }
        Ok(())
    }
}

type Script = Box<dyn FnMut(u64) -> Option<JointSet> + Send>;

/// 按帧号返回预设关节点的估计器，用于测试和离线回放
pub struct ScriptedPoseEstimator {
    script: Option<Script>,
    calls: u64,
}

impl ScriptedPoseEstimator {
    /// 永远检测不到人体
    pub fn new() -> Self {
        Self {
            script: None,
            calls: 0,
        }
    }

    pub fn with_script<F>(script: F) -> Self
    where
        F: FnMut(u64) -> Option<JointSet> + Send + 'static,
    {
        Self {
            script: Some(Box::new(script)),
            calls: 0,
        }
    }

    /// 按调用顺序依次返回，用尽后返回 None
    pub fn with_sequence(poses: Vec<Option<JointSet>>) -> Self {
        let mut iter = poses.into_iter();
        Self::with_script(move |_| iter.next().flatten())
    }

    pub fn calls(&self) -> u64 {
        self.calls
    }
}

impl Default for ScriptedPoseEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl PoseEstimator for ScriptedPoseEstimator {
    fn estimate(&mut self, frame: &Frame) -> Option<JointSet> {
        self.calls += 1;
        self.script.as_mut().and_then(|s| s(frame.frame_number))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::pose::joints::{Joint, Point2D};

    #[test]
    fn test_config_validation() {
        assert!(EstimatorConfig::default().validate().is_ok());

        let bad = EstimatorConfig {
            min_detection_confidence: 1.5,
            ..Default::default()
        };
        assert!(matches!(bad.validate(), Err(PushupError::Config(_))));

        let negative = EstimatorConfig {
            min_tracking_confidence: -0.1,
            ..Default::default()
        };
        assert!(negative.validate().is_err());

        let visibility = EstimatorConfig {
            min_landmark_visibility: 1.2,
            ..Default::default()
        };
        assert!(visibility.validate().is_err());
        assert_eq!(EstimatorConfig::default().min_landmark_visibility, 0.5);
    }

    #[test]
    fn test_scripted_by_frame_number() {
        let mut estimator = ScriptedPoseEstimator::with_script(|n| {
            (n % 2 == 0).then(|| JointSet::new().with(Joint::LeftElbow, Point2D::new(0.5, 0.5)))
        });

        let odd = Frame::filled(2, 2, [0, 0, 0, 255], 1);
        let even = Frame::filled(2, 2, [0, 0, 0, 255], 2);

        assert!(estimator.estimate(&odd).is_none());
        assert_eq!(estimator.estimate(&even).map(|j| j.len()), Some(1));
        assert_eq!(estimator.calls(), 2);
    }

    #[test]
    fn test_sequence_exhausts_to_none() {
        let mut estimator = ScriptedPoseEstimator::with_sequence(vec![Some(JointSet::new()), None]);
        let frame = Frame::filled(2, 2, [0, 0, 0, 255], 0);

        assert!(estimator.estimate(&frame).is_some());
        assert!(estimator.estimate(&frame).is_none());
        assert!(estimator.estimate(&frame).is_none());
    }
}
