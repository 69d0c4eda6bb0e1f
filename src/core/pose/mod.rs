//! 姿态几何与俯卧撑计数

pub mod angle;
pub mod estimator;
pub mod joints;
pub mod rep_counter;

pub use angle::{angle, LimbAngles};
pub use estimator::{EstimatorConfig, PoseEstimator, ScriptedPoseEstimator};
pub use joints::{BodySide, Joint, JointSet, Point2D, PoseLandmark};
pub use rep_counter::{RepCounter, RepCounterState, RepSnapshot, RepThresholds, Stage};
