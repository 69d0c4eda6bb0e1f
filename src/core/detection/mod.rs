//! 检测流水线与会话

pub mod pipeline;
pub mod session;

pub use pipeline::{DetectionEvent, DetectionPipeline, FrameOutcome, PlaybackTick};
pub use session::{DetectionSession, SessionCounters, SessionSummary};
