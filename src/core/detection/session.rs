//! 单次训练会话：统计、汇总，以及摄像头实时检测的启停

use crate::core::detection::pipeline::{DetectionPipeline, FrameOutcome};
use crate::core::error::PushupError;
use crate::core::pose::rep_counter::Stage;
use crate::core::video::source::FrameSource;
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// 会话内统计，开始检测时创建，停止时丢弃
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionCounters {
    pub frames_seen: u64,
    pub frames_sampled: u64,
    pub frames_with_pose: u64,
    pub reps: u64,
    /// 邮箱中未被消费就被覆盖的帧
    pub frames_dropped: u64,
}

/// 会话结束时交给外部持久化的记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub reps: u64,
    pub final_stage: Stage,
    pub frames_seen: u64,
    pub frames_sampled: u64,
    pub frames_with_pose: u64,
    pub frames_dropped: u64,
    pub duration_ms: u64,
}

impl SessionSummary {
    pub fn to_json(&self) -> Result<String, PushupError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// 摄像头实时检测：采集线程写邮箱，宿主定时调用 [`DetectionSession::tick`]
pub struct DetectionSession {
    source: FrameSource,
    pipeline: DetectionPipeline,
    active: bool,
}

impl DetectionSession {
    pub fn new(source: FrameSource, pipeline: DetectionPipeline) -> Self {
        Self {
            source,
            pipeline,
            active: false,
        }
    }

    /// 会话进行中再次调用不做任何事，计数保持不变
    pub fn start(&mut self) -> Result<(), PushupError> {
        if self.active {
            debug!("DetectionSession: already active, start ignored");
            return Ok(());
        }
        self.pipeline.begin_session();
        self.source.slot().clear();
        self.source.start()?;
        self.active = true;
        info!("🏋️ DetectionSession: started on device #{}", self.source.device_index());
        Ok(())
    }

    /// 处理邮箱中最新的一帧；未开始或没有新帧时返回 None
    pub fn tick(&mut self) -> Option<FrameOutcome> {
        if !self.active {
            return None;
        }
        let slot = self.source.slot();
        self.pipeline.poll_slot(&slot)
    }

    pub fn pause(&self) {
        self.source.pause();
    }

    pub fn resume(&self) {
        self.source.resume();
    }

    pub fn switch_device(&mut self) -> Result<(), PushupError> {
        self.source.switch_device()
    }

    pub fn reset_counter(&mut self) {
        self.pipeline.reset_counter();
    }

    pub fn stop(&mut self) -> SessionSummary {
        self.source.stop();
        self.active = false;
        let summary = self.pipeline.summary();
        info!(
            "✅ DetectionSession: finished with {} reps ({} frames sampled)",
            summary.reps, summary.frames_sampled
        );
        summary
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn pipeline(&self) -> &DetectionPipeline {
        &self.pipeline
    }

    pub fn pipeline_mut(&mut self) -> &mut DetectionPipeline {
        &mut self.pipeline
    }

    pub fn source(&self) -> &FrameSource {
        &self.source
    }
}
