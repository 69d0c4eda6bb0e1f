//! 俯卧撑计数器（姿态模型运行在宿主侧）

use crate::core::config::DetectorConfig;
use crate::core::detection::SessionSummary;
use crate::core::error::PushupError;
use crate::core::pose::{JointSet, PoseLandmark, RepCounter, RepSnapshot, Stage};
use flutter_rust_bridge::frb;
use log::{error, info};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

struct CounterSession {
    counter: RepCounter,
    frames_seen: u64,
    frames_with_pose: u64,
    started: Instant,
}

impl CounterSession {
    fn new(config: &DetectorConfig) -> Self {
        Self {
            counter: RepCounter::with_thresholds(config.thresholds, config.side),
            frames_seen: 0,
            frames_with_pose: 0,
            started: Instant::now(),
        }
    }
}

/// 俯卧撑计数器 - 宿主推送每帧的 33 个关键点
///
/// ```dart
/// final counter = PushupCounter.create();
/// final snapshot = counter.observeLandmarks(landmarks: points);
/// print(counter.count);
/// ```
#[frb(opaque)]
pub struct PushupCounter {
    config: DetectorConfig,
    session: Mutex<CounterSession>,
}

impl PushupCounter {
    /// 创建计数器；`config_json` 只需包含要覆盖的字段
    #[frb(sync)]
    pub fn create(config_json: Option<String>) -> Result<Self, PushupError> {
        crate::init_logging();

        let config = match config_json {
            Some(json) => DetectorConfig::from_json_str(&json).map_err(|e| {
                error!("❌ PushupCounter: invalid config: {}", e);
                e
            })?,
            None => DetectorConfig::default(),
        };

        info!(
            "✅ PushupCounter: created (side {:?}, arm {:.0}°/{:.0}°)",
            config.side, config.thresholds.min_arm_angle, config.thresholds.max_arm_angle
        );
        Ok(Self {
            session: Mutex::new(CounterSession::new(&config)),
            config,
        })
    }

    /// 输入一帧的关键点（归一化坐标），可见度不足的点视为缺失
    #[frb(sync)]
    pub fn observe_landmarks(&self, landmarks: Vec<PoseLandmark>) -> RepSnapshot {
        let joints = JointSet::from_landmarks(&landmarks, self.config.estimator.min_landmark_visibility);
        let mut session = self.lock();
        session.frames_seen += 1;

        let snapshot = session.counter.observe(Some(&joints));
        if snapshot.angles.is_some() {
            session.frames_with_pose += 1;
        }
        snapshot
    }

    /// 本帧没有检测到人体
    #[frb(sync)]
    pub fn observe_none(&self) -> RepSnapshot {
        let mut session = self.lock();
        session.frames_seen += 1;
        session.counter.observe(None)
    }

    /// 清零计数并开始新的统计
    #[frb(sync)]
    pub fn reset(&self) {
        *self.lock() = CounterSession::new(&self.config);
    }

    #[frb(sync, getter)]
    pub fn count(&self) -> u64 {
        self.lock().counter.count()
    }

    #[frb(sync, getter)]
    pub fn stage(&self) -> Stage {
        self.lock().counter.stage()
    }

    /// 供外部保存的会话记录（JSON）
    #[frb(sync)]
    pub fn summary_json(&self) -> Result<String, PushupError> {
        let session = self.lock();
        SessionSummary {
            reps: session.counter.count(),
            final_stage: session.counter.stage(),
            frames_seen: session.frames_seen,
            frames_sampled: session.frames_seen,
            frames_with_pose: session.frames_with_pose,
            frames_dropped: 0,
            duration_ms: session.started.elapsed().as_millis() as u64,
        }
        .to_json()
    }

    fn lock(&self) -> MutexGuard<'_, CounterSession> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for PushupCounter {
    fn drop(&mut self) {
        info!("🗑️ PushupCounter: released");
    }
}
