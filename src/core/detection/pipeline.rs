use crate::core::config::DetectorConfig;
use crate::core::detection::session::{SessionCounters, SessionSummary};
use crate::core::pose::estimator::PoseEstimator;
use crate::core::pose::rep_counter::{RepCounter, RepCounterState, Stage};
use crate::core::video::decoder::FrameDecoder;
use crate::core::video::frame::Frame;
use crate::core::video::preprocess::FramePreprocessor;
use crate::core::video::slot::FrameSlot;
use log::{debug, error, info};
use std::time::Instant;

/// 每个检测帧产生一条结果，角度在未检测到人体时为 0
#[derive(Debug, Clone)]
pub struct DetectionEvent {
    pub frame: Frame,
    pub frame_number: u64,
    pub count: u64,
    pub stage: Stage,
    pub arm_angle: f32,
    pub leg_angle: f32,
    pub pose_detected: bool,
}

#[derive(Debug, Clone)]
pub enum FrameOutcome {
    Analyzed(DetectionEvent),
    /// 本帧未检测，原样交给显示
    PassThrough(Frame),
}

impl FrameOutcome {
    pub fn frame(&self) -> &Frame {
        match self {
            FrameOutcome::Analyzed(event) => &event.frame,
            FrameOutcome::PassThrough(frame) => frame,
        }
    }

    pub fn is_analyzed(&self) -> bool {
        matches!(self, FrameOutcome::Analyzed(_))
    }
}

#[derive(Debug, Clone)]
pub enum PlaybackTick {
    Frame(FrameOutcome),
    Finished(SessionSummary),
}

type Consumer = Box<dyn FnMut(&DetectionEvent) + Send>;

/// 帧生产者与检测栈之间的桥：抽样 → 预处理 → 姿态估计 → 角度 → 计数
pub struct DetectionPipeline {
    preprocessor: FramePreprocessor,
    estimator: Box<dyn PoseEstimator>,
    counter: RepCounter,
    process_interval: u32,
    frame_counter: u64,
    counters: SessionCounters,
    session_started: Instant,
    last_seq: Option<u64>,
    consumer: Option<Consumer>,
}

impl DetectionPipeline {
    pub fn new(estimator: Box<dyn PoseEstimator>) -> Self {
        Self::with_config(&DetectorConfig::default(), estimator)
    }

    pub fn with_config(config: &DetectorConfig, estimator: Box<dyn PoseEstimator>) -> Self {
        Self {
            preprocessor: FramePreprocessor::with_config(config.preprocess.clone()),
            estimator,
            counter: RepCounter::with_thresholds(config.thresholds, config.side),
            process_interval: config.process_interval.max(1),
            frame_counter: 0,
            counters: SessionCounters::default(),
            session_started: Instant::now(),
            last_seq: None,
            consumer: None,
        }
    }

    pub fn set_consumer<F>(&mut self, consumer: F)
    where
        F: FnMut(&DetectionEvent) + Send + 'static,
    {
        self.consumer = Some(Box::new(consumer));
    }

    pub fn clear_consumer(&mut self) {
        self.consumer = None;
    }

    /// 新会话：计数、帧计数、统计全部清零
    pub fn begin_session(&mut self) {
        self.counter.reset();
        self.frame_counter = 0;
        self.counters = SessionCounters::default();
        self.session_started = Instant::now();
        self.last_seq = None;
        debug!("DetectionPipeline: new session, interval {}", self.process_interval);
    }

    pub fn process_frame(&mut self, frame: Frame) -> FrameOutcome {
        self.frame_counter += 1;
        self.counters.frames_seen += 1;

        if self.frame_counter % self.process_interval as u64 != 0 {
            return FrameOutcome::PassThrough(frame);
        }
        self.counters.frames_sampled += 1;

        let prepared = self.preprocessor.prepare(frame);
        let joints = self.estimator.estimate(&prepared.frame);
        let snapshot = self.counter.observe(joints.as_ref());

        let pose_detected = snapshot.angles.is_some();
        if pose_detected {
            self.counters.frames_with_pose += 1;
        }
        self.counters.reps = snapshot.count;

        let angles = snapshot.angles.unwrap_or_default();
        let event = DetectionEvent {
            frame_number: prepared.frame.frame_number,
            frame: prepared.frame,
            count: snapshot.count,
            stage: snapshot.stage,
            arm_angle: angles.arm,
            leg_angle: angles.leg,
            pose_detected,
        };

        if let Some(consumer) = self.consumer.as_mut() {
            consumer(&event);
        }
        FrameOutcome::Analyzed(event)
    }

    /// 定时器回调入口：取邮箱中最新帧处理，没有新帧时返回 None，从不阻塞
    pub fn poll_slot(&mut self, slot: &FrameSlot) -> Option<FrameOutcome> {
        let latest = slot.take()?;
        if let Some(prev) = self.last_seq {
            self.counters.frames_dropped += latest.seq.saturating_sub(prev + 1);
        }
        self.last_seq = Some(latest.seq);
        Some(self.process_frame(latest.frame))
    }

    /// 视频回放：每次调用解码一帧，流结束（或解码出错）时返回汇总
    pub fn tick_decoder(&mut self, decoder: &mut dyn FrameDecoder) -> PlaybackTick {
        match decoder.next_frame() {
            Ok(Some(frame)) => PlaybackTick::Frame(self.process_frame(frame)),
            Ok(None) => {
                info!("🏁 DetectionPipeline: end of stream, {} reps", self.counter.count());
                PlaybackTick::Finished(self.summary())
            }
            Err(e) => {
                error!("❌ DetectionPipeline: decode failed, stopping playback: {}", e);
                PlaybackTick::Finished(self.summary())
            }
        }
    }

    pub fn run_decoder(&mut self, decoder: &mut dyn FrameDecoder) -> SessionSummary {
        loop {
            if let PlaybackTick::Finished(summary) = self.tick_decoder(decoder) {
                return summary;
            }
        }
    }

    pub fn reset_counter(&mut self) {
        self.counter.reset();
        self.counters.reps = 0;
    }

    pub fn snapshot(&self) -> RepCounterState {
        self.counter.state()
    }

    pub fn counters(&self) -> SessionCounters {
        self.counters
    }

    pub fn process_interval(&self) -> u32 {
        self.process_interval
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            reps: self.counter.count(),
            final_stage: self.counter.stage(),
            frames_seen: self.counters.frames_seen,
            frames_sampled: self.counters.frames_sampled,
            frames_with_pose: self.counters.frames_with_pose,
            frames_dropped: self.counters.frames_dropped,
            duration_ms: self.session_started.elapsed().as_millis() as u64,
        }
    }
}
