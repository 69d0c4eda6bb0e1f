//! 采集线程：按目标帧率从设备读帧并发布到 [`FrameSlot`]

use super::device::{CaptureDevice, DeviceProvider};
use super::slot::FrameSlot;
use crate::core::error::PushupError;
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub target_fps: f32,
    /// 向设备请求的分辨率
    pub frame_width: u32,
    pub frame_height: u32,
    /// 该索引的设备输出做水平镜像
    pub front_device_index: u32,
    pub poll_interval_ms: u64,
    pub paused_poll_ms: u64,
    pub read_backoff_ms: u64,
    pub stop_timeout_ms: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            target_fps: 30.0,
            frame_width: 640,
            frame_height: 480,
            front_device_index: 1,
            poll_interval_ms: 10,
            paused_poll_ms: 100,
            read_backoff_ms: 100,
            stop_timeout_ms: 2000,
        }
    }
}

impl CaptureConfig {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_nanos((1e9 / self.target_fps as f64).round() as u64)
    }

    pub fn validate(&self) -> Result<(), PushupError> {
        if !self.target_fps.is_finite() || self.target_fps <= 0.0 {
            return Err(PushupError::Config(format!(
                "target_fps must be positive, got {}",
                self.target_fps
            )));
        }
        if self.frame_width == 0 || self.frame_height == 0 {
            return Err(PushupError::Config(format!(
                "frame size must be non-zero, got {}x{}",
                self.frame_width, self.frame_height
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraInfo {
    pub device_index: u32,
    pub is_front: bool,
    pub running: bool,
    pub paused: bool,
    pub target_fps: f32,
    pub frame_width: u32,
    pub frame_height: u32,
}

type SharedDevice = Arc<Mutex<Option<Box<dyn CaptureDevice>>>>;

struct Worker {
    handle: JoinHandle<()>,
    done_rx: mpsc::Receiver<()>,
    running: Arc<AtomicBool>,
    device: SharedDevice,
}

pub struct FrameSource {
    provider: Arc<dyn DeviceProvider>,
    config: CaptureConfig,
    slot: Arc<FrameSlot>,
    device_index: u32,
    paused: Arc<AtomicBool>,
    worker: Option<Worker>,
}

impl FrameSource {
    pub fn new(provider: Arc<dyn DeviceProvider>, config: CaptureConfig) -> Self {
        Self {
            provider,
            config,
            slot: Arc::new(FrameSlot::new()),
            device_index: 0,
            paused: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    pub fn with_device_index(mut self, index: u32) -> Self {
        self.device_index = index;
        self
    }

    /// 打开设备并启动采集线程，立即返回
    pub fn start(&mut self) -> Result<(), PushupError> {
        if self.is_running() {
            debug!("FrameSource: already running on device #{}", self.device_index);
            return Ok(());
        }
        // 上一轮因设备丢失退出的线程先回收
        if self.worker.is_some() {
            self.stop();
        }

        let index = self.device_index;
        let device = self.provider.open(index, &self.config).map_err(|e| {
            error!("❌ FrameSource: cannot open device #{}: {}", index, e);
            match e {
                PushupError::DeviceUnavailable { .. } => e,
                other => PushupError::DeviceUnavailable {
                    index,
                    reason: other.to_string(),
                },
            }
        })?;

        let device: SharedDevice = Arc::new(Mutex::new(Some(device)));
        let running = Arc::new(AtomicBool::new(true));
        self.paused.store(false, Ordering::SeqCst);
        let (done_tx, done_rx) = mpsc::channel();

        let capture = CaptureLoop {
            device: device.clone(),
            slot: self.slot.clone(),
            running: running.clone(),
            paused: self.paused.clone(),
            config: self.config.clone(),
            mirror: index == self.config.front_device_index,
            index,
        };

        let spawned = thread::Builder::new()
            .name("pushup-capture".into())
            .spawn(move || {
                capture.run();
                let _ = done_tx.send(());
            });

        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                running.store(false, Ordering::SeqCst);
                release_device(&device);
                return Err(PushupError::DeviceUnavailable {
                    index,
                    reason: format!("failed to spawn capture thread: {e}"),
                });
            }
        };

        self.worker = Some(Worker {
            handle,
            done_rx,
            running,
            device,
        });
        info!(
            "📷 FrameSource: capturing from device #{} at {} fps",
            index, self.config.target_fps
        );
        Ok(())
    }

    /// 通知采集线程退出，最多等待 `stop_timeout_ms`，然后释放设备。未启动时调用也安全
    pub fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        worker.running.store(false, Ordering::SeqCst);

        let timeout = Duration::from_millis(self.config.stop_timeout_ms);
        match worker.done_rx.recv_timeout(timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if worker.handle.join().is_err() {
                    error!("❌ FrameSource: capture thread panicked");
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    "⚠️ FrameSource: capture loop still busy after {:?}, detaching",
                    timeout
                );
            }
        }

        release_device(&worker.device);
        info!("🛑 FrameSource: stopped device #{}", self.device_index);
    }

    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
        info!("⏸️ FrameSource: paused");
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
        info!("▶️ FrameSource: resumed");
    }

    /// 前后摄像头切换。未运行时只修改下次 `start` 使用的索引，不触碰设备
    pub fn switch_device(&mut self) -> Result<(), PushupError> {
        let was_running = self.is_running();
        if was_running {
            self.stop();
        }

        self.device_index = if self.device_index == 0 { 1 } else { 0 };
        info!("🔁 FrameSource: switched to device #{}", self.device_index);

        if was_running {
            self.start()
        } else {
            Ok(())
        }
    }

    /// 修改采集参数，下次 `start` 生效
    pub fn set_config(&mut self, config: CaptureConfig) -> Result<(), PushupError> {
        config.validate()?;
        if self.is_running() {
            debug!("FrameSource: new capture config applies on next start");
        }
        self.config = config;
        Ok(())
    }

    pub fn set_fps(&mut self, fps: f32) -> Result<(), PushupError> {
        self.set_config(CaptureConfig {
            target_fps: fps,
            ..self.config.clone()
        })
    }

    pub fn set_resolution(&mut self, width: u32, height: u32) -> Result<(), PushupError> {
        self.set_config(CaptureConfig {
            frame_width: width,
            frame_height: height,
            ..self.config.clone()
        })
    }

    pub fn camera_info(&self) -> CameraInfo {
        CameraInfo {
            device_index: self.device_index,
            is_front: self.device_index == self.config.front_device_index,
            running: self.is_running(),
            paused: self.is_paused(),
            target_fps: self.config.target_fps,
            frame_width: self.config.frame_width,
            frame_height: self.config.frame_height,
        }
    }

    pub fn is_running(&self) -> bool {
        self.worker
            .as_ref()
            .map(|w| w.running.load(Ordering::SeqCst) && !w.handle.is_finished())
            .unwrap_or(false)
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub fn device_index(&self) -> u32 {
        self.device_index
    }

    pub fn slot(&self) -> Arc<FrameSlot> {
        self.slot.clone()
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }
}

impl Drop for FrameSource {
    fn drop(&mut self) {
        self.stop();
    }
}

struct CaptureLoop {
    device: SharedDevice,
    slot: Arc<FrameSlot>,
    running: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
    config: CaptureConfig,
    mirror: bool,
    index: u32,
}

impl CaptureLoop {
    fn run(self) {
        let frame_interval = self.config.frame_interval();
        let poll = Duration::from_millis(self.config.poll_interval_ms);
        let paused_poll = Duration::from_millis(self.config.paused_poll_ms);
        let backoff = Duration::from_millis(self.config.read_backoff_ms);

        let started = Instant::now();
        let mut last_read: Option<Instant> = None;
        let mut captured = 0u64;

        while self.running.load(Ordering::SeqCst) {
            if self.paused.load(Ordering::SeqCst) {
                thread::sleep(paused_poll);
                continue;
            }

            let now = Instant::now();
            if let Some(last) = last_read {
                if now.duration_since(last) < frame_interval {
                    thread::sleep(poll);
                    continue;
                }
            }

            let result = match lock_device(&self.device).as_mut() {
                Some(device) => {
                    match panic::catch_unwind(AssertUnwindSafe(|| device.read_frame())) {
                        Ok(result) => result,
                        Err(payload) => Err(PushupError::DeviceLost(format!(
                            "read_frame panicked: {}",
                            panic_message(payload.as_ref())
                        ))),
                    }
                }
                None => {
                    warn!("FrameSource: device #{} already released", self.index);
                    break;
                }
            };

            match result {
                Ok(mut frame) => {
                    captured += 1;
                    frame.frame_number = captured;
                    frame.timestamp = started.elapsed();

                    let frame = if self.mirror {
                        match frame.flip_horizontal() {
                            Ok(flipped) => flipped,
                            Err(e) => {
                                warn!("FrameSource: mirror failed on frame {}: {}", captured, e);
                                frame
                            }
                        }
                    } else {
                        frame
                    };

                    self.slot.publish(frame);
                    last_read = Some(now);
                }
                Err(PushupError::ReadFailed(reason)) => {
                    warn!("FrameSource: read failed on device #{}: {}", self.index, reason);
                    thread::sleep(backoff);
                }
                Err(e @ (PushupError::DeviceLost(_) | PushupError::DeviceUnavailable { .. })) => {
                    error!("❌ FrameSource: device #{} unusable: {}", self.index, e);
                    break;
                }
                Err(e) => {
                    warn!("FrameSource: unexpected error on device #{}: {}", self.index, e);
                    thread::sleep(backoff);
                }
            }
        }

        self.running.store(false, Ordering::SeqCst);
        if let Some(mut device) = lock_device(&self.device).take() {
            device.release();
        }
        info!("FrameSource: capture loop ended after {} frames", captured);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "unknown panic"
    }
}

fn lock_device(device: &SharedDevice) -> MutexGuard<'_, Option<Box<dyn CaptureDevice>>> {
    device.lock().unwrap_or_else(PoisonError::into_inner)
}

/// 采集线程仍占用设备时不等待，由线程退出时自行释放
fn release_device(device: &SharedDevice) {
    let mut guard = match device.try_lock() {
        Ok(guard) => guard,
        Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
        Err(TryLockError::WouldBlock) => {
            warn!("FrameSource: device busy, release deferred to capture thread");
            return;
        }
    };
    if let Some(mut device) = guard.take() {
        device.release();
    }
}
