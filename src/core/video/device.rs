//! 采集设备能力（由宿主平台实现）

use super::frame::Frame;
use super::source::CaptureConfig;
use crate::core::error::PushupError;

/// 已打开的采集设备
///
/// `read_frame` 返回 `ReadFailed` 表示瞬时失败（采集循环会退避重试），
/// 返回 `DeviceLost` 表示设备已不可用（采集循环结束）。
pub trait CaptureDevice: Send {
    fn read_frame(&mut self) -> Result<Frame, PushupError>;

    fn release(&mut self);
}

/// 按索引打开设备，0 为后置，1 为前置
pub trait DeviceProvider: Send + Sync {
    fn open(&self, index: u32, config: &CaptureConfig) -> Result<Box<dyn CaptureDevice>, PushupError>;
}
