pub mod decoder;
pub mod device;
pub mod frame;
pub mod preprocess;
pub mod slot;
pub mod source;

pub use decoder::{FrameDecoder, ImageSequenceDecoder, MemoryDecoder};
pub use device::{CaptureDevice, DeviceProvider};
pub use frame::{Frame, FrameInfo};
pub use preprocess::{FramePreprocessor, PreprocessConfig, PreprocessStep, Prepared};
pub use slot::{FrameSlot, SlotFrame};
pub use source::{CameraInfo, CaptureConfig, FrameSource};
