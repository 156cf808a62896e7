pub mod engine;
pub mod ffmpeg;
pub mod format;

pub use engine::{ConversionEngine, ConversionOutput, ConversionRequest, EngineError};
pub use ffmpeg::FfmpegEngine;
pub use format::Category;
