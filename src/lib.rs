pub mod config;
pub mod modifier;
pub mod pipeline;
pub mod playback;
pub mod stream;
pub mod video;

pub use config::{Components, WatermarkConfig};
pub use modifier::{CoefficientModifier, ModStep, ModType, ModificationSettings, ModifyError};
pub use pipeline::{compare_streams, watermark_file, ComparisonReport, WatermarkSummary};
pub use playback::{ComparisonPlayer, FramePair};
pub use stream::{StreamError, StreamReader, StreamWriter};
pub use video::plane::ChromaFormat;
