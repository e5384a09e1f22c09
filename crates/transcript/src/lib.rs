//! Transcript synchronization and text transforms (§4.9): playback-aligned
//! transcript emission (`SpeakingRateData`) and the TTS-bound text-transform
//! pipeline.

pub mod builtins;
pub mod locale;
pub mod pipeline;
pub mod rate;
pub mod transform;

pub use pipeline::TransformPipeline;
pub use rate::SpeakingRateData;
pub use transform::{buffered_regex_transform, stateless_transform, TextTransform};
