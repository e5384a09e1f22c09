//! Multi-provider fallback adapters (§4.5): one per provider kind, all
//! built on the same [`core::FallbackCore`] availability engine.

pub mod core;
mod llm;
mod stt;
mod tts;

pub use core::AvailabilityChanged;
pub use llm::FallbackLlm;
pub use stt::FallbackStt;
pub use tts::FallbackTts;
