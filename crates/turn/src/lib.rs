//! Turn detection & end-of-utterance modeling (§4.6): the EOU probability
//! contract dispatched through the sibling-process inference executor, and
//! the VAD stream contract consumed by the speech scheduler's interruption
//! gating.

pub mod eou;
pub mod vad;

pub use eou::{predict_end_of_turn, EouThresholds, DISABLED_SENTINEL};
pub use vad::{VadEvent, VadEventType, VadModel, VadStream, VadStreamHandle};
