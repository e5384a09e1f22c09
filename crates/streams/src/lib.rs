//! Lazy, finite, non-restartable stream primitives used by every
//! producer/consumer pipeline in the runtime.

mod audio_byte_stream;
mod channel;
mod deferred;
mod identity;
mod injectable;
mod multi_input;

pub use audio_byte_stream::{AudioByteStream, AudioFrame};
pub use channel::StreamChannel;
pub use deferred::{DeferredError, DeferredReadableStream};
pub use identity::{IdentityTransform, Readable, StreamError, Writable};
pub use injectable::InjectableStream;
pub use multi_input::MultiInputStream;
