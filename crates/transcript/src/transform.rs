//! Text transform pipeline (§4.9): an ordered set of
//! `ReadableStream<String> -> ReadableStream<String>` functions applied to
//! TTS-bound text, built on the streaming primitives in `va_streams`.

use std::sync::Arc;

use regex::Regex;
use va_streams::{IdentityTransform, Readable};

/// A custom transform: consumes one readable text stream and produces
/// another. Built-ins and user-supplied transforms share this shape, so
/// they compose in a [`crate::pipeline::TransformPipeline`] uniformly.
pub type TextTransform = Arc<dyn Fn(Arc<Readable<String>>) -> Arc<Readable<String>> + Send + Sync>;

const CHANNEL_CAPACITY: usize = 64;

/// Buffers input chunks until `boundary` matches a completed span (a
/// sentence end, by convention), applies `map` to that span, and forwards
/// the result — so per-token regex transforms never split mid-token across
/// two separately-arriving chunks. Any unmatched tail is flushed through
/// `map` once the input stream ends.
pub fn buffered_regex_transform<F>(boundary: Regex, map: F) -> TextTransform
where
    F: Fn(&str) -> String + Send + Sync + 'static,
{
    let map = Arc::new(map);
    Arc::new(move |input: Arc<Readable<String>>| {
        let output = Arc::new(IdentityTransform::<String>::new(CHANNEL_CAPACITY));
        let writable = output.writable.clone();
        let readable = output.readable.clone();
        let boundary = boundary.clone();
        let map = map.clone();

        tokio::spawn(async move {
            let mut buf = String::new();
            loop {
                match input.next().await {
                    Ok(Some(chunk)) => {
                        buf.push_str(&chunk);
                        while !buf.is_empty() {
                            let Some(m) = boundary.find(&buf) else { break };
                            // A zero-length match (boundary never found, or a
                            // pattern like `.*` matching empty) would spin
                            // forever draining nothing.
                            if m.end() == 0 {
                                break;
                            }
                            let sentence: String = buf.drain(..m.end()).collect();
                            if writable.write(map(&sentence)).await.is_err() {
                                return;
                            }
                        }
                    }
                    Ok(None) => break,
                    Err(_) => {
                        writable.abort("upstream transform input aborted");
                        return;
                    }
                }
            }
            if !buf.is_empty() {
                let _ = writable.write(map(&buf)).await;
            }
            writable.close().await;
        });

        readable
    })
}

/// Wraps a transform that can be applied chunk-by-chunk with no buffering
/// (e.g. whitespace normalization) — a thin convenience over
/// [`buffered_regex_transform`] using a boundary that matches every chunk.
pub fn stateless_transform<F>(map: F) -> TextTransform
where
    F: Fn(&str) -> String + Send + Sync + 'static,
{
    // `.*` with DOTALL-equivalent semantics over the buffered chunk:
    // matches the whole buffer every time, so nothing is held back.
    let boundary = Regex::new(r"(?s)^.*$").expect("static pattern is valid");
    buffered_regex_transform(boundary, map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use va_streams::IdentityTransform as Channel;

    async fn drain(readable: Arc<Readable<String>>) -> String {
        let mut out = String::new();
        while let Ok(Some(chunk)) = readable.next().await {
            out.push_str(&chunk);
        }
        out
    }

    #[tokio::test]
    async fn buffers_until_sentence_boundary() {
        let boundary = Regex::new(r"[.!?]\s*").unwrap();
        let transform = buffered_regex_transform(boundary, |s| s.to_uppercase());
        let input = Arc::new(Channel::<String>::new(8));
        let out = transform(input.readable.clone());

        input.writable.write("Hello wor".into()).await.unwrap();
        input.writable.write("ld. Second".into()).await.unwrap();
        input.writable.write(" sentence.".into()).await.unwrap();
        input.writable.close().await;

        assert_eq!(drain(out).await, "HELLO WORLD. SECOND SENTENCE.");
    }

    #[tokio::test]
    async fn stateless_transform_applies_per_chunk() {
        let transform = stateless_transform(|s| s.trim().to_string());
        let input = Arc::new(Channel::<String>::new(8));
        let out = transform(input.readable.clone());

        input.writable.write("  padded  ".into()).await.unwrap();
        input.writable.close().await;

        assert_eq!(drain(out).await, "padded");
    }
}
