//! Composes an ordered sequence of [`TextTransform`]s into one.

use std::sync::Arc;

use va_streams::Readable;

use crate::transform::TextTransform;

#[derive(Clone, Default)]
pub struct TransformPipeline {
    transforms: Vec<TextTransform>,
}

impl TransformPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(mut self, transform: TextTransform) -> Self {
        self.transforms.push(transform);
        self
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    /// Runs `input` through every transform in order, returning the final
    /// stage's readable end.
    pub fn apply(&self, input: Arc<Readable<String>>) -> Arc<Readable<String>> {
        self.transforms.iter().fold(input, |acc, transform| transform(acc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::{markdown_strip_transform, newline_normalizer_transform};
    use va_streams::IdentityTransform;

    #[tokio::test]
    async fn chains_transforms_in_order() {
        let pipeline = TransformPipeline::new()
            .push(markdown_strip_transform())
            .push(newline_normalizer_transform());

        let input = Arc::new(IdentityTransform::<String>::new(8));
        let out = pipeline.apply(input.readable.clone());

        input.writable.write("**bold**\n\nnext".into()).await.unwrap();
        input.writable.close().await;

        let mut result = String::new();
        while let Ok(Some(chunk)) = out.next().await {
            result.push_str(&chunk);
        }
        assert_eq!(result, "bold next");
    }

    #[tokio::test]
    async fn empty_pipeline_passes_through_unchanged() {
        let pipeline = TransformPipeline::new();
        let input = Arc::new(IdentityTransform::<String>::new(8));
        let out = pipeline.apply(input.readable.clone());

        input.writable.write("unchanged".into()).await.unwrap();
        input.writable.close().await;

        assert_eq!(out.next().await.unwrap(), Some("unchanged".to_string()));
    }
}
