//! Child-side inference dispatcher (§4.3): a name → runner map, loaded once
//! at process startup. `InferenceRequest{method, requestId, data}` is
//! resolved by name; unknown methods log a warning and reply with an error
//! rather than crashing the child.

use std::collections::HashMap;

#[async_trait::async_trait]
pub trait InferenceRunner: Send + Sync {
    async fn run(&self, data: serde_json::Value) -> Result<serde_json::Value, String>;
}

#[derive(Default)]
pub struct InferenceExecutor {
    runners: HashMap<String, Box<dyn InferenceRunner>>,
}

impl InferenceExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, method: impl Into<String>, runner: Box<dyn InferenceRunner>) {
        self.runners.insert(method.into(), runner);
    }

    pub async fn dispatch(&self, method: &str, data: serde_json::Value) -> Result<serde_json::Value, String> {
        match self.runners.get(method) {
            Some(runner) => runner.run(data).await,
            None => {
                tracing::warn!(method, "unknown inference method");
                Err(format!("unknown inference method: {method}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    #[async_trait::async_trait]
    impl InferenceRunner for Echo {
        async fn run(&self, data: serde_json::Value) -> Result<serde_json::Value, String> {
            Ok(data)
        }
    }

    struct AlwaysFails;

    #[async_trait::async_trait]
    impl InferenceRunner for AlwaysFails {
        async fn run(&self, _data: serde_json::Value) -> Result<serde_json::Value, String> {
            Err("boom".into())
        }
    }

    #[tokio::test]
    async fn dispatches_to_registered_runner() {
        let mut exec = InferenceExecutor::new();
        exec.register("echo", Box::new(Echo));
        let result = exec.dispatch("echo", serde_json::json!({"x": 1})).await;
        assert_eq!(result.unwrap(), serde_json::json!({"x": 1}));
    }

    #[tokio::test]
    async fn unknown_method_is_an_error_not_a_panic() {
        let exec = InferenceExecutor::new();
        let result = exec.dispatch("missing", serde_json::Value::Null).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn runner_error_propagates() {
        let mut exec = InferenceExecutor::new();
        exec.register("fails", Box::new(AlwaysFails));
        let result = exec.dispatch("fails", serde_json::Value::Null).await;
        assert_eq!(result.unwrap_err(), "boom");
    }
}
