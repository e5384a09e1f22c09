//! Chat context: the ordered sequence of turns exchanged with an LLM.
//!
//! Mirrors the provider-agnostic message model, generalized to the three
//! item kinds a tool-calling conversation needs: `message`, `function_call`,
//! and `function_call_output`.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    Developer,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ContentPart {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image")]
    Image {
        url: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        media_type: Option<String>,
    },
}

impl MessageContent {
    /// Join all text content. For `Text`, returns the string directly; for
    /// `Parts`, joins the `Text` parts with `"\n"` and skips images.
    pub fn extract_text(&self) -> String {
        match self {
            MessageContent::Text(t) => t.clone(),
            MessageContent::Parts(parts) => parts
                .iter()
                .filter_map(|p| match p {
                    ContentPart::Text { text } => Some(text.as_str()),
                    ContentPart::Image { .. } => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Stable id, assigned once and preserved across copies.
    pub id: String,
    pub role: Role,
    pub content: MessageContent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCall {
    pub id: String,
    pub call_id: String,
    pub name: String,
    /// JSON-encoded arguments, as emitted by the model.
    pub arguments: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCallOutput {
    pub id: String,
    pub call_id: String,
    pub name: String,
    pub output: String,
    #[serde(default)]
    pub is_error: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ChatItem {
    #[serde(rename = "message")]
    Message(ChatMessage),
    #[serde(rename = "function_call")]
    FunctionCall(FunctionCall),
    #[serde(rename = "function_call_output")]
    FunctionCallOutput(FunctionCallOutput),
}

impl ChatItem {
    pub fn id(&self) -> &str {
        match self {
            ChatItem::Message(m) => &m.id,
            ChatItem::FunctionCall(c) => &c.id,
            ChatItem::FunctionCallOutput(o) => &o.id,
        }
    }
}

/// An ordered, append-only sequence of chat items.
///
/// Insertion order is preserved across copies and serialization — every
/// provider adapter is expected to replay items in the order returned by
/// [`ChatContext::items`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatContext {
    items: Vec<ChatItem>,
}

impl ChatContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[ChatItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn append_message(&mut self, role: Role, content: MessageContent) -> &ChatMessage {
        let msg = ChatMessage {
            id: crate::ids::new_id(),
            role,
            content,
        };
        self.items.push(ChatItem::Message(msg));
        match self.items.last().unwrap() {
            ChatItem::Message(m) => m,
            _ => unreachable!(),
        }
    }

    pub fn append_function_call(&mut self, call_id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) {
        self.items.push(ChatItem::FunctionCall(FunctionCall {
            id: crate::ids::new_id(),
            call_id: call_id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }));
    }

    /// Append a function-call output. Returns an error if no prior
    /// `function_call` with the same `call_id` exists — every output must
    /// answer a call already in the context.
    pub fn append_function_call_output(
        &mut self,
        call_id: impl Into<String>,
        name: impl Into<String>,
        output: impl Into<String>,
        is_error: bool,
    ) -> Result<()> {
        let call_id = call_id.into();
        let has_call = self.items.iter().any(|it| {
            matches!(it, ChatItem::FunctionCall(c) if c.call_id == call_id)
        });
        if !has_call {
            return Err(Error::ChatContext(format!(
                "function_call_output for unknown call_id '{call_id}'"
            )));
        }
        self.items.push(ChatItem::FunctionCallOutput(FunctionCallOutput {
            id: crate::ids::new_id(),
            call_id,
            name: name.into(),
            output: output.into(),
            is_error,
        }));
        Ok(())
    }

    /// Deep, value-equal copy. Appending to the copy never mutates `self`.
    pub fn copy(&self) -> Self {
        Self {
            items: self.items.clone(),
        }
    }

    /// Number of `function_call` items with no matching `function_call_output`.
    pub fn pending_tool_calls(&self) -> usize {
        let mut calls = std::collections::HashSet::new();
        let mut outputs = std::collections::HashSet::new();
        for it in &self.items {
            match it {
                ChatItem::FunctionCall(c) => {
                    calls.insert(c.call_id.clone());
                }
                ChatItem::FunctionCallOutput(o) => {
                    outputs.insert(o.call_id.clone());
                }
                ChatItem::Message(_) => {}
            }
        }
        calls.difference(&outputs).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_is_deep_and_independent() {
        let mut ctx = ChatContext::new();
        ctx.append_message(Role::User, MessageContent::Text("hi".into()));
        let copy = ctx.copy();
        ctx.append_message(Role::Assistant, MessageContent::Text("hello".into()));
        assert_eq!(copy.len(), 1);
        assert_eq!(ctx.len(), 2);
    }

    #[test]
    fn function_call_output_requires_matching_call() {
        let mut ctx = ChatContext::new();
        let err = ctx.append_function_call_output("missing", "f", "out", false);
        assert!(err.is_err());
    }

    #[test]
    fn function_call_output_succeeds_after_call() {
        let mut ctx = ChatContext::new();
        ctx.append_function_call("c1", "getWeather", "{}");
        ctx.append_function_call_output("c1", "getWeather", "sunny", false)
            .unwrap();
        assert_eq!(ctx.pending_tool_calls(), 0);
    }

    #[test]
    fn insertion_order_preserved() {
        let mut ctx = ChatContext::new();
        ctx.append_message(Role::System, MessageContent::Text("sys".into()));
        ctx.append_message(Role::User, MessageContent::Text("usr".into()));
        ctx.append_function_call("c1", "getTime", "{}");
        ctx.append_function_call_output("c1", "getTime", "noon", false)
            .unwrap();
        let kinds: Vec<&str> = ctx
            .items()
            .iter()
            .map(|it| match it {
                ChatItem::Message(_) => "message",
                ChatItem::FunctionCall(_) => "function_call",
                ChatItem::FunctionCallOutput(_) => "function_call_output",
            })
            .collect();
        assert_eq!(
            kinds,
            vec!["message", "message", "function_call", "function_call_output"]
        );
    }
}
