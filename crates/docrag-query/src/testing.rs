//! Test doubles shared by the engine and validator tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use docrag_core::{ChatMessage, ChatModel, ChatOptions, RagError, Result};
use docrag_embed::HashEmbedder;
use docrag_store::{SqliteStore, VectorCollection};

/// Chat model replaying canned replies and recording every call.
pub struct ScriptedChat {
    replies: Mutex<VecDeque<String>>,
    calls: Mutex<Vec<(Vec<ChatMessage>, Option<f32>)>>,
    fail: bool,
}

impl ScriptedChat {
    pub fn new(replies: Vec<&str>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().map(String::from).collect()),
            calls: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(vec![])
        }
    }

    /// Messages of each call.
    pub fn calls(&self) -> Vec<Vec<ChatMessage>> {
        self.calls.lock().unwrap().iter().map(|(m, _)| m.clone()).collect()
    }

    /// Temperature of each call.
    pub fn temperatures(&self) -> Vec<Option<f32>> {
        self.calls.lock().unwrap().iter().map(|(_, t)| *t).collect()
    }

    /// Last message content of each call.
    pub fn prompts(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|m| m.last().map(|m| m.content.clone()))
            .collect()
    }
}

#[async_trait]
impl ChatModel for ScriptedChat {
    async fn complete(&self, messages: &[ChatMessage], options: &ChatOptions) -> Result<String> {
        self.calls
            .lock()
            .unwrap()
            .push((messages.to_vec(), options.temperature));
        if self.fail {
            return Err(RagError::llm("model unavailable"));
        }
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| RagError::llm("no scripted reply left"))
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

/// Empty collection over an in-memory store and the hashing embedder.
pub async fn collection() -> VectorCollection {
    let store = Arc::new(SqliteStore::open_memory().unwrap());
    VectorCollection::create(store, Arc::new(HashEmbedder::new()), "company_docs")
        .await
        .unwrap()
}
