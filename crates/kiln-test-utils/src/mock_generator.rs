// SPDX-FileCopyrightText: 2026 Kiln Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripted code generator for deterministic loop tests.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use kiln_core::{CodeGenerator, CodePrompt, KilnError};
use tokio::sync::Mutex;

/// A code generator that replays queued responses and records every prompt.
///
/// Once the queue is empty it keeps returning the last response, which is
/// how "a generator that never gets it right" is modelled.
pub struct ScriptedGenerator {
    responses: Arc<Mutex<VecDeque<String>>>,
    last: Arc<Mutex<Option<String>>>,
    prompts: Arc<Mutex<Vec<CodePrompt>>>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::with_responses(Vec::new())
    }

    pub fn with_responses(responses: Vec<String>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::from(responses))),
            last: Arc::new(Mutex::new(None)),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Add a response to the end of the queue.
    pub async fn add_response(&self, text: impl Into<String>) {
        self.responses.lock().await.push_back(text.into());
    }

    /// Every prompt received so far, in order.
    pub async fn prompts(&self) -> Vec<CodePrompt> {
        self.prompts.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.prompts.lock().await.len()
    }
}

impl Default for ScriptedGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CodeGenerator for ScriptedGenerator {
    async fn complete(&self, prompt: &CodePrompt) -> Result<String, KilnError> {
        self.prompts.lock().await.push(prompt.clone());
        let mut last = self.last.lock().await;
        if let Some(next) = self.responses.lock().await.pop_front() {
            *last = Some(next);
        }
        last.clone().ok_or_else(|| KilnError::Generation {
            message: "scripted generator has no responses".to_string(),
            source: None,
        })
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
