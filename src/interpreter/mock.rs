//! A scriptable fake [`BrowserAdapter`] for interpreter and end-to-end
//! tests: observations and extraction results are supplied in advance and
//! handed back in call order.

use std::collections::VecDeque;

use async_trait::async_trait;
use serde_json::Value;

use super::adapter::{BrowserAdapter, ScrollDirection};
use super::model::{InterpreterError, Observation};

/// A fake browser driven by a queue of canned responses rather than a
/// real page.
#[derive(Default)]
pub struct MockBrowserAdapter {
    observations: VecDeque<Observation>,
    extract_results: VecDeque<Value>,
    /// Every call made, in order, as a short description — inspected by
    /// tests asserting on dispatch behavior.
    calls: Vec<String>,
}

impl MockBrowserAdapter {
    /// Builds an adapter with empty queues.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues an observation to be returned by the next call that
    /// produces one.
    pub fn queue_observation(&mut self, observation: Observation) -> &mut Self {
        self.observations.push_back(observation);
        self
    }

    /// Queues a value to be returned by the next `extract` call.
    pub fn queue_extraction(&mut self, value: Value) -> &mut Self {
        self.extract_results.push_back(value);
        self
    }

    /// The calls made so far, in order.
    #[must_use]
    pub fn calls(&self) -> &[String] {
        &self.calls
    }

    fn next_observation(&mut self, fallback_url: &str) -> Observation {
        self.observations
            .pop_front()
            .unwrap_or_else(|| Observation::bare(fallback_url))
    }
}

#[async_trait]
impl BrowserAdapter for MockBrowserAdapter {
    async fn navigate(&mut self, url: &str) -> Result<Observation, InterpreterError> {
        self.calls.push(format!("navigate {url}"));
        Ok(self.next_observation(url))
    }

    async fn click(&mut self, selector: &str) -> Result<Observation, InterpreterError> {
        self.calls.push(format!("click {selector}"));
        Ok(self.next_observation("about:blank"))
    }

    async fn type_text(&mut self, selector: &str, text: &str) -> Result<Observation, InterpreterError> {
        self.calls.push(format!("type {selector} {text}"));
        Ok(self.next_observation("about:blank"))
    }

    async fn scroll(
        &mut self,
        direction: ScrollDirection,
        amount: Option<u32>,
    ) -> Result<Observation, InterpreterError> {
        self.calls.push(format!("scroll {direction:?} {amount:?}"));
        Ok(self.next_observation("about:blank"))
    }

    async fn extract(&mut self, selectors: &[String]) -> Result<(Observation, Value), InterpreterError> {
        self.calls.push(format!("extract {selectors:?}"));
        let observation = self.next_observation("about:blank");
        let value = self.extract_results.pop_front().unwrap_or(Value::Null);
        Ok((observation, value))
    }

    async fn screenshot(&mut self) -> Result<(Observation, Vec<u8>), InterpreterError> {
        self.calls.push("screenshot".to_string());
        Ok((self.next_observation("about:blank"), Vec::new()))
    }

    async fn wait(&mut self, ms: u64) -> Result<Observation, InterpreterError> {
        self.calls.push(format!("wait {ms}"));
        Ok(self.next_observation("about:blank"))
    }

    async fn get_state(&self) -> Result<Observation, InterpreterError> {
        Ok(Observation::bare("about:blank"))
    }
}
