//! The browser-adapter port: an external collaborator out of scope for
//! this crate (CDP/DOM access lives on the other side of it), consulted
//! by [`super::driver::SecureInterpreter`] at every suspension point.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::model::{InterpreterError, Observation};

/// Which way a `scroll` action moves the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrollDirection {
    /// Scroll toward the top of the page.
    Up,
    /// Scroll toward the bottom of the page.
    Down,
}

/// The browser/page driver a [`super::driver::SecureInterpreter`] executes
/// a DAG against. Each method corresponds to one entry of the action
/// alphabet and returns the [`Observation`] that followed it.
///
/// Implementations are expected to honor cancellation by aborting
/// in-flight I/O when dropped; the interpreter itself never spawns
/// background work and suspends only at these calls.
#[async_trait]
pub trait BrowserAdapter: Send + Sync {
    /// Loads `url`.
    async fn navigate(&mut self, url: &str) -> Result<Observation, InterpreterError>;

    /// Clicks the element matching `selector`.
    async fn click(&mut self, selector: &str) -> Result<Observation, InterpreterError>;

    /// Types `text` into the element matching `selector`.
    async fn type_text(&mut self, selector: &str, text: &str) -> Result<Observation, InterpreterError>;

    /// Scrolls the viewport `direction`, optionally by `amount` pixels.
    async fn scroll(
        &mut self,
        direction: ScrollDirection,
        amount: Option<u32>,
    ) -> Result<Observation, InterpreterError>;

    /// Pulls structured data out of the elements matching `selectors`.
    async fn extract(&mut self, selectors: &[String]) -> Result<(Observation, Value), InterpreterError>;

    /// Captures a screenshot of the current viewport.
    async fn screenshot(&mut self) -> Result<(Observation, Vec<u8>), InterpreterError>;

    /// Waits `ms` milliseconds without otherwise acting.
    async fn wait(&mut self, ms: u64) -> Result<Observation, InterpreterError>;

    /// The current observation, without performing an action.
    async fn get_state(&self) -> Result<Observation, InterpreterError>;
}
