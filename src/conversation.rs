use crate::constants::APOLOGY_REPLY;
use crate::proxy::CompletionProxy;
use crate::types::*;
use async_trait::async_trait;

/// Anything that can answer a conversation with one assistant turn.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, turns: &[Turn]) -> Result<Turn>;
}

/// In-process backend: skips the HTTP hop and calls the proxy directly.
#[async_trait]
impl CompletionBackend for CompletionProxy {
    async fn complete(&self, turns: &[Turn]) -> Result<Turn> {
        let inbound: Vec<InboundTurn> = turns.iter().map(InboundTurn::from).collect();
        CompletionProxy::complete(self, &inbound).await
    }
}

/// Snapshot handed out by [`ConversationStore::begin`]: exactly the turns
/// that must go upstream for this cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCycle {
    pub turns: Vec<Turn>,
}

/// Client-held conversation state: an append-only turn list plus the busy
/// flag that keeps at most one cycle in flight.
#[derive(Debug, Default)]
pub struct ConversationStore {
    turns: Vec<Turn>,
    busy: bool,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Appends the user turn and marks the store busy. Returns `None` (and
    /// changes nothing) for blank text or while a cycle is already running.
    pub fn begin(&mut self, text: &str) -> Option<PendingCycle> {
        if self.busy {
            tracing::debug!("Submission ignored: cycle already in flight");
            return None;
        }
        if text.trim().is_empty() {
            return None;
        }

        self.turns.push(Turn::user(text));
        self.busy = true;
        tracing::info!(
            target: "flight_recorder",
            "[REQ] Messages: {} | Last Role: user",
            self.turns.len()
        );

        Some(PendingCycle {
            turns: self.turns.clone(),
        })
    }

    /// Closes the running cycle. Any failure becomes the fixed apology turn.
    pub fn finish(&mut self, outcome: Result<Turn>) {
        if !self.busy {
            tracing::warn!("finish() called with no cycle in flight, ignoring");
            return;
        }

        let turn = match outcome {
            Ok(turn) => Turn::assistant(turn.content()),
            Err(e) => {
                tracing::warn!("Completion failed, showing apology: {}", e.inner);
                Turn::assistant(APOLOGY_REPLY)
            }
        };
        self.turns.push(turn);
        self.busy = false;
    }

    /// Runs one full cycle: append, call the backend once, append the reply.
    /// Returns whether a cycle actually ran.
    pub async fn submit<B>(&mut self, text: &str, backend: &B) -> bool
    where
        B: CompletionBackend + ?Sized,
    {
        let pending = match self.begin(text) {
            Some(p) => p,
            None => return false,
        };
        let outcome = backend.complete(&pending.turns).await;
        self.finish(outcome);
        true
    }
}
