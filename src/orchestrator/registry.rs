use dashmap::DashMap;
use std::time::Instant;
use uuid::Uuid;

use crate::orchestrator::PetSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    InProgress,
    Completed,
    Failed,
}

impl RunState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::InProgress => "in_progress",
            RunState::Completed => "completed",
            RunState::Failed => "failed",
        }
    }
}

/// Where the final answer came from: the assistant itself, or the web-search
/// fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    Assistant,
    Tavily,
}

impl ResponseSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseSource::Assistant => "assistant",
            ResponseSource::Tavily => "tavily",
        }
    }
}

/// Process-local record of one in-flight turn. Mutated only by the background
/// task that owns the run id; read by any status poll. Entries are a
/// scheduling aid, not a source of truth: the database keeps the durable
/// record.
#[derive(Clone)]
pub struct RunEntry {
    pub run_id: String,
    pub thread_id: String,
    pub state: RunState,
    pub pet: PetSnapshot,
    pub message: String,
    pub session_id: Option<Uuid>,
    pub started_at: Instant,
    pub attempts: u32,
    pub response: Option<String>,
    pub source: Option<ResponseSource>,
    pub error: Option<String>,
}

impl RunEntry {
    pub fn in_progress(
        run_id: String,
        thread_id: String,
        pet: PetSnapshot,
        message: String,
        session_id: Option<Uuid>,
    ) -> Self {
        Self {
            run_id,
            thread_id,
            state: RunState::InProgress,
            pet,
            message,
            session_id,
            started_at: Instant::now(),
            attempts: 0,
            response: None,
            source: None,
            error: None,
        }
    }
}

/// Injected registry seam: an in-memory map in production and tests today, a
/// shared store in a multi-instance deployment tomorrow. Entries are lost on
/// process restart; the status endpoint degrades to the gateway in that case.
pub trait RunRegistry: Send + Sync {
    fn put(&self, entry: RunEntry);
    fn get(&self, run_id: &str) -> Option<RunEntry>;
    fn remove(&self, run_id: &str) -> Option<RunEntry>;
}

#[derive(Default)]
pub struct InMemoryRunRegistry {
    entries: DashMap<String, RunEntry>,
}

impl InMemoryRunRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RunRegistry for InMemoryRunRegistry {
    fn put(&self, entry: RunEntry) {
        self.entries.insert(entry.run_id.clone(), entry);
    }

    fn get(&self, run_id: &str) -> Option<RunEntry> {
        self.entries.get(run_id).map(|e| e.clone())
    }

    fn remove(&self, run_id: &str) -> Option<RunEntry> {
        self.entries.remove(run_id).map(|(_, e)| e)
    }
}
