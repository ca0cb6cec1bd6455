pub mod backoff;
pub mod registry;
pub mod turn;
pub mod uncertainty;

pub use registry::{InMemoryRunRegistry, ResponseSource, RunEntry, RunRegistry, RunState};
pub use turn::{NewThread, StartTurn, TurnHandle, TurnOrchestrator, TurnStatus};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::llm::GatewayError;

#[derive(Debug, Error)]
pub enum OrchestrationError {
    #[error("Validation Error: {0}")]
    Validation(String),
    #[error("Gateway Error: {0}")]
    Gateway(#[from] GatewayError),
    #[error("Database Error: {0}")]
    Database(String),
    #[error("Run not found")]
    NotFound,
}

/// Pet context a client attaches to a turn. Carried through the run registry
/// and serialized into the run instructions for the assistant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PetSnapshot {
    pub id: i64,
    #[serde(default, alias = "userId")]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type", alias = "pet_type")]
    pub pet_type: Option<String>,
    #[serde(default)]
    pub breed: Option<String>,
    #[serde(default)]
    pub disease: Option<String>,
    #[serde(default)]
    pub symptoms: Option<String>,
}
