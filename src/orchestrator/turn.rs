use std::sync::Arc;
use tokio::time::sleep;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::{ChatConfig, PollingConfig};
use crate::db::{service::DbService, DbPool};
use crate::llm::{models::RunStatus, AssistantGateway, GatewayError};
use crate::orchestrator::backoff::next_delay;
use crate::orchestrator::registry::{ResponseSource, RunEntry, RunRegistry, RunState};
use crate::orchestrator::uncertainty::is_uncertain;
use crate::orchestrator::{OrchestrationError, PetSnapshot};
use crate::search::{fallback, SearchProvider};

pub const TOPIC_LABELS: [&str; 8] = [
    "Symptoms",
    "Treatment",
    "Diet",
    "Emergency",
    "Behavior",
    "Prevention",
    "Medication",
    "General Care",
];

const DEFAULT_TOPIC: &str = "General Care";

const GENERIC_OPENER: &str = "Hello, I need help with my pet's health.";

/// Inputs for one chat turn.
pub struct StartTurn {
    pub thread_id: String,
    pub message: String,
    pub pet: PetSnapshot,
    /// Session to continue, usually relayed from a request header.
    pub session_hint: Option<Uuid>,
    pub user_agent: Option<String>,
}

#[derive(Debug)]
pub struct TurnHandle {
    pub run_id: String,
    pub status: &'static str,
}

#[derive(Debug, Clone)]
pub enum TurnStatus {
    InProgress { status: String },
    Completed { response: String, source: ResponseSource },
    Failed { error: String },
}

#[derive(Debug)]
pub struct NewThread {
    pub thread_id: String,
    pub needs_update: bool,
    pub initial_message: String,
}

/// Owns the lifecycle of chat turns: validates input, records conversation
/// state, launches assistant runs, and resolves them in the background while
/// clients poll.
#[derive(Clone)]
pub struct TurnOrchestrator {
    db: DbPool,
    gateway: Arc<dyn AssistantGateway>,
    search: Arc<dyn SearchProvider>,
    registry: Arc<dyn RunRegistry>,
    polling: PollingConfig,
    staleness: chrono::Duration,
}

impl TurnOrchestrator {
    pub fn new(
        db: DbPool,
        gateway: Arc<dyn AssistantGateway>,
        search: Arc<dyn SearchProvider>,
        registry: Arc<dyn RunRegistry>,
        polling: PollingConfig,
        chat: &ChatConfig,
    ) -> Self {
        Self {
            db,
            gateway,
            search,
            registry,
            polling,
            staleness: chrono::Duration::seconds(chat.health_update_threshold_secs as i64),
        }
    }

    /// True when the pet's health record is stale under the configured
    /// threshold.
    pub fn needs_update(&self, pet_id: i64) -> Result<bool, OrchestrationError> {
        let conn = self.db.lock().unwrap();
        DbService::pet_needs_update(&conn, pet_id, self.staleness)
            .map_err(|e| OrchestrationError::Database(e.to_string()))
    }

    /// Create a conversation thread and prime it with an opener: a health
    /// check-in when the pet's record has gone stale, a generic greeting
    /// otherwise.
    pub async fn open_thread(
        &self,
        pet_id: i64,
        pet_info: Option<&PetSnapshot>,
    ) -> Result<NewThread, OrchestrationError> {
        let needs_update = self.needs_update(pet_id)?;

        let thread_id = self.gateway.create_thread().await?;

        let initial_message = match pet_info {
            Some(pet) if needs_update => health_update_prompt(pet),
            _ => GENERIC_OPENER.to_string(),
        };

        self.gateway.add_message(&thread_id, &initial_message).await?;

        info!(
            "Thread {} opened for pet {} (needs_update: {})",
            thread_id, pet_id, needs_update
        );

        Ok(NewThread {
            thread_id,
            needs_update,
            initial_message,
        })
    }

    /// Start one chat turn: record the inbound message, launch the assistant
    /// run, and detach background resolution. Returns immediately with the
    /// run handle for the client to poll.
    pub async fn start_turn(&self, req: StartTurn) -> Result<TurnHandle, OrchestrationError> {
        if req.thread_id.trim().is_empty() {
            return Err(OrchestrationError::Validation("thread id is required".into()));
        }
        if req.message.trim().is_empty() {
            return Err(OrchestrationError::Validation(
                "message text is required".into(),
            ));
        }

        let device = device_class(req.user_agent.as_deref());
        let session_id = self.resolve_session(req.session_hint, req.pet.user_id, device);

        let inbound = {
            let conn = self.db.lock().unwrap();
            DbService::insert_message(
                &conn,
                req.pet.id,
                &req.thread_id,
                session_id,
                "user",
                &req.message,
                None,
                true,
                None,
            )
            .map_err(|e| OrchestrationError::Database(e.to_string()))?
        };

        let topic = self.classify_topic(&req.message).await;
        {
            let conn = self.db.lock().unwrap();
            if let Err(e) = DbService::insert_topic(&conn, inbound.id, &topic) {
                warn!("Failed to record topic for message {}: {}", inbound.id, e);
            }
            if let Err(e) = DbService::touch_pet(&conn, req.pet.id) {
                warn!("Failed to refresh last_updated for pet {}: {}", req.pet.id, e);
            }
        }

        self.gateway.add_message(&req.thread_id, &req.message).await?;

        let instructions = format!(
            "Consider this pet's information while responding: {}",
            serde_json::to_string(&req.pet).unwrap_or_default()
        );
        let run_id = self.gateway.create_run(&req.thread_id, &instructions).await?;

        self.registry.put(RunEntry::in_progress(
            run_id.clone(),
            req.thread_id.clone(),
            req.pet.clone(),
            req.message.clone(),
            session_id,
        ));

        let this = self.clone();
        let spawned_run = run_id.clone();
        tokio::spawn(async move { this.resolve_run(spawned_run).await });

        info!("Turn started: run {}", run_id);
        Ok(TurnHandle {
            run_id,
            status: "in_progress",
        })
    }

    /// Current state of a run. Terminal results are evicted from the registry
    /// once read. When the registry has no entry (process restarted), falls
    /// back to asking the gateway directly if the caller still knows the
    /// thread.
    pub async fn get_status(
        &self,
        run_id: &str,
        thread_id: Option<&str>,
    ) -> Result<TurnStatus, OrchestrationError> {
        if let Some(entry) = self.registry.get(run_id) {
            return Ok(match entry.state {
                RunState::InProgress => TurnStatus::InProgress {
                    status: "in_progress".to_string(),
                },
                RunState::Completed => {
                    self.registry.remove(run_id);
                    TurnStatus::Completed {
                        response: entry.response.unwrap_or_default(),
                        source: entry.source.unwrap_or(ResponseSource::Assistant),
                    }
                }
                RunState::Failed => {
                    self.registry.remove(run_id);
                    TurnStatus::Failed {
                        error: entry.error.unwrap_or_else(|| "Unknown error".to_string()),
                    }
                }
            });
        }

        let Some(thread_id) = thread_id else {
            return Err(OrchestrationError::NotFound);
        };

        match self.gateway.run_status(thread_id, run_id).await {
            Ok(RunStatus::Completed) => {
                let text = self.gateway.latest_message(thread_id).await.ok().flatten();
                Ok(match text {
                    Some(response) => TurnStatus::Completed {
                        response,
                        source: ResponseSource::Assistant,
                    },
                    None => TurnStatus::Failed {
                        error: "Run completed but no message is available".to_string(),
                    },
                })
            }
            Ok(RunStatus::Failed { error }) => Ok(TurnStatus::Failed { error }),
            Ok(RunStatus::Expired) => Ok(TurnStatus::Failed {
                error: "Run expired".to_string(),
            }),
            Ok(status) => Ok(TurnStatus::InProgress {
                status: status.as_str().to_string(),
            }),
            Err(GatewayError::Api(_)) => Err(OrchestrationError::NotFound),
            Err(e) => Err(OrchestrationError::Gateway(e)),
        }
    }

    fn resolve_session(
        &self,
        hint: Option<Uuid>,
        user_id: Option<i64>,
        device: &str,
    ) -> Option<Uuid> {
        if let Some(id) = hint {
            return Some(id);
        }
        let user_id = user_id?;

        let conn = self.db.lock().unwrap();
        match DbService::open_session(&conn, Some(user_id), device) {
            Ok(session) => Some(session.id),
            Err(e) => {
                // The turn still works without session tracking.
                warn!("Failed to open chat session: {}", e);
                None
            }
        }
    }

    async fn classify_topic(&self, message: &str) -> String {
        let system = format!(
            "Classify a pet owner's chat message into exactly one of these topics: {}. \
             Reply with the topic name only.",
            TOPIC_LABELS.join(", ")
        );

        match self.gateway.complete(&system, message, 0.0).await {
            Ok(reply) => {
                let reply = reply.trim();
                TOPIC_LABELS
                    .iter()
                    .find(|label| label.eq_ignore_ascii_case(reply))
                    .map(|label| label.to_string())
                    .unwrap_or_else(|| DEFAULT_TOPIC.to_string())
            }
            Err(e) => {
                warn!("Topic classification failed: {}", e);
                DEFAULT_TOPIC.to_string()
            }
        }
    }

    /// Poll the run to a terminal state. Runs detached from any client
    /// connection; nobody may ever read the result.
    async fn resolve_run(&self, run_id: String) {
        let Some(entry) = self.registry.get(&run_id) else {
            return;
        };
        let thread_id = entry.thread_id.clone();

        for attempt in 0..self.polling.max_attempts {
            match self.gateway.run_status(&thread_id, &run_id).await {
                Ok(RunStatus::Completed) => {
                    self.finish_run(&run_id).await;
                    return;
                }
                Ok(RunStatus::Failed { error }) => {
                    self.fail_run(&run_id, format!("Run failed: {}", error));
                    return;
                }
                Ok(RunStatus::Expired) => {
                    self.fail_run(&run_id, "Run expired".to_string());
                    return;
                }
                Ok(status) => {
                    info!(
                        "Run {} status (attempt {}/{}): {}",
                        run_id,
                        attempt + 1,
                        self.polling.max_attempts,
                        status.as_str()
                    );
                }
                Err(e) => {
                    // Transient poll failures consume the attempt budget but
                    // do not abort the loop.
                    warn!("Run {} status poll failed: {}", run_id, e);
                }
            }

            if let Some(mut entry) = self.registry.get(&run_id) {
                entry.attempts = attempt + 1;
                self.registry.put(entry);
            }

            sleep(next_delay(attempt, &self.polling)).await;
        }

        self.fail_run(
            &run_id,
            format!(
                "Assistant response timed out after {} attempts",
                self.polling.max_attempts
            ),
        );
    }

    async fn finish_run(&self, run_id: &str) {
        let Some(mut entry) = self.registry.get(run_id) else {
            return;
        };

        let raw = match self.gateway.latest_message(&entry.thread_id).await {
            Ok(Some(text)) if !text.trim().is_empty() => text,
            Ok(_) => {
                self.fail_run(run_id, "Run completed but produced no readable message".to_string());
                return;
            }
            Err(e) => {
                self.fail_run(run_id, format!("Failed to fetch assistant reply: {}", e));
                return;
            }
        };

        let understood = !is_uncertain(&raw);
        let mut final_text = raw;
        let mut source = ResponseSource::Assistant;

        if !understood {
            info!("Run {} response looks uncertain, engaging search fallback", run_id);
            if let Some(enriched) = fallback::enrich(
                self.gateway.as_ref(),
                self.search.as_ref(),
                &entry.message,
                &entry.pet,
            )
            .await
            {
                final_text = enriched;
                source = ResponseSource::Tavily;
            }
        }

        let latency_ms = entry.started_at.elapsed().as_millis() as i64;

        // Bookkeeping failures are logged, not surfaced; the client still
        // gets the answer through the registry below.
        {
            let conn = self.db.lock().unwrap();
            match DbService::insert_message(
                &conn,
                entry.pet.id,
                &entry.thread_id,
                entry.session_id,
                "assistant",
                &final_text,
                Some(latency_ms),
                understood,
                Some(source.as_str()),
            ) {
                Ok(_) => {
                    if let Some(sid) = entry.session_id {
                        if let Err(e) = DbService::bump_session_messages(&conn, sid, 2) {
                            warn!("Failed to update message count for session {}: {}", sid, e);
                        }
                    }
                }
                Err(e) => {
                    warn!("Failed to persist assistant message for run {}: {}", run_id, e)
                }
            }
        }

        entry.state = RunState::Completed;
        entry.response = Some(final_text);
        entry.source = Some(source);
        self.registry.put(entry);

        info!(
            "Run {} completed in {}ms (source: {})",
            run_id,
            latency_ms,
            source.as_str()
        );
    }

    fn fail_run(&self, run_id: &str, error: String) {
        error!("Run {} failed: {}", run_id, error);
        if let Some(mut entry) = self.registry.get(run_id) {
            entry.state = RunState::Failed;
            entry.error = Some(error);
            self.registry.put(entry);
        }
    }
}

fn device_class(user_agent: Option<&str>) -> &'static str {
    match user_agent {
        Some(ua) if ua.to_lowercase().contains("mobile") => "mobile",
        _ => "desktop",
    }
}

fn health_update_prompt(pet: &PetSnapshot) -> String {
    let name = pet.name.as_deref().unwrap_or("your pet");
    format!(
        "It's been a while since our last conversation about {}. \
         Could you please tell me how {} is doing now? \
         Have the symptoms ({}) improved? \
         Are there any new symptoms or changes in condition?",
        name,
        name,
        pet.symptoms.as_deref().unwrap_or("previously reported"),
    )
}
