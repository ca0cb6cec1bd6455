#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use pawdoc::config::{ChatConfig, DatabaseConfig, PollingConfig};
    use pawdoc::db::connection;
    use pawdoc::db::service::DbService;
    use pawdoc::db::DbPool;
    use pawdoc::llm::{models::RunStatus, AssistantGateway, GatewayError};
    use pawdoc::orchestrator::{
        InMemoryRunRegistry, OrchestrationError, PetSnapshot, ResponseSource, StartTurn,
        TurnOrchestrator, TurnStatus,
    };
    use pawdoc::search::{SearchError, SearchProvider, SearchResult};

    /// Scripted gateway: pops one status per poll, then repeats the default.
    struct StubGateway {
        statuses: Mutex<VecDeque<RunStatus>>,
        default_status: RunStatus,
        reply: Option<String>,
        summary: String,
    }

    impl StubGateway {
        fn completing(reply: &str) -> Self {
            Self {
                statuses: Mutex::new(VecDeque::from(vec![RunStatus::InProgress])),
                default_status: RunStatus::Completed,
                reply: Some(reply.to_string()),
                summary: "Arthritis in dogs responds well to weight management and \
                          veterinarian-guided anti-inflammatory treatment."
                    .to_string(),
            }
        }

        fn never_completing() -> Self {
            Self {
                statuses: Mutex::new(VecDeque::new()),
                default_status: RunStatus::InProgress,
                reply: None,
                summary: String::new(),
            }
        }

        fn failing(error: &str) -> Self {
            Self {
                statuses: Mutex::new(VecDeque::new()),
                default_status: RunStatus::Failed {
                    error: error.to_string(),
                },
                reply: None,
                summary: String::new(),
            }
        }
    }

    #[async_trait]
    impl AssistantGateway for StubGateway {
        fn name(&self) -> &str {
            "stub"
        }

        async fn create_thread(&self) -> Result<String, GatewayError> {
            Ok("thread-stub".to_string())
        }

        async fn add_message(&self, _thread_id: &str, _content: &str) -> Result<(), GatewayError> {
            Ok(())
        }

        async fn create_run(
            &self,
            _thread_id: &str,
            _instructions: &str,
        ) -> Result<String, GatewayError> {
            Ok("run-stub".to_string())
        }

        async fn run_status(
            &self,
            _thread_id: &str,
            _run_id: &str,
        ) -> Result<RunStatus, GatewayError> {
            let mut queue = self.statuses.lock().unwrap();
            Ok(queue.pop_front().unwrap_or(self.default_status.clone()))
        }

        async fn latest_message(&self, _thread_id: &str) -> Result<Option<String>, GatewayError> {
            Ok(self.reply.clone())
        }

        async fn complete(
            &self,
            system_prompt: &str,
            _user_content: &str,
            _temperature: f32,
        ) -> Result<String, GatewayError> {
            if system_prompt.starts_with("Classify") {
                Ok("Symptoms".to_string())
            } else {
                Ok(self.summary.clone())
            }
        }
    }

    struct StubSearch {
        results: Vec<SearchResult>,
        fail: bool,
    }

    impl StubSearch {
        fn with_one_result() -> Self {
            Self {
                results: vec![SearchResult {
                    title: "Canine Arthritis Management".to_string(),
                    url: "https://petmd.com/dog/arthritis".to_string(),
                    content: "Weight control and anti-inflammatory medication help arthritic dogs."
                        .to_string(),
                }],
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                results: vec![],
                fail: true,
            }
        }
    }

    #[async_trait]
    impl SearchProvider for StubSearch {
        async fn search(
            &self,
            _query: &str,
            _include_domains: &[&str],
            _exclude_domains: &[&str],
        ) -> Result<Vec<SearchResult>, SearchError> {
            if self.fail {
                Err(SearchError::Network("stub offline".to_string()))
            } else {
                Ok(self.results.clone())
            }
        }
    }

    fn fast_polling(max_attempts: u32) -> PollingConfig {
        PollingConfig {
            max_attempts,
            base_delay_ms: 1,
            backoff_factor: 1.5,
            max_delay_ms: 5,
        }
    }

    fn build(
        gateway: StubGateway,
        search: StubSearch,
        max_attempts: u32,
    ) -> (TurnOrchestrator, DbPool) {
        let pool = connection::get_connection(&DatabaseConfig {
            path: ":memory:".to_string(),
        })
        .unwrap();

        let orchestrator = TurnOrchestrator::new(
            pool.clone(),
            Arc::new(gateway),
            Arc::new(search),
            Arc::new(InMemoryRunRegistry::new()),
            fast_polling(max_attempts),
            &ChatConfig::default(),
        );
        (orchestrator, pool)
    }

    fn limping_dog() -> PetSnapshot {
        PetSnapshot {
            id: 7,
            user_id: None,
            name: Some("Rex".to_string()),
            pet_type: Some("Dog".to_string()),
            breed: Some("Labrador".to_string()),
            disease: Some("arthritis".to_string()),
            symptoms: Some("limping".to_string()),
        }
    }

    fn turn(pet: PetSnapshot) -> StartTurn {
        StartTurn {
            thread_id: "t1".to_string(),
            message: "My dog is limping".to_string(),
            pet,
            session_hint: None,
            user_agent: None,
        }
    }

    async fn await_terminal(orchestrator: &TurnOrchestrator, run_id: &str) -> TurnStatus {
        for _ in 0..200 {
            match orchestrator.get_status(run_id, None).await {
                Ok(TurnStatus::InProgress { .. }) => {
                    tokio::time::sleep(Duration::from_millis(2)).await
                }
                Ok(status) => return status,
                Err(e) => panic!("unexpected status error: {:?}", e),
            }
        }
        panic!("run never reached a terminal state");
    }

    #[tokio::test]
    async fn test_confident_answer_keeps_assistant_source() {
        let raw = "Arthritis can be managed with anti-inflammatory medication and weight control";
        let (orchestrator, pool) = build(
            StubGateway::completing(raw),
            StubSearch::with_one_result(),
            10,
        );

        let handle = orchestrator.start_turn(turn(limping_dog())).await.unwrap();
        assert_eq!(handle.status, "in_progress");

        match await_terminal(&orchestrator, &handle.run_id).await {
            TurnStatus::Completed { response, source } => {
                assert_eq!(response, raw);
                assert_eq!(source, ResponseSource::Assistant);
            }
            other => panic!("expected completion, got {:?}", other),
        }

        let conn = pool.lock().unwrap();
        let history = DbService::chat_history(&conn, 7).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, "user");
        assert_eq!(history[0].message, "My dog is limping");
        assert_eq!(history[1].role, "assistant");
        assert_eq!(history[1].message, raw);
        assert_eq!(history[1].source.as_deref(), Some("assistant"));
        assert!(history[1].is_understood);
        assert!(history[1].response_time_ms.is_some());

        // The inbound message was classified
        let topics = DbService::topic_counts(&conn).unwrap();
        assert_eq!(topics[0].label, "Symptoms");
        assert_eq!(topics[0].count, 1);
    }

    #[tokio::test]
    async fn test_uncertain_answer_is_replaced_by_search_fallback() {
        let raw = "I'm not sure, please consult a veterinarian";
        let (orchestrator, pool) = build(
            StubGateway::completing(raw),
            StubSearch::with_one_result(),
            10,
        );

        let handle = orchestrator.start_turn(turn(limping_dog())).await.unwrap();

        match await_terminal(&orchestrator, &handle.run_id).await {
            TurnStatus::Completed { response, source } => {
                assert_eq!(source, ResponseSource::Tavily);
                assert!(response.contains("Arthritis in dogs responds well"));
                assert!(response.contains("Sources consulted:"));
                assert!(response.contains("https://petmd.com/dog/arthritis"));
            }
            other => panic!("expected completion, got {:?}", other),
        }

        let conn = pool.lock().unwrap();
        let history = DbService::chat_history(&conn, 7).unwrap();
        assert_eq!(history[1].source.as_deref(), Some("tavily"));
        assert!(!history[1].is_understood);
    }

    #[tokio::test]
    async fn test_failing_search_fallback_never_fails_the_turn() {
        let raw = "I'm not sure what is wrong with your dog";
        let (orchestrator, pool) =
            build(StubGateway::completing(raw), StubSearch::failing(), 10);

        let handle = orchestrator.start_turn(turn(limping_dog())).await.unwrap();

        match await_terminal(&orchestrator, &handle.run_id).await {
            TurnStatus::Completed { response, source } => {
                assert_eq!(response, raw);
                assert_eq!(source, ResponseSource::Assistant);
            }
            other => panic!("expected completion, got {:?}", other),
        }

        let conn = pool.lock().unwrap();
        let history = DbService::chat_history(&conn, 7).unwrap();
        assert_eq!(history[1].source.as_deref(), Some("assistant"));
        assert!(!history[1].is_understood);
    }

    #[tokio::test]
    async fn test_run_times_out_after_attempt_budget() {
        let (orchestrator, _pool) = build(
            StubGateway::never_completing(),
            StubSearch::with_one_result(),
            3,
        );

        let handle = orchestrator.start_turn(turn(limping_dog())).await.unwrap();

        match await_terminal(&orchestrator, &handle.run_id).await {
            TurnStatus::Failed { error } => {
                assert!(error.contains("timed out"), "unexpected error: {}", error);
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_gateway_failure_surfaces_error_detail() {
        let (orchestrator, _pool) = build(
            StubGateway::failing("model exploded"),
            StubSearch::with_one_result(),
            10,
        );

        let handle = orchestrator.start_turn(turn(limping_dog())).await.unwrap();

        match await_terminal(&orchestrator, &handle.run_id).await {
            TurnStatus::Failed { error } => {
                assert!(error.contains("model exploded"), "unexpected error: {}", error);
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_validation_rejects_blank_input() {
        let (orchestrator, _pool) = build(
            StubGateway::completing("fine"),
            StubSearch::with_one_result(),
            10,
        );

        let mut blank_message = turn(limping_dog());
        blank_message.message = "   ".to_string();
        assert!(matches!(
            orchestrator.start_turn(blank_message).await,
            Err(OrchestrationError::Validation(_))
        ));

        let mut blank_thread = turn(limping_dog());
        blank_thread.thread_id = String::new();
        assert!(matches!(
            orchestrator.start_turn(blank_thread).await,
            Err(OrchestrationError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_session_counter_counts_two_per_turn() {
        let raw = "Keep your dog's weight down and exercise gently";
        let (orchestrator, pool) = build(
            StubGateway::completing(raw),
            StubSearch::with_one_result(),
            10,
        );

        let mut pet = limping_dog();
        pet.user_id = Some(42);

        // First turn opens a session lazily (mobile client)
        let mut first = turn(pet.clone());
        first.user_agent =
            Some("Mozilla/5.0 (iPhone; CPU iPhone OS 17_0) Mobile/15E148".to_string());
        let handle = orchestrator.start_turn(first).await.unwrap();
        await_terminal(&orchestrator, &handle.run_id).await;

        let session = {
            let conn = pool.lock().unwrap();
            let sessions = DbService::list_sessions(&conn, 10).unwrap();
            assert_eq!(sessions.len(), 1);
            assert_eq!(sessions[0].device_type.as_deref(), Some("mobile"));
            assert_eq!(sessions[0].messages_count, 2);
            sessions[0].clone()
        };

        // Second turn continues the same session via the hint
        let mut second = turn(pet);
        second.session_hint = Some(session.id);
        let handle = orchestrator.start_turn(second).await.unwrap();
        await_terminal(&orchestrator, &handle.run_id).await;

        let conn = pool.lock().unwrap();
        let sessions = DbService::list_sessions(&conn, 10).unwrap();
        assert_eq!(sessions.len(), 1, "the hint must not open a second session");
        assert_eq!(sessions[0].messages_count, 4);
    }

    #[tokio::test]
    async fn test_status_of_unknown_run_is_not_found() {
        let (orchestrator, _pool) = build(
            StubGateway::completing("fine"),
            StubSearch::with_one_result(),
            10,
        );

        assert!(matches!(
            orchestrator.get_status("no-such-run", None).await,
            Err(OrchestrationError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_status_falls_back_to_gateway_after_registry_loss() {
        // Fresh orchestrator: the registry has never seen this run, as after
        // a process restart.
        let gateway = StubGateway {
            statuses: Mutex::new(VecDeque::new()),
            default_status: RunStatus::Completed,
            reply: Some("Your dog likely has mild arthritis".to_string()),
            summary: String::new(),
        };
        let (orchestrator, _pool) = build(gateway, StubSearch::with_one_result(), 10);

        match orchestrator
            .get_status("orphaned-run", Some("t1"))
            .await
            .unwrap()
        {
            TurnStatus::Completed { response, source } => {
                assert_eq!(response, "Your dog likely has mild arthritis");
                assert_eq!(source, ResponseSource::Assistant);
            }
            other => panic!("expected reconstructed completion, got {:?}", other),
        }
    }
}
