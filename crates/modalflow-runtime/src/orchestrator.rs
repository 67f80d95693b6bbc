//! Processing orchestrator
//!
//! Drives a task from classification through engine selection to a terminal
//! state. Selection is two-phase: engines claimed by the strategy matching
//! the recognized intent category win, then any healthy engine whose
//! `supports` predicate accepts the task. Registration order is the tie
//! break; health is re-checked on every call.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::channel::mpsc;
use futures::stream::BoxStream;
use futures::{SinkExt, StreamExt};
use tracing::{debug, info, warn};

use modalflow_core::engine::{EngineInfo, ProcessingEngine};
use modalflow_core::error::DomainError;
use modalflow_core::intent::{IntentRecognizer, UserIntent};
use modalflow_core::repository::TaskRepository;
use modalflow_core::strategy::IntentSupportStrategy;
use modalflow_core::types::{
    InputContent, ModalityType, ProcessingPrompt, ProcessingResult, ProcessingTask,
    ProcessingTaskId, TaskEvent,
};

/// Orchestrator configuration
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Upper bound for one engine invocation; expiry fails the task
    pub task_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            task_timeout: Duration::from_secs(600),
        }
    }
}

/// Buffered chunks between the stream driver and a slow consumer
const STREAM_BUFFER: usize = 16;

/// Orchestrator - wires recognizer + strategies + engines + repository
pub struct ProcessingOrchestrator {
    engines: Vec<Arc<dyn ProcessingEngine>>,
    recognizer: Arc<IntentRecognizer>,
    strategies: Vec<Arc<dyn IntentSupportStrategy>>,
    repository: Arc<dyn TaskRepository>,
    config: OrchestratorConfig,
}

struct EngineSelection {
    engine: Arc<dyn ProcessingEngine>,
    routed_by_intent: bool,
}

/// How a streamed engine invocation ended
enum StreamEnd {
    /// Stream ran dry; holds the last emitted result, if any
    Finished(Option<ProcessingResult>),
    Failed(String),
    /// Consumer dropped the receiving half mid-stream
    Abandoned,
}

impl ProcessingOrchestrator {
    pub fn new(
        engines: Vec<Arc<dyn ProcessingEngine>>,
        recognizer: Arc<IntentRecognizer>,
        strategies: Vec<Arc<dyn IntentSupportStrategy>>,
        repository: Arc<dyn TaskRepository>,
    ) -> Self {
        Self::with_config(
            engines,
            recognizer,
            strategies,
            repository,
            OrchestratorConfig::default(),
        )
    }

    pub fn with_config(
        engines: Vec<Arc<dyn ProcessingEngine>>,
        recognizer: Arc<IntentRecognizer>,
        strategies: Vec<Arc<dyn IntentSupportStrategy>>,
        repository: Arc<dyn TaskRepository>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            engines,
            recognizer,
            strategies,
            repository,
            config,
        }
    }

    /// Pick the engine for a task: intent routing first, modality second
    pub async fn select_engine(
        &self,
        task: &ProcessingTask,
    ) -> Option<Arc<dyn ProcessingEngine>> {
        let intent = self.recognizer.classify(task).await;
        self.select_for_intent(task, intent)
            .map(|selection| selection.engine)
    }

    fn select_for_intent(
        &self,
        task: &ProcessingTask,
        intent: UserIntent,
    ) -> Option<EngineSelection> {
        // Phase 1: intent-category routing
        if let Some(strategy) = self
            .strategies
            .iter()
            .find(|s| s.category() == intent.category())
        {
            if let Some(engine) = self
                .engines
                .iter()
                .find(|e| e.is_healthy() && strategy.supports_engine(e.as_ref()))
            {
                debug!(engine = engine.name(), intent = %intent, "engine selected by intent");
                return Some(EngineSelection {
                    engine: Arc::clone(engine),
                    routed_by_intent: true,
                });
            }
        }

        // Phase 2: modality support
        self.engines
            .iter()
            .find(|e| e.is_healthy() && e.supports(task))
            .map(|engine| {
                debug!(engine = engine.name(), "engine selected by modality");
                EngineSelection {
                    engine: Arc::clone(engine),
                    routed_by_intent: false,
                }
            })
    }

    /// Run a task to a terminal state. The task is persisted at every
    /// transition, so its final state is durable before any error surfaces.
    pub async fn process_task(
        &self,
        task: ProcessingTask,
    ) -> Result<ProcessingResult, DomainError> {
        let recognition = self.recognizer.classify_with_parameters(&task).await;
        let intent = recognition.intent;

        let mut merged = recognition.parameters;
        merged.insert("intent".to_string(), intent.as_str().to_string());
        let mut task = task.with_merged_parameters(merged);

        let Some(selection) = self.select_for_intent(&task, intent) else {
            let message = DomainError::NoSuitableEngine.to_string();
            task.fail(message)?;
            self.persist(&mut task).await?;
            return Err(DomainError::NoSuitableEngine);
        };

        task.start()?;
        self.persist(&mut task).await?;

        let engine = selection.engine;
        let started = Instant::now();
        let run = async {
            match engine.intent_handler() {
                Some(handler) if selection.routed_by_intent => {
                    handler.process_with_intent(&task, intent).await
                }
                _ => engine.process(&task).await,
            }
        };

        let outcome = tokio::time::timeout(self.config.task_timeout, run).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let result = match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                let message = e.to_string();
                warn!(task_id = %task.id(), engine = engine.name(), error = %message, "engine failed");
                task.fail(message.as_str())?;
                self.persist(&mut task).await?;
                return Err(DomainError::ProcessingFailed(message));
            }
            Err(_) => {
                let message = format!(
                    "processing timeout after {}s",
                    self.config.task_timeout.as_secs()
                );
                warn!(task_id = %task.id(), engine = engine.name(), "engine timed out");
                task.fail(message.as_str())?;
                self.persist(&mut task).await?;
                return Err(DomainError::ProcessingFailed(message));
            }
        };

        task.complete(result.clone(), elapsed_ms)?;
        self.persist(&mut task).await?;
        Ok(result)
    }

    /// Run a task through the streaming path. Selection and the PROCESSING
    /// transition happen before this returns, so callers only get a stream
    /// once an engine has been committed. Chunks are forwarded as the
    /// engine emits them; the terminal transition is recorded when the
    /// stream ends. The last emitted result completes the task, an engine
    /// error or timeout fails it, and an abandoned consumer cancels it.
    pub async fn process_task_stream(
        &self,
        task: ProcessingTask,
    ) -> Result<BoxStream<'static, Result<ProcessingResult, DomainError>>, DomainError> {
        let recognition = self.recognizer.classify_with_parameters(&task).await;
        let intent = recognition.intent;

        let mut merged = recognition.parameters;
        merged.insert("intent".to_string(), intent.as_str().to_string());
        let mut task = task.with_merged_parameters(merged);

        let Some(selection) = self.select_for_intent(&task, intent) else {
            let message = DomainError::NoSuitableEngine.to_string();
            task.fail(message)?;
            self.persist(&mut task).await?;
            return Err(DomainError::NoSuitableEngine);
        };

        task.start()?;
        self.persist(&mut task).await?;

        let engine = selection.engine;
        let repository = Arc::clone(&self.repository);
        let task_timeout = self.config.task_timeout;
        let (mut tx, rx) = mpsc::channel(STREAM_BUFFER);

        tokio::spawn(async move {
            let started = Instant::now();
            let drive = async {
                let mut stream = engine.process_stream(&task);
                let mut last = None;
                while let Some(item) = stream.next().await {
                    match item {
                        Ok(result) => {
                            last = Some(result.clone());
                            if tx.send(Ok(result)).await.is_err() {
                                return StreamEnd::Abandoned;
                            }
                        }
                        Err(e) => return StreamEnd::Failed(e.to_string()),
                    }
                }
                StreamEnd::Finished(last)
            };

            let end = match tokio::time::timeout(task_timeout, drive).await {
                Ok(end) => end,
                Err(_) => StreamEnd::Failed(format!(
                    "processing timeout after {}s",
                    task_timeout.as_secs()
                )),
            };
            let elapsed_ms = started.elapsed().as_millis() as u64;

            let transition = match end {
                StreamEnd::Finished(Some(result)) => task.complete(result, elapsed_ms),
                StreamEnd::Finished(None) => {
                    task.fail("engine stream ended without a result")
                }
                StreamEnd::Failed(message) => {
                    warn!(task_id = %task.id(), engine = engine.name(), error = %message, "engine stream failed");
                    let _ = tx
                        .send(Err(DomainError::ProcessingFailed(message.clone())))
                        .await;
                    task.fail(message)
                }
                StreamEnd::Abandoned => {
                    debug!(task_id = %task.id(), "stream consumer gone, cancelling task");
                    task.cancel()
                }
            };
            if let Err(e) = transition {
                warn!(task_id = %task.id(), error = %e, "terminal transition rejected");
            }
            if let Err(e) = persist_task(repository.as_ref(), &mut task).await {
                warn!(task_id = %task.id(), error = %e, "failed to persist streamed task");
            }
        });

        Ok(rx.boxed())
    }

    /// Put a FAILED stored task back in the PENDING queue, clearing the
    /// previous attempt's error and result.
    pub async fn retry_task(
        &self,
        id: &ProcessingTaskId,
    ) -> Result<ProcessingTask, DomainError> {
        let mut task = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::TaskNotFound(id.to_string()))?;
        task.retry()?;
        self.persist(&mut task).await?;
        info!(task_id = %id, "task queued for retry");
        Ok(task)
    }

    /// Cooperative cancellation: marks the stored task CANCELLED. Engine
    /// invocations already in flight are not interrupted.
    pub async fn cancel_task(&self, id: &ProcessingTaskId) -> Result<(), DomainError> {
        let mut task = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::TaskNotFound(id.to_string()))?;
        task.cancel()?;
        self.persist(&mut task).await?;
        info!(task_id = %id, "task cancelled");
        Ok(())
    }

    /// Fetch a stored task
    pub async fn get_task(&self, id: &ProcessingTaskId) -> Result<ProcessingTask, DomainError> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::TaskNotFound(id.to_string()))
    }

    /// Whether any healthy engine can convert between the given modalities
    pub fn supports_modality_conversion(
        &self,
        input: &ModalityType,
        output: &ModalityType,
    ) -> bool {
        let Ok(probe) = probe_task(input, output) else {
            return false;
        };
        self.engines
            .iter()
            .any(|e| e.is_healthy() && e.supports(&probe))
    }

    /// Read-only listing of registered engines
    pub fn available_engines(&self) -> Vec<EngineInfo> {
        self.engines
            .iter()
            .map(|e| EngineInfo {
                name: e.name().to_string(),
                priority: e.priority(),
                healthy: e.is_healthy(),
            })
            .collect()
    }

    pub fn healthy_engine_count(&self) -> usize {
        self.engines.iter().filter(|e| e.is_healthy()).count()
    }

    /// At least one healthy engine registered
    pub fn is_system_healthy(&self) -> bool {
        self.healthy_engine_count() > 0
    }

    async fn persist(&self, task: &mut ProcessingTask) -> Result<(), DomainError> {
        persist_task(self.repository.as_ref(), task).await
    }
}

/// Save the task and flush its pending lifecycle events into the log
async fn persist_task(
    repository: &dyn TaskRepository,
    task: &mut ProcessingTask,
) -> Result<(), DomainError> {
    repository.save(task).await?;
    for event in task.take_events() {
        match event {
            TaskEvent::Created {
                task_id,
                input_modality,
                output_modality,
            } => {
                info!(task_id = %task_id, %input_modality, %output_modality, "task created");
            }
            TaskEvent::Completed {
                task_id,
                confidence,
            } => {
                info!(task_id = %task_id, confidence, "task completed");
            }
            TaskEvent::Failed { task_id, message } => {
                warn!(task_id = %task_id, %message, "task failed");
            }
        }
    }
    Ok(())
}

/// Minimal task used to probe engine modality support
fn probe_task(
    input: &ModalityType,
    output: &ModalityType,
) -> Result<ProcessingTask, DomainError> {
    let contents = if input.is_text() {
        Vec::new()
    } else {
        vec![InputContent::of(
            "probe",
            vec![0u8],
            "application/octet-stream",
        )?]
    };
    ProcessingTask::create(
        ProcessingTaskId::generate(),
        "probe",
        input.clone(),
        output.clone(),
        ProcessingPrompt::default_for(input),
        contents,
        HashMap::new(),
        0,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use modalflow_core::engine::EngineError;
    use modalflow_core::intent::{IntentRecognition, NlpEngine};
    use modalflow_core::strategy::standard_strategies;
    use modalflow_core::types::ProcessingStatus;
    use modalflow_engines::{InMemoryLendingService, LendingEngine};
    use modalflow_nlp::{LlmNlpEngine, MockLlmClient};
    use modalflow_stores::InMemoryTaskRepository;

    struct FixedNlp(UserIntent);

    #[async_trait]
    impl NlpEngine for FixedNlp {
        async fn recognize(&self, _prompt: &str) -> UserIntent {
            self.0
        }

        async fn recognize_with_parameters(&self, _prompt: &str) -> IntentRecognition {
            IntentRecognition::of(self.0)
        }
    }

    struct StubEngine {
        name: &'static str,
        reply: &'static str,
        healthy: bool,
    }

    impl StubEngine {
        fn new(name: &'static str, reply: &'static str) -> Self {
            Self {
                name,
                reply,
                healthy: true,
            }
        }
    }

    #[async_trait]
    impl ProcessingEngine for StubEngine {
        fn name(&self) -> &str {
            self.name
        }
        fn priority(&self) -> i32 {
            100
        }
        fn supports(&self, task: &ProcessingTask) -> bool {
            task.input_modality().is_text() && task.output_modality().is_text()
        }
        fn is_healthy(&self) -> bool {
            self.healthy
        }
        fn estimate_processing_time(&self, _task: &ProcessingTask) -> Duration {
            Duration::from_millis(1)
        }
        async fn process(&self, _task: &ProcessingTask) -> Result<ProcessingResult, EngineError> {
            ProcessingResult::text(self.reply, 0.9)
                .map_err(|e| EngineError::InvalidOutput(e.to_string()))
        }
    }

    struct ChunkedEngine {
        fail_after_chunks: bool,
    }

    #[async_trait]
    impl ProcessingEngine for ChunkedEngine {
        fn name(&self) -> &str {
            "chunked"
        }
        fn priority(&self) -> i32 {
            100
        }
        fn supports(&self, task: &ProcessingTask) -> bool {
            task.input_modality().is_text() && task.output_modality().is_text()
        }
        fn is_healthy(&self) -> bool {
            true
        }
        fn estimate_processing_time(&self, _task: &ProcessingTask) -> Duration {
            Duration::from_millis(1)
        }
        async fn process(&self, _task: &ProcessingTask) -> Result<ProcessingResult, EngineError> {
            ProcessingResult::text("one two", 0.9)
                .map_err(|e| EngineError::InvalidOutput(e.to_string()))
        }
        fn process_stream<'a>(
            &'a self,
            _task: &'a ProcessingTask,
        ) -> futures::stream::BoxStream<'a, Result<ProcessingResult, EngineError>> {
            let mut chunks = vec![
                ProcessingResult::text("one", 0.5)
                    .map_err(|e| EngineError::InvalidOutput(e.to_string())),
                ProcessingResult::text("one two", 0.9)
                    .map_err(|e| EngineError::InvalidOutput(e.to_string())),
            ];
            if self.fail_after_chunks {
                chunks.push(Err(EngineError::Backend("connection reset".to_string())));
            }
            Box::pin(futures::stream::iter(chunks))
        }
    }

    struct SlowEngine;

    #[async_trait]
    impl ProcessingEngine for SlowEngine {
        fn name(&self) -> &str {
            "slow"
        }
        fn priority(&self) -> i32 {
            100
        }
        fn supports(&self, task: &ProcessingTask) -> bool {
            task.input_modality().is_text()
        }
        fn is_healthy(&self) -> bool {
            true
        }
        fn estimate_processing_time(&self, _task: &ProcessingTask) -> Duration {
            Duration::from_secs(1)
        }
        async fn process(&self, _task: &ProcessingTask) -> Result<ProcessingResult, EngineError> {
            tokio::time::sleep(Duration::from_millis(200)).await;
            ProcessingResult::text("too late", 0.9)
                .map_err(|e| EngineError::InvalidOutput(e.to_string()))
        }
    }

    fn text_task(prompt: &str) -> ProcessingTask {
        ProcessingTask::create(
            ProcessingTaskId::generate(),
            "user-1",
            ModalityType::text(),
            ModalityType::text(),
            ProcessingPrompt::of(prompt).unwrap(),
            Vec::new(),
            HashMap::new(),
            0,
        )
        .unwrap()
    }

    fn video_task() -> ProcessingTask {
        ProcessingTask::create(
            ProcessingTaskId::generate(),
            "user-1",
            ModalityType::video(),
            ModalityType::text(),
            ProcessingPrompt::of("summarize").unwrap(),
            vec![InputContent::of("clip.mp4", vec![1], "video/mp4").unwrap()],
            HashMap::new(),
            0,
        )
        .unwrap()
    }

    fn lending_engine() -> Arc<dyn ProcessingEngine> {
        Arc::new(LendingEngine::new(Arc::new(
            InMemoryLendingService::with_sample_catalog(),
        )))
    }

    fn orchestrator_with(
        engines: Vec<Arc<dyn ProcessingEngine>>,
        nlp: Arc<dyn NlpEngine>,
        repository: Arc<InMemoryTaskRepository>,
    ) -> ProcessingOrchestrator {
        ProcessingOrchestrator::new(
            engines,
            Arc::new(IntentRecognizer::new(nlp)),
            standard_strategies(),
            repository,
        )
    }

    #[tokio::test]
    async fn test_intent_match_beats_earlier_registered_modality_match() {
        let repo = Arc::new(InMemoryTaskRepository::new());
        let orchestrator = orchestrator_with(
            vec![
                Arc::new(StubEngine::new("generic", "generic reply")),
                lending_engine(),
            ],
            Arc::new(FixedNlp(UserIntent::ViewAvailableItems)),
            repo,
        );

        let result = orchestrator
            .process_task(text_task("view all available books"))
            .await
            .unwrap();
        assert!(result.content().unwrap().contains("Available items"));
    }

    #[tokio::test]
    async fn test_selection_is_deterministic_by_registration_order() {
        let repo = Arc::new(InMemoryTaskRepository::new());
        let orchestrator = orchestrator_with(
            vec![
                Arc::new(StubEngine::new("first", "from first")),
                Arc::new(StubEngine::new("second", "from second")),
            ],
            Arc::new(FixedNlp(UserIntent::GeneralProcessing)),
            repo,
        );

        for _ in 0..3 {
            let result = orchestrator
                .process_task(text_task("hello there"))
                .await
                .unwrap();
            assert_eq!(result.content(), Some("from first"));
        }
    }

    #[tokio::test]
    async fn test_unhealthy_engine_is_skipped() {
        let repo = Arc::new(InMemoryTaskRepository::new());
        let mut down = StubEngine::new("down", "unreachable");
        down.healthy = false;
        let orchestrator = orchestrator_with(
            vec![Arc::new(down), Arc::new(StubEngine::new("up", "from up"))],
            Arc::new(FixedNlp(UserIntent::GeneralProcessing)),
            repo,
        );

        let result = orchestrator.process_task(text_task("hi")).await.unwrap();
        assert_eq!(result.content(), Some("from up"));
        assert_eq!(orchestrator.healthy_engine_count(), 1);
        assert!(orchestrator.is_system_healthy());
    }

    #[tokio::test]
    async fn test_no_engine_fails_task_with_message() {
        let repo = Arc::new(InMemoryTaskRepository::new());
        let orchestrator = orchestrator_with(
            vec![Arc::new(StubEngine::new("text-only", "reply"))],
            Arc::new(FixedNlp(UserIntent::GeneralProcessing)),
            Arc::clone(&repo),
        );

        let task = video_task();
        let id = task.id().clone();
        let err = orchestrator.process_task(task).await.unwrap_err();
        assert!(matches!(err, DomainError::NoSuitableEngine));

        let stored = repo.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(stored.status(), ProcessingStatus::Failed);
        assert_eq!(
            stored.error_message(),
            Some("no suitable processing engine found for task")
        );
    }

    #[tokio::test]
    async fn test_timeout_fails_task() {
        let repo = Arc::new(InMemoryTaskRepository::new());
        let orchestrator = ProcessingOrchestrator::with_config(
            vec![Arc::new(SlowEngine)],
            Arc::new(IntentRecognizer::new(Arc::new(FixedNlp(
                UserIntent::GeneralProcessing,
            )))),
            standard_strategies(),
            Arc::clone(&repo) as Arc<dyn TaskRepository>,
            OrchestratorConfig {
                task_timeout: Duration::from_millis(10),
            },
        );

        let task = text_task("take your time");
        let id = task.id().clone();
        let err = orchestrator.process_task(task).await.unwrap_err();
        assert!(matches!(err, DomainError::ProcessingFailed(_)));

        let stored = repo.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(stored.status(), ProcessingStatus::Failed);
        assert!(stored.error_message().unwrap().contains("timeout"));
    }

    #[tokio::test]
    async fn test_browse_scenario_through_model_path() {
        let repo = Arc::new(InMemoryTaskRepository::new());
        let nlp = LlmNlpEngine::new(
            MockLlmClient {
                response: r#"{"intent":"VIEW_AVAILABLE_ITEMS","parameters":{}}"#.to_string(),
            },
            "test-model",
            0.0,
        );
        let orchestrator = orchestrator_with(
            vec![lending_engine()],
            Arc::new(nlp),
            Arc::clone(&repo),
        );

        let task = text_task("what books can I borrow");
        let id = task.id().clone();
        let result = orchestrator.process_task(task).await.unwrap();
        assert!(result.content().unwrap().contains("Available items"));

        let stored = repo.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(stored.status(), ProcessingStatus::Completed);
        assert_eq!(stored.parameter("intent"), Some("VIEW_AVAILABLE_ITEMS"));
    }

    #[tokio::test]
    async fn test_borrow_scenario_extracts_parameters_and_completes() {
        let repo = Arc::new(InMemoryTaskRepository::new());
        let nlp = LlmNlpEngine::new(
            MockLlmClient {
                response: r#"{"intent":"ACTION_EXECUTE","parameters":{}}"#.to_string(),
            },
            "test-model",
            0.0,
        );
        let orchestrator = orchestrator_with(
            vec![lending_engine()],
            Arc::new(nlp),
            Arc::clone(&repo),
        );

        let task =
            text_task("I want to borrow 《Intro to Algorithms》, id 2021001, name Li Lei");
        let id = task.id().clone();
        let result = orchestrator.process_task(task).await.unwrap();
        assert!(result
            .content()
            .unwrap()
            .contains("Borrowed 'Intro to Algorithms'"));

        let stored = repo.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(stored.status(), ProcessingStatus::Completed);
        assert_eq!(stored.parameter("bookTitle"), Some("Intro to Algorithms"));
        assert_eq!(stored.parameter("studentId"), Some("2021001"));
        assert_eq!(stored.parameter("studentName"), Some("Li Lei"));
        assert!(stored.processing_time_ms() < 60_000);
    }

    #[tokio::test]
    async fn test_cancel_task_is_cooperative() {
        let repo = Arc::new(InMemoryTaskRepository::new());
        let orchestrator = orchestrator_with(
            vec![Arc::new(StubEngine::new("stub", "reply"))],
            Arc::new(FixedNlp(UserIntent::GeneralProcessing)),
            Arc::clone(&repo),
        );

        let task = text_task("pending work");
        let id = task.id().clone();
        repo.save(&task).await.unwrap();

        orchestrator.cancel_task(&id).await.unwrap();
        let stored = repo.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(stored.status(), ProcessingStatus::Cancelled);

        let missing = ProcessingTaskId::generate();
        assert!(matches!(
            orchestrator.cancel_task(&missing).await,
            Err(DomainError::TaskNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_streaming_forwards_chunks_and_completes_with_last() {
        let repo = Arc::new(InMemoryTaskRepository::new());
        let orchestrator = orchestrator_with(
            vec![Arc::new(ChunkedEngine {
                fail_after_chunks: false,
            })],
            Arc::new(FixedNlp(UserIntent::GeneralProcessing)),
            Arc::clone(&repo),
        );

        let task = text_task("stream this");
        let id = task.id().clone();
        let stream = orchestrator.process_task_stream(task).await.unwrap();
        let chunks: Vec<_> = stream.collect().await;

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].as_ref().unwrap().content(), Some("one"));
        assert_eq!(chunks[1].as_ref().unwrap().content(), Some("one two"));

        let stored = repo.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(stored.status(), ProcessingStatus::Completed);
        assert_eq!(stored.result().unwrap().content(), Some("one two"));
        assert_eq!(stored.parameter("intent"), Some("GENERAL_PROCESSING"));
    }

    #[tokio::test]
    async fn test_streaming_error_fails_task_after_partial_output() {
        let repo = Arc::new(InMemoryTaskRepository::new());
        let orchestrator = orchestrator_with(
            vec![Arc::new(ChunkedEngine {
                fail_after_chunks: true,
            })],
            Arc::new(FixedNlp(UserIntent::GeneralProcessing)),
            Arc::clone(&repo),
        );

        let task = text_task("stream this");
        let id = task.id().clone();
        let stream = orchestrator.process_task_stream(task).await.unwrap();
        let chunks: Vec<_> = stream.collect().await;

        assert_eq!(chunks.len(), 3);
        assert!(chunks[0].is_ok());
        assert!(chunks[1].is_ok());
        assert!(matches!(chunks[2], Err(DomainError::ProcessingFailed(_))));

        let stored = repo.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(stored.status(), ProcessingStatus::Failed);
        assert!(stored.error_message().unwrap().contains("connection reset"));
    }

    #[tokio::test]
    async fn test_streaming_without_engine_fails_before_returning_stream() {
        let repo = Arc::new(InMemoryTaskRepository::new());
        let orchestrator = orchestrator_with(
            vec![Arc::new(StubEngine::new("text-only", "reply"))],
            Arc::new(FixedNlp(UserIntent::GeneralProcessing)),
            Arc::clone(&repo),
        );

        let task = video_task();
        let id = task.id().clone();
        let err = match orchestrator.process_task_stream(task).await {
            Ok(_) => panic!("expected process_task_stream to fail"),
            Err(e) => e,
        };
        assert!(matches!(err, DomainError::NoSuitableEngine));

        let stored = repo.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(stored.status(), ProcessingStatus::Failed);
    }

    #[tokio::test]
    async fn test_streaming_wraps_single_shot_engines() {
        let repo = Arc::new(InMemoryTaskRepository::new());
        let orchestrator = orchestrator_with(
            vec![Arc::new(StubEngine::new("stub", "whole reply"))],
            Arc::new(FixedNlp(UserIntent::GeneralProcessing)),
            Arc::clone(&repo),
        );

        let task = text_task("hello");
        let id = task.id().clone();
        let stream = orchestrator.process_task_stream(task).await.unwrap();
        let chunks: Vec<_> = stream.collect().await;

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].as_ref().unwrap().content(), Some("whole reply"));

        let stored = repo.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(stored.status(), ProcessingStatus::Completed);
    }

    #[tokio::test]
    async fn test_retry_task_requeues_failed_task() {
        let repo = Arc::new(InMemoryTaskRepository::new());
        let orchestrator = orchestrator_with(
            vec![Arc::new(StubEngine::new("stub", "reply"))],
            Arc::new(FixedNlp(UserIntent::GeneralProcessing)),
            Arc::clone(&repo),
        );

        let mut task = text_task("flaky work");
        let id = task.id().clone();
        task.fail("backend unreachable").unwrap();
        repo.save(&task).await.unwrap();

        let retried = orchestrator.retry_task(&id).await.unwrap();
        assert_eq!(retried.status(), ProcessingStatus::Pending);
        assert_eq!(retried.error_message(), None);

        let stored = repo.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(stored.status(), ProcessingStatus::Pending);
    }

    #[tokio::test]
    async fn test_retry_task_rejects_non_failed_and_missing() {
        let repo = Arc::new(InMemoryTaskRepository::new());
        let orchestrator = orchestrator_with(
            vec![Arc::new(StubEngine::new("stub", "reply"))],
            Arc::new(FixedNlp(UserIntent::GeneralProcessing)),
            Arc::clone(&repo),
        );

        let task = text_task("still pending");
        let id = task.id().clone();
        repo.save(&task).await.unwrap();

        assert!(matches!(
            orchestrator.retry_task(&id).await,
            Err(DomainError::InvalidStatus(_))
        ));

        let missing = ProcessingTaskId::generate();
        assert!(matches!(
            orchestrator.retry_task(&missing).await,
            Err(DomainError::TaskNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_supports_modality_conversion() {
        let repo = Arc::new(InMemoryTaskRepository::new());
        let orchestrator = orchestrator_with(
            vec![Arc::new(StubEngine::new("stub", "reply"))],
            Arc::new(FixedNlp(UserIntent::GeneralProcessing)),
            repo,
        );

        assert!(orchestrator
            .supports_modality_conversion(&ModalityType::text(), &ModalityType::text()));
        assert!(!orchestrator
            .supports_modality_conversion(&ModalityType::video(), &ModalityType::text()));
        // VIDEO cannot be produced at all
        assert!(!orchestrator
            .supports_modality_conversion(&ModalityType::text(), &ModalityType::video()));
    }

    #[tokio::test]
    async fn test_available_engines_listing() {
        let repo = Arc::new(InMemoryTaskRepository::new());
        let orchestrator = orchestrator_with(
            vec![lending_engine(), Arc::new(StubEngine::new("stub", "r"))],
            Arc::new(FixedNlp(UserIntent::GeneralProcessing)),
            repo,
        );

        let infos = orchestrator.available_engines();
        assert_eq!(infos.len(), 2);
        assert_eq!(infos[0].name, "lending");
        assert_eq!(infos[0].priority, 10);
        assert!(infos.iter().all(|i| i.healthy));
    }
}
