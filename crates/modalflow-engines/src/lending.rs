//! Lending engine
//!
//! Specialized TEXT -> TEXT engine that routes each request to the matching
//! catalog operation based on the recognized intent. The catalog itself sits
//! behind the [`LendingService`] trait so the engine stays backend-agnostic.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use modalflow_core::engine::{EngineError, IntentAwareEngine, ProcessingEngine};
use modalflow_core::intent::{classify_by_rules, UserIntent};
use modalflow_core::types::{ProcessingResult, ProcessingTask};

/// One catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: String,
    pub title: String,
    pub author: String,
    pub category: String,
    pub available_copies: u32,
    pub total_copies: u32,
}

impl CatalogItem {
    pub fn is_available(&self) -> bool {
        self.available_copies > 0
    }
}

/// Borrow request, keyed by id or title
#[derive(Debug, Clone, Default)]
pub struct BorrowRequest {
    pub item_id: Option<String>,
    pub item_title: Option<String>,
    pub student_id: String,
    pub student_name: String,
}

/// Return request, keyed by id or title
#[derive(Debug, Clone, Default)]
pub struct ReturnRequest {
    pub item_id: Option<String>,
    pub item_title: Option<String>,
    pub student_id: String,
}

/// Lending domain failures
#[derive(Debug, Error)]
pub enum LendingError {
    #[error("item not found: {0}")]
    ItemNotFound(String),

    #[error("item not available: {0}")]
    ItemUnavailable(String),

    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("lending backend error: {0}")]
    Backend(String),
}

/// Catalog capability consumed by the lending engine
#[async_trait]
pub trait LendingService: Send + Sync {
    /// Items with at least one available copy
    async fn list_available(&self) -> Result<Vec<CatalogItem>, LendingError>;

    /// Search by optional title substring and/or category
    async fn search(
        &self,
        title: Option<&str>,
        category: Option<&str>,
    ) -> Result<Vec<CatalogItem>, LendingError>;

    /// Borrow one copy; returns the updated item
    async fn borrow(&self, request: &BorrowRequest) -> Result<CatalogItem, LendingError>;

    /// Return one copy; returns the updated item
    async fn return_item(&self, request: &ReturnRequest) -> Result<CatalogItem, LendingError>;
}

/// In-memory catalog for development and tests
pub struct InMemoryLendingService {
    items: RwLock<Vec<CatalogItem>>,
}

impl InMemoryLendingService {
    pub fn new(items: Vec<CatalogItem>) -> Self {
        Self {
            items: RwLock::new(items),
        }
    }

    /// Small seeded catalog for demos
    pub fn with_sample_catalog() -> Self {
        Self::new(vec![
            CatalogItem {
                id: "1".to_string(),
                title: "Intro to Algorithms".to_string(),
                author: "Cormen".to_string(),
                category: "programming".to_string(),
                available_copies: 3,
                total_copies: 5,
            },
            CatalogItem {
                id: "2".to_string(),
                title: "Dune".to_string(),
                author: "Herbert".to_string(),
                category: "literature".to_string(),
                available_copies: 1,
                total_copies: 2,
            },
            CatalogItem {
                id: "3".to_string(),
                title: "The Art of Computer Programming".to_string(),
                author: "Knuth".to_string(),
                category: "programming".to_string(),
                available_copies: 0,
                total_copies: 1,
            },
        ])
    }

    fn locked(
        &self,
    ) -> Result<std::sync::RwLockWriteGuard<'_, Vec<CatalogItem>>, LendingError> {
        self.items
            .write()
            .map_err(|e| LendingError::Backend(e.to_string()))
    }

    fn matches(item: &CatalogItem, id: Option<&str>, title: Option<&str>) -> bool {
        if let Some(id) = id {
            return item.id == id;
        }
        if let Some(title) = title {
            return item.title.eq_ignore_ascii_case(title);
        }
        false
    }
}

#[async_trait]
impl LendingService for InMemoryLendingService {
    async fn list_available(&self) -> Result<Vec<CatalogItem>, LendingError> {
        let items = self
            .items
            .read()
            .map_err(|e| LendingError::Backend(e.to_string()))?;
        Ok(items.iter().filter(|i| i.is_available()).cloned().collect())
    }

    async fn search(
        &self,
        title: Option<&str>,
        category: Option<&str>,
    ) -> Result<Vec<CatalogItem>, LendingError> {
        let items = self
            .items
            .read()
            .map_err(|e| LendingError::Backend(e.to_string()))?;
        let title = title.map(str::to_lowercase);
        let category = category.map(str::to_lowercase);
        Ok(items
            .iter()
            .filter(|i| {
                let title_hit = title
                    .as_deref()
                    .map_or(true, |t| i.title.to_lowercase().contains(t));
                let category_hit = category
                    .as_deref()
                    .map_or(true, |c| i.category.to_lowercase() == c);
                title_hit && category_hit
            })
            .cloned()
            .collect())
    }

    async fn borrow(&self, request: &BorrowRequest) -> Result<CatalogItem, LendingError> {
        if request.student_id.is_empty() {
            return Err(LendingError::MissingField("studentId".to_string()));
        }
        if request.student_name.is_empty() {
            return Err(LendingError::MissingField("studentName".to_string()));
        }
        let key = request
            .item_id
            .clone()
            .or_else(|| request.item_title.clone())
            .ok_or_else(|| LendingError::MissingField("bookId or bookTitle".to_string()))?;

        let mut items = self.locked()?;
        let item = items
            .iter_mut()
            .find(|i| Self::matches(i, request.item_id.as_deref(), request.item_title.as_deref()))
            .ok_or(LendingError::ItemNotFound(key.clone()))?;
        if !item.is_available() {
            return Err(LendingError::ItemUnavailable(key));
        }
        item.available_copies -= 1;
        Ok(item.clone())
    }

    async fn return_item(&self, request: &ReturnRequest) -> Result<CatalogItem, LendingError> {
        if request.student_id.is_empty() {
            return Err(LendingError::MissingField("studentId".to_string()));
        }
        let key = request
            .item_id
            .clone()
            .or_else(|| request.item_title.clone())
            .ok_or_else(|| LendingError::MissingField("bookId or bookTitle".to_string()))?;

        let mut items = self.locked()?;
        let item = items
            .iter_mut()
            .find(|i| Self::matches(i, request.item_id.as_deref(), request.item_title.as_deref()))
            .ok_or(LendingError::ItemNotFound(key))?;
        if item.available_copies < item.total_copies {
            item.available_copies += 1;
        }
        Ok(item.clone())
    }
}

const LENDING_ENGINE_NAME: &str = "lending";

/// Specialized engine answering lending intents
pub struct LendingEngine {
    service: Arc<dyn LendingService>,
}

impl LendingEngine {
    pub fn new(service: Arc<dyn LendingService>) -> Self {
        Self { service }
    }

    async fn view_available(&self) -> Result<ProcessingResult, EngineError> {
        let items = self.service.list_available().await.map_err(backend_error)?;
        text_result(render_items("Available items", &items), 0.95)
    }

    async fn search_items(&self, task: &ProcessingTask) -> Result<ProcessingResult, EngineError> {
        let title = task.parameter("bookTitle");
        let category = task.parameter("category");
        let items = self
            .service
            .search(title, category)
            .await
            .map_err(backend_error)?;
        text_result(render_items("Search results", &items), 0.9)
    }

    async fn borrow_item(&self, task: &ProcessingTask) -> Result<ProcessingResult, EngineError> {
        let request = BorrowRequest {
            item_id: task.parameter("bookId").map(str::to_string),
            item_title: task.parameter("bookTitle").map(str::to_string),
            student_id: task.parameter("studentId").unwrap_or_default().to_string(),
            student_name: task.parameter("studentName").unwrap_or_default().to_string(),
        };
        match self.service.borrow(&request).await {
            Ok(item) => text_result(
                format!(
                    "Borrowed '{}' for {} ({}). {} copies left.",
                    item.title, request.student_name, request.student_id, item.available_copies
                ),
                0.95,
            ),
            Err(e @ LendingError::Backend(_)) => Err(backend_error(e)),
            Err(e) => text_result(format!("Could not borrow: {}", e), 0.6),
        }
    }

    async fn return_borrowed(&self, task: &ProcessingTask) -> Result<ProcessingResult, EngineError> {
        let request = ReturnRequest {
            item_id: task.parameter("bookId").map(str::to_string),
            item_title: task.parameter("bookTitle").map(str::to_string),
            student_id: task.parameter("studentId").unwrap_or_default().to_string(),
        };
        match self.service.return_item(&request).await {
            Ok(item) => text_result(
                format!(
                    "Returned '{}'. {} of {} copies now available.",
                    item.title, item.available_copies, item.total_copies
                ),
                0.95,
            ),
            Err(e @ LendingError::Backend(_)) => Err(backend_error(e)),
            Err(e) => text_result(format!("Could not return: {}", e), 0.6),
        }
    }

    async fn general_help(&self) -> Result<ProcessingResult, EngineError> {
        text_result(
            "I can list available items, search the catalog, borrow and return items."
                .to_string(),
            0.5,
        )
    }
}

fn backend_error(e: LendingError) -> EngineError {
    EngineError::Backend(e.to_string())
}

fn text_result(content: String, confidence: f64) -> Result<ProcessingResult, EngineError> {
    ProcessingResult::text(content, confidence)
        .map_err(|e| EngineError::InvalidOutput(e.to_string()))
}

fn render_items(heading: &str, items: &[CatalogItem]) -> String {
    if items.is_empty() {
        return format!("{}: none found.", heading);
    }
    let mut out = format!("{} ({}):\n", heading, items.len());
    for item in items {
        out.push_str(&format!(
            "- [{}] {} by {} ({}, {}/{} available)\n",
            item.id, item.title, item.author, item.category, item.available_copies,
            item.total_copies
        ));
    }
    out
}

#[async_trait]
impl ProcessingEngine for LendingEngine {
    fn name(&self) -> &str {
        LENDING_ENGINE_NAME
    }

    fn priority(&self) -> i32 {
        10
    }

    fn supports(&self, task: &ProcessingTask) -> bool {
        task.input_modality().is_text() && task.output_modality().is_text()
    }

    fn is_healthy(&self) -> bool {
        true
    }

    fn estimate_processing_time(&self, _task: &ProcessingTask) -> Duration {
        Duration::from_millis(50)
    }

    async fn process(&self, task: &ProcessingTask) -> Result<ProcessingResult, EngineError> {
        // Reached through the modality path; classify locally so the
        // engine still routes sensibly without orchestrator help.
        let intent = classify_by_rules(task.prompt().content());
        debug!(task_id = %task.id(), intent = %intent, "lending engine self-classified");
        self.process_with_intent(task, intent).await
    }

    fn intent_handler(&self) -> Option<&dyn IntentAwareEngine> {
        Some(self)
    }
}

#[async_trait]
impl IntentAwareEngine for LendingEngine {
    async fn process_with_intent(
        &self,
        task: &ProcessingTask,
        intent: UserIntent,
    ) -> Result<ProcessingResult, EngineError> {
        info!(task_id = %task.id(), intent = %intent, "lending engine dispatch");
        match intent {
            UserIntent::ViewAvailableItems => self.view_available().await,
            UserIntent::SearchItems => self.search_items(task).await,
            // Listing before acting shows what could be borrowed
            UserIntent::ActionList => self.view_available().await,
            UserIntent::ActionExecute => self.borrow_item(task).await,
            UserIntent::ReturnAction => self.return_borrowed(task).await,
            UserIntent::GeneralProcessing => self.general_help().await,
        }
    }
}
