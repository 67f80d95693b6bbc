//! Intent taxonomy and recognition
//!
//! Classifies free text into a small closed set of intents. The recognizer
//! honors an explicit `intent` task parameter as an override, otherwise it
//! delegates to an [`NlpEngine`] backend. A deterministic keyword classifier
//! ([`classify_by_rules`]) backs the model-based engine so classification
//! never fails a request.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::ProcessingTask;

/// Closed intent taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserIntent {
    /// Browse the items currently available
    ViewAvailableItems,
    /// Search for specific items
    SearchItems,
    /// Browse before acting (first step of a two-step action)
    ActionList,
    /// Perform the action now
    ActionExecute,
    /// Give an item back
    ReturnAction,
    /// Default catch-all for everything else
    GeneralProcessing,
}

impl UserIntent {
    /// Stable wire tag for this intent
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ViewAvailableItems => "VIEW_AVAILABLE_ITEMS",
            Self::SearchItems => "SEARCH_ITEMS",
            Self::ActionList => "ACTION_LIST",
            Self::ActionExecute => "ACTION_EXECUTE",
            Self::ReturnAction => "RETURN_ACTION",
            Self::GeneralProcessing => "GENERAL_PROCESSING",
        }
    }

    /// Parse a wire tag, case-insensitively. Unknown tags yield `None`;
    /// callers decide whether to default to [`UserIntent::GeneralProcessing`].
    pub fn parse(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_uppercase().as_str() {
            "VIEW_AVAILABLE_ITEMS" => Some(Self::ViewAvailableItems),
            "SEARCH_ITEMS" => Some(Self::SearchItems),
            "ACTION_LIST" => Some(Self::ActionList),
            "ACTION_EXECUTE" => Some(Self::ActionExecute),
            "RETURN_ACTION" => Some(Self::ReturnAction),
            "GENERAL_PROCESSING" => Some(Self::GeneralProcessing),
            _ => None,
        }
    }

    /// All tags, in taxonomy order
    pub fn all() -> [UserIntent; 6] {
        [
            Self::ViewAvailableItems,
            Self::SearchItems,
            Self::ActionList,
            Self::ActionExecute,
            Self::ReturnAction,
            Self::GeneralProcessing,
        ]
    }

    /// The routing category this intent belongs to
    pub fn category(&self) -> IntentCategory {
        match self {
            Self::GeneralProcessing => IntentCategory::General,
            _ => IntentCategory::Lending,
        }
    }
}

impl std::fmt::Display for UserIntent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Routing category used by intent support strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntentCategory {
    /// Domain-specific intents handled by the specialized lending engine
    Lending,
    /// Everything else
    General,
}

/// Classification outcome: the intent plus any extracted parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentRecognition {
    pub intent: UserIntent,
    pub parameters: HashMap<String, String>,
}

impl IntentRecognition {
    pub fn of(intent: UserIntent) -> Self {
        Self {
            intent,
            parameters: HashMap::new(),
        }
    }

    pub fn with_parameters(intent: UserIntent, parameters: HashMap<String, String>) -> Self {
        Self { intent, parameters }
    }
}

/// NLP backend contract
///
/// Implementations must be infallible from the caller's perspective:
/// backend outages are recovered internally (rule-based fallback), never
/// surfaced as request errors.
#[async_trait]
pub trait NlpEngine: Send + Sync {
    /// Classify free text into an intent
    async fn recognize(&self, prompt: &str) -> UserIntent;

    /// Classify free text and extract structured parameters
    async fn recognize_with_parameters(&self, prompt: &str) -> IntentRecognition;
}

/// Intent recognizer - override check plus backend delegation
pub struct IntentRecognizer {
    nlp: std::sync::Arc<dyn NlpEngine>,
}

impl IntentRecognizer {
    pub fn new(nlp: std::sync::Arc<dyn NlpEngine>) -> Self {
        Self { nlp }
    }

    /// Classify the task's prompt into an intent.
    ///
    /// An explicit `intent` task parameter matching a known tag wins over
    /// the NLP backend (manual override escape hatch).
    pub async fn classify(&self, task: &ProcessingTask) -> UserIntent {
        if let Some(intent) = self.intent_override(task) {
            return intent;
        }
        self.nlp.recognize(task.prompt().content()).await
    }

    /// Classify and extract parameters in one pass
    pub async fn classify_with_parameters(&self, task: &ProcessingTask) -> IntentRecognition {
        if let Some(intent) = self.intent_override(task) {
            // Carry the remaining task parameters along, minus the override key
            let mut parameters = task.parameters().clone();
            parameters.remove("intent");
            return IntentRecognition::with_parameters(intent, parameters);
        }
        self.nlp
            .recognize_with_parameters(task.prompt().content())
            .await
    }

    fn intent_override(&self, task: &ProcessingTask) -> Option<UserIntent> {
        let tag = task.parameter("intent").filter(|t| !t.is_empty())?;
        let intent = UserIntent::parse(tag);
        if intent.is_none() {
            debug!(tag, "ignoring unknown intent override");
        }
        intent
    }
}

/// Deterministic keyword classifier used as the model fallback.
///
/// Tie break: action verb without a browse verb means execute; action plus
/// browse means list-before-acting; a return verb means return; browse
/// verbs alone mean view-available; anything else is a search.
pub fn classify_by_rules(prompt: &str) -> UserIntent {
    let lower = prompt.to_lowercase();
    let has_action = contains_any(&lower, &["borrow", "lend me", "check out", "借阅", "借"]);
    let has_browse = contains_any(
        &lower,
        &[
            "view", "show", "list", "browse", "see", "look at", "available", "查看", "列表",
            "看看", "有哪些",
        ],
    );
    let has_return = contains_any(&lower, &["return", "give back", "归还", "还"]);

    if has_action && !has_browse {
        UserIntent::ActionExecute
    } else if has_action && has_browse {
        UserIntent::ActionList
    } else if has_return {
        UserIntent::ReturnAction
    } else if has_browse {
        UserIntent::ViewAvailableItems
    } else {
        UserIntent::SearchItems
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}
