//! Intent support strategies
//!
//! Capability predicates mapping an intent category to "does this engine
//! handle it". New domains register a new strategy instance instead of
//! touching the orchestrator.

use crate::engine::ProcessingEngine;
use crate::intent::IntentCategory;

/// Strategy contract: which engines serve which intent category
pub trait IntentSupportStrategy: Send + Sync {
    /// The intent category this strategy answers for
    fn category(&self) -> IntentCategory;

    /// Whether the given engine handles intents of this category
    fn supports_engine(&self, engine: &dyn ProcessingEngine) -> bool;
}

/// Lending intents are only served by engines exposing a per-intent
/// entry point.
pub struct LendingIntentStrategy;

impl IntentSupportStrategy for LendingIntentStrategy {
    fn category(&self) -> IntentCategory {
        IntentCategory::Lending
    }

    fn supports_engine(&self, engine: &dyn ProcessingEngine) -> bool {
        engine.intent_handler().is_some()
    }
}

/// The catch-all intent is served by every engine that is not a
/// specialized intent handler.
pub struct GeneralIntentStrategy;

impl IntentSupportStrategy for GeneralIntentStrategy {
    fn category(&self) -> IntentCategory {
        IntentCategory::General
    }

    fn supports_engine(&self, engine: &dyn ProcessingEngine) -> bool {
        engine.intent_handler().is_none()
    }
}

/// The default strategy set for the reference system
pub fn standard_strategies() -> Vec<std::sync::Arc<dyn IntentSupportStrategy>> {
    vec![
        std::sync::Arc::new(LendingIntentStrategy),
        std::sync::Arc::new(GeneralIntentStrategy),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineError, IntentAwareEngine};
    use crate::intent::UserIntent;
    use crate::types::{ProcessingResult, ProcessingTask};
    use async_trait::async_trait;
    use std::time::Duration;

    struct PlainEngine;

    #[async_trait]
    impl ProcessingEngine for PlainEngine {
        fn name(&self) -> &str {
            "plain"
        }
        fn priority(&self) -> i32 {
            50
        }
        fn supports(&self, _task: &ProcessingTask) -> bool {
            true
        }
        fn is_healthy(&self) -> bool {
            true
        }
        fn estimate_processing_time(&self, _task: &ProcessingTask) -> Duration {
            Duration::ZERO
        }
        async fn process(&self, _task: &ProcessingTask) -> Result<ProcessingResult, EngineError> {
            Err(EngineError::Backend("unused".to_string()))
        }
    }

    struct SpecializedEngine;

    #[async_trait]
    impl ProcessingEngine for SpecializedEngine {
        fn name(&self) -> &str {
            "specialized"
        }
        fn priority(&self) -> i32 {
            10
        }
        fn supports(&self, _task: &ProcessingTask) -> bool {
            true
        }
        fn is_healthy(&self) -> bool {
            true
        }
        fn estimate_processing_time(&self, _task: &ProcessingTask) -> Duration {
            Duration::ZERO
        }
        async fn process(&self, _task: &ProcessingTask) -> Result<ProcessingResult, EngineError> {
            Err(EngineError::Backend("unused".to_string()))
        }
        fn intent_handler(&self) -> Option<&dyn IntentAwareEngine> {
            Some(self)
        }
    }

    #[async_trait]
    impl IntentAwareEngine for SpecializedEngine {
        async fn process_with_intent(
            &self,
            _task: &ProcessingTask,
            _intent: UserIntent,
        ) -> Result<ProcessingResult, EngineError> {
            Err(EngineError::Backend("unused".to_string()))
        }
    }

    #[test]
    fn test_lending_strategy_matches_only_intent_handlers() {
        let strategy = LendingIntentStrategy;
        assert!(strategy.supports_engine(&SpecializedEngine));
        assert!(!strategy.supports_engine(&PlainEngine));
    }

    #[test]
    fn test_general_strategy_matches_everything_else() {
        let strategy = GeneralIntentStrategy;
        assert!(!strategy.supports_engine(&SpecializedEngine));
        assert!(strategy.supports_engine(&PlainEngine));
    }
}
