//! LLM-backed intent recognition engine
//!
//! Asks the model for a JSON object naming the intent and any parameters,
//! then scans the reply tolerantly instead of requiring strict JSON. A
//! rule-based classifier and the deterministic extractor chain cover model
//! outages, so recognition never fails a request.

use std::collections::HashMap;
use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, info, warn};

use modalflow_core::extract::ExtractorChain;
use modalflow_core::intent::{classify_by_rules, IntentRecognition, NlpEngine, UserIntent};

use crate::client::{LlmClient, LlmRequest};

const MAX_LLM_OUTPUT_LOG_CHARS: usize = 2_000;
const MAX_PROMPT_LOG_CHARS: usize = 500;

/// Parameter keys accepted from model output. Anything else the model
/// volunteers is dropped.
const KNOWN_PARAMETER_KEYS: [&str; 5] =
    ["bookId", "bookTitle", "studentId", "studentName", "category"];

fn intent_tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#""intent"\s*:\s*"([^"]+)""#).expect("valid regex"))
}

fn key_value_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#""([^"]+)"\s*:\s*"([^"]+)""#).expect("valid regex"))
}

/// NLP engine delegating classification to an LLM
pub struct LlmNlpEngine<C: LlmClient> {
    client: C,
    model: String,
    temperature: f32,
    extractors: ExtractorChain,
}

impl<C: LlmClient> LlmNlpEngine<C> {
    pub fn new(client: C, model: impl Into<String>, temperature: f32) -> Self {
        Self {
            client,
            model: model.into(),
            temperature,
            extractors: ExtractorChain::standard(),
        }
    }

    fn build_request(&self, prompt: &str) -> LlmRequest {
        LlmRequest {
            system: build_system_prompt(),
            user: format!("User input:\n{}\n\nReturn JSON only.", prompt),
            model: self.model.clone(),
            temperature: self.temperature,
        }
    }

    /// Rule-only recognition, used when the model is unreachable
    fn recognize_by_rules(&self, prompt: &str) -> IntentRecognition {
        let intent = classify_by_rules(prompt);
        let parameters = self.extractors.extract(prompt);
        IntentRecognition::with_parameters(intent, parameters)
    }
}

fn build_system_prompt() -> String {
    let mut system = String::from(
        "You are an intent classifier for an item lending assistant. \
         Classify the user input into exactly one of these intents:\n",
    );
    for intent in UserIntent::all() {
        system.push_str("- ");
        system.push_str(intent.as_str());
        system.push_str(": ");
        system.push_str(intent_description(intent));
        system.push('\n');
    }
    system.push_str(
        "\nReturn ONLY a JSON object of shape \
         {\"intent\":\"TAG\",\"parameters\":{\"bookTitle\":\"...\",\"bookId\":\"...\",\
         \"studentId\":\"...\",\"studentName\":\"...\",\"category\":\"...\"}}. \
         Omit parameters that are not present in the input.",
    );
    system
}

fn intent_description(intent: UserIntent) -> &'static str {
    match intent {
        UserIntent::ViewAvailableItems => "browse the items currently available",
        UserIntent::SearchItems => "search for specific items by title or category",
        UserIntent::ActionList => "list items the user could borrow before acting",
        UserIntent::ActionExecute => "borrow a specific item now",
        UserIntent::ReturnAction => "give a borrowed item back",
        UserIntent::GeneralProcessing => "anything unrelated to lending",
    }
}

/// Pull the intent tag out of arbitrary model output
fn scan_intent(output: &str) -> Option<UserIntent> {
    let caps = intent_tag_re().captures(output)?;
    UserIntent::parse(&caps[1])
}

/// Pull known parameters out of arbitrary model output
fn scan_parameters(output: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();
    for caps in key_value_re().captures_iter(output) {
        let key = &caps[1];
        if KNOWN_PARAMETER_KEYS.contains(&key) {
            params.insert(key.to_string(), caps[2].to_string());
        }
    }
    params
}

fn truncate_for_log(input: &str, max_chars: usize) -> String {
    let char_count = input.chars().count();
    if char_count <= max_chars {
        return input.to_string();
    }
    let mut preview: String = input.chars().take(max_chars).collect();
    preview.push_str(&format!("... [truncated, total_chars={}]", char_count));
    preview
}

#[async_trait]
impl<C: LlmClient> NlpEngine for LlmNlpEngine<C> {
    async fn recognize(&self, prompt: &str) -> UserIntent {
        self.recognize_with_parameters(prompt).await.intent
    }

    async fn recognize_with_parameters(&self, prompt: &str) -> IntentRecognition {
        let request = self.build_request(prompt);
        let output = match self.client.complete(request).await {
            Ok(output) => output,
            Err(e) => {
                warn!(error = %e, "intent model unavailable, using rule classifier");
                return self.recognize_by_rules(prompt);
            }
        };
        if tracing::enabled!(tracing::Level::DEBUG) {
            debug!(
                llm_output = %truncate_for_log(&output, MAX_LLM_OUTPUT_LOG_CHARS),
                "raw intent model output"
            );
        }

        let intent = match scan_intent(&output) {
            Some(intent) => intent,
            None => {
                warn!(
                    output = %truncate_for_log(&output, MAX_PROMPT_LOG_CHARS),
                    "no intent tag in model output, using rule classifier"
                );
                classify_by_rules(prompt)
            }
        };

        // Model-extracted parameters first; deterministic extraction wins
        // on collision.
        let mut parameters = scan_parameters(&output);
        parameters.extend(self.extractors.extract(prompt));

        info!(
            intent = %intent,
            parameter_count = parameters.len(),
            "intent recognized"
        );
        IntentRecognition::with_parameters(intent, parameters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{LlmError, MockLlmClient};

    struct FailingClient;

    #[async_trait]
    impl LlmClient for FailingClient {
        async fn complete(&self, _request: LlmRequest) -> Result<String, LlmError> {
            Err(LlmError::Http("connection refused".to_string()))
        }
    }

    fn engine_with(response: &str) -> LlmNlpEngine<MockLlmClient> {
        LlmNlpEngine::new(
            MockLlmClient {
                response: response.to_string(),
            },
            "test-model",
            0.0,
        )
    }

    #[tokio::test]
    async fn test_clean_json_reply() {
        let engine = engine_with(
            r#"{"intent":"VIEW_AVAILABLE_ITEMS","parameters":{}}"#,
        );
        let recognition = engine
            .recognize_with_parameters("what books can I borrow")
            .await;
        assert_eq!(recognition.intent, UserIntent::ViewAvailableItems);
        assert!(recognition.parameters.is_empty());
    }

    #[tokio::test]
    async fn test_markdown_fenced_reply_is_scanned_tolerantly() {
        let engine = engine_with(
            "Sure! Here is the classification:\n```json\n{\"intent\": \"RETURN_ACTION\", \"parameters\": {\"bookTitle\": \"Dune\"}}\n```",
        );
        let recognition = engine.recognize_with_parameters("returning Dune").await;
        assert_eq!(recognition.intent, UserIntent::ReturnAction);
        assert_eq!(
            recognition.parameters.get("bookTitle").map(String::as_str),
            Some("Dune")
        );
    }

    #[tokio::test]
    async fn test_unknown_model_parameters_are_dropped() {
        let engine = engine_with(
            r#"{"intent":"SEARCH_ITEMS","parameters":{"category":"science fiction","mood":"curious"}}"#,
        );
        let recognition = engine.recognize_with_parameters("any sci-fi?").await;
        assert_eq!(
            recognition.parameters.get("category").map(String::as_str),
            Some("science fiction")
        );
        assert!(!recognition.parameters.contains_key("mood"));
    }

    #[tokio::test]
    async fn test_rule_extraction_wins_over_model_parameters() {
        let engine = engine_with(
            r#"{"intent":"ACTION_EXECUTE","parameters":{"studentId":"999"}}"#,
        );
        let recognition = engine
            .recognize_with_parameters("borrow 《Dune》, student id 2021001")
            .await;
        assert_eq!(recognition.intent, UserIntent::ActionExecute);
        assert_eq!(
            recognition.parameters.get("studentId").map(String::as_str),
            Some("2021001")
        );
    }

    #[tokio::test]
    async fn test_missing_intent_tag_falls_back_to_rules() {
        let engine = engine_with("I could not classify that, sorry.");
        let recognition = engine
            .recognize_with_parameters("I want to borrow 《Dune》")
            .await;
        assert_eq!(recognition.intent, UserIntent::ActionExecute);
        assert_eq!(
            recognition.parameters.get("bookTitle").map(String::as_str),
            Some("Dune")
        );
    }

    #[tokio::test]
    async fn test_client_error_falls_back_to_rules() {
        let engine = LlmNlpEngine::new(FailingClient, "test-model", 0.0);
        assert_eq!(
            engine.recognize("view all available books").await,
            UserIntent::ViewAvailableItems
        );
        let recognition = engine
            .recognize_with_parameters("我想借《算法导论》，学号为2021001")
            .await;
        assert_eq!(recognition.intent, UserIntent::ActionExecute);
        assert_eq!(
            recognition.parameters.get("studentId").map(String::as_str),
            Some("2021001")
        );
    }

    #[tokio::test]
    async fn test_unknown_intent_tag_falls_back_to_rules() {
        let engine = engine_with(r#"{"intent":"MAKE_COFFEE"}"#);
        assert_eq!(
            engine.recognize("algorithms textbook").await,
            UserIntent::SearchItems
        );
    }
}
