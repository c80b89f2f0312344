//! Client for the external AI collaborator (Gemini).
//!
//! Two stateless request/response operations, both safely retryable:
//! - `generate_page`: free-text description -> mapping of digit keys "1".."9"
//!   to paste text
//! - `refine_key`: current text + neighbor context + instruction -> a single
//!   replacement text
//!
//! Failures surface as `ExternalService` errors to the invoking UI action;
//! they never affect hotkey or store state.

use std::collections::BTreeMap;
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{PrompterError, Result};

const GEMINI_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-3-flash-preview:generateContent";

/// Hard cap on one round trip so a hung connection reports failure instead
/// of waiting forever.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct GeminiClient {
    api_key: String,
}

impl GeminiClient {
    /// Build a client from the stored API key. An empty key is a missing-key
    /// error up front rather than a doomed network call.
    pub fn new(api_key: &str) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(PrompterError::ExternalService(
                "API key is missing".to_string(),
            ));
        }
        Ok(Self {
            api_key: api_key.to_string(),
        })
    }

    /// Generate a page of bindings: digit-string keys "1".."9" mapped to the
    /// text to paste.
    pub fn generate_page(
        &self,
        description: &str,
        context: Option<&str>,
    ) -> Result<BTreeMap<String, String>> {
        let system_prompt = "You are a helper for a Numpad Macro app. The user will give you a topic or a list of items. \
            You must output a JSON object where keys are numbers \"1\" through \"9\" (or fewer) and values are the text to be pasted. \
            Example Output: { \"1\": \"Hello\", \"2\": \"World\" }. \
            Do NOT include markdown formatting like ```json. Just the raw JSON string.";

        let mut prompt = format!("User Request: {}", description);
        if let Some(context) = context {
            prompt.push_str("\n\nAdditional Context (Clipboard/Background): ");
            prompt.push_str(context);
        }

        let text = self.generate_content(&format!("{}\n\n{}", system_prompt, prompt))?;
        let clean = strip_code_fences(&text);

        let mapping: BTreeMap<String, String> = serde_json::from_str(&clean).map_err(|e| {
            PrompterError::ExternalService(format!("malformed page response: {}", e))
        })?;
        info!(keys = mapping.len(), "Generated page mapping");
        Ok(mapping)
    }

    /// Refine a single key's text. Neighbors are passed for context only.
    pub fn refine_key(
        &self,
        current: &str,
        neighbors: &BTreeMap<String, String>,
        instruction: Option<&str>,
        context: Option<&str>,
    ) -> Result<String> {
        let system_prompt = "You are a helper for a Numpad Macro app. You are refining a SINGLE key's prompt. \
            The user will provide the current prompt (if any), prompts of neighboring keys (for context), and a specific instruction. \
            You must output ONLY the raw text for the new prompt. No JSON, no Quotes, no Markdown. Just the text to paste.";

        let neighbors_json = serde_json::to_string(neighbors)
            .map_err(|e| PrompterError::ExternalService(e.to_string()))?;

        let mut prompt = format!("Current Prompt: \"{}\"\n", current);
        prompt.push_str(&format!("Neighboring Keys: {}\n", neighbors_json));
        if let Some(instruction) = instruction {
            prompt.push_str(&format!("User Instruction: {}\n", instruction));
        }
        if let Some(context) = context {
            prompt.push_str(&format!("Clipboard/Context: {}\n", context));
        }
        prompt.push_str("\nGenerate the new prompt text for this key.");

        let text = self.generate_content(&format!("{}\n\n{}", system_prompt, prompt))?;
        Ok(text.trim().to_string())
    }

    /// One generateContent round trip: send the combined prompt, extract
    /// `candidates[0].content.parts[0].text`.
    fn generate_content(&self, prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "contents": [{
                "parts": [{ "text": prompt }]
            }]
        });

        debug!(prompt_len = prompt.len(), "Sending Gemini request");
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(REQUEST_TIMEOUT))
            .build()
            .into();
        let response = agent
            .post(&format!("{}?key={}", GEMINI_URL, self.api_key))
            .header("Content-Type", "application/json")
            .send_json(&body)
            .map_err(|e| PrompterError::ExternalService(format!("request failed: {}", e)))?;

        let response_json: serde_json::Value = response
            .into_body()
            .read_json()
            .map_err(|e| PrompterError::ExternalService(format!("unreadable response: {}", e)))?;

        response_json
            .get("candidates")
            .and_then(|c| c.as_array())
            .and_then(|arr| arr.first())
            .and_then(|candidate| candidate.get("content"))
            .and_then(|content| content.get("parts"))
            .and_then(|parts| parts.as_array())
            .and_then(|arr| arr.first())
            .and_then(|part| part.get("text"))
            .and_then(|t| t.as_str())
            .map(str::to_string)
            .ok_or_else(|| {
                PrompterError::ExternalService("response has no candidate text".to_string())
            })
    }
}

/// Strip markdown code fences the model sometimes emits despite
/// instructions.
pub fn strip_code_fences(text: &str) -> String {
    text.replace("```json", "").replace("```", "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_api_key_is_rejected_up_front() {
        assert!(matches!(
            GeminiClient::new(""),
            Err(PrompterError::ExternalService(_))
        ));
        assert!(matches!(
            GeminiClient::new("   "),
            Err(PrompterError::ExternalService(_))
        ));
        assert!(GeminiClient::new("key").is_ok());
    }

    #[test]
    fn strips_json_fences() {
        assert_eq!(
            strip_code_fences("```json\n{\"1\": \"Hello\"}\n```"),
            "{\"1\": \"Hello\"}"
        );
        assert_eq!(strip_code_fences("{\"1\": \"x\"}"), "{\"1\": \"x\"}");
    }

    #[test]
    fn fenced_page_response_parses_after_stripping() {
        let clean = strip_code_fences("```json\n{\"1\": \"Hello\", \"2\": \"World\"}\n```");
        let mapping: BTreeMap<String, String> = serde_json::from_str(&clean).unwrap();
        assert_eq!(mapping.get("1").unwrap(), "Hello");
        assert_eq!(mapping.get("2").unwrap(), "World");
    }
}
