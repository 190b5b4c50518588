//! LLM-backed advisor over an OpenAI-compatible chat completions API

use std::collections::BTreeMap;
use std::env;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::{Advisor, LevelProposal, PlanningProblem};
use crate::domain::CompressionLevel;
use crate::error::{AdvisoryError, AdvisoryResult};

/// Name of the function tool the model answers through
const ASSIGN_TOOL: &str = "assign_levels";

/// Configuration for the LLM advisor
#[derive(Debug, Clone)]
pub struct LlmAdvisorConfig {
    /// Model to plan with
    pub model: String,
    /// API base URL (OpenAI-compatible)
    pub base_url: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    /// Round-trip timeout in seconds
    pub timeout_secs: u64,
}

impl Default for LlmAdvisorConfig {
    fn default() -> Self {
        Self {
            model: "o3-mini".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_secs: 120,
        }
    }
}

/// Advisor that asks a language model for a level assignment.
///
/// One blocking round trip per planning round. The response must come back
/// through the `assign_levels` function tool; anything else is malformed.
pub struct LlmAdvisor {
    client: reqwest::Client,
    api_key: String,
    config: LlmAdvisorConfig,
}

impl LlmAdvisor {
    /// Create an advisor. Fails when the API key variable is unset, which
    /// callers treat as "advisor unavailable".
    pub fn new(config: LlmAdvisorConfig) -> AdvisoryResult<Self> {
        let api_key = env::var(&config.api_key_env).map_err(|_| {
            AdvisoryError::Service(format!(
                "environment variable {} not set",
                config.api_key_env
            ))
        })?;

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            config,
        })
    }

    fn build_prompt(problem: &PlanningProblem) -> String {
        let level_table = CompressionLevel::ALL
            .iter()
            .map(|level| format!("- {}: {}", level.name(), level.description()))
            .collect::<Vec<_>>()
            .join("\n");

        let file_list = problem
            .files
            .iter()
            .map(|f| {
                if f.keep {
                    format!("{} - {} tokens (do not compress)", f.path.display(), f.baseline_tokens)
                } else {
                    format!("{} - {} tokens", f.path.display(), f.baseline_tokens)
                }
            })
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            "You are a code compression strategist. Create a compression plan that fits \
             within the token budget.\n\n\
             Input:\n\
             - Total files: {}\n\
             - Total tokens: {}\n\
             - Budget: {} tokens maximum\n\n\
             Files to plan compression for:\n{}\n\n\
             Compression levels:\n{}\n\n\
             Consider file importance based on paths (core files vs tests vs interfaces). \
             Assign exactly one level to every file using the {} function. Every listed \
             file must appear exactly once.",
            problem.files.len(),
            problem.total_tokens,
            problem.headroom,
            file_list,
            level_table,
            ASSIGN_TOOL,
        )
    }

    fn build_request_body(&self, problem: &PlanningProblem) -> Value {
        let level_names: Vec<&str> = CompressionLevel::ALL.iter().map(|l| l.name()).collect();

        json!({
            "model": self.config.model,
            "messages": [
                { "role": "system", "content": "You are a code compression strategist." },
                { "role": "user", "content": Self::build_prompt(problem) },
            ],
            "tools": [{
                "type": "function",
                "function": {
                    "name": ASSIGN_TOOL,
                    "description": "Assign a compression level to every file in the plan",
                    "parameters": {
                        "type": "object",
                        "properties": {
                            "files": {
                                "type": "array",
                                "items": {
                                    "type": "object",
                                    "properties": {
                                        "path": { "type": "string" },
                                        "level": { "type": "string", "enum": level_names }
                                    },
                                    "required": ["path", "level"]
                                }
                            }
                        },
                        "required": ["files"]
                    }
                }
            }],
            "tool_choice": "auto",
        })
    }

    fn parse_response(body: ChatResponse) -> AdvisoryResult<LevelProposal> {
        let message = body
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or_else(|| AdvisoryError::Malformed("response has no choices".to_string()))?;

        let tool_call = message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .next()
            .ok_or_else(|| {
                AdvisoryError::Malformed("model did not call the assignment tool".to_string())
            })?;

        if tool_call.function.name != ASSIGN_TOOL {
            return Err(AdvisoryError::Malformed(format!(
                "unexpected tool '{}'",
                tool_call.function.name
            )));
        }

        let args: AssignArguments =
            serde_json::from_str(&tool_call.function.arguments).map_err(|e| {
                AdvisoryError::Malformed(format!("tool arguments did not parse: {}", e))
            })?;

        let mut assignments = BTreeMap::new();
        for entry in args.files {
            let level: CompressionLevel = entry.level.parse().map_err(|e: String| {
                AdvisoryError::Malformed(format!("bad level for {}: {}", entry.path, e))
            })?;
            if assignments.insert(entry.path.clone().into(), level).is_some() {
                return Err(AdvisoryError::Malformed(format!(
                    "path {} assigned twice",
                    entry.path
                )));
            }
        }

        Ok(LevelProposal { assignments })
    }
}

#[async_trait]
impl Advisor for LlmAdvisor {
    fn name(&self) -> &str {
        "llm"
    }

    async fn propose(&self, problem: &PlanningProblem) -> AdvisoryResult<LevelProposal> {
        let body = self.build_request_body(problem);
        debug!(
            model = %self.config.model,
            files = problem.files.len(),
            headroom = problem.headroom,
            "submitting planning problem"
        );

        let request = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send();

        let response = tokio::time::timeout(Duration::from_secs(self.config.timeout_secs), request)
            .await
            .map_err(|_| AdvisoryError::Timeout(self.config.timeout_secs))?
            .map_err(|e| AdvisoryError::Service(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AdvisoryError::Service(format!(
                "HTTP {}: {}",
                status.as_u16(),
                text
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| AdvisoryError::Malformed(e.to_string()))?;

        Self::parse_response(parsed)
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    tool_calls: Option<Vec<ToolCallEntry>>,
}

#[derive(Debug, Deserialize)]
struct ToolCallEntry {
    function: FunctionCall,
}

#[derive(Debug, Deserialize)]
struct FunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct AssignArguments {
    files: Vec<AssignEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct AssignEntry {
    path: String,
    level: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisory::ProblemFile;
    use std::path::PathBuf;

    fn response_with_arguments(arguments: &str) -> ChatResponse {
        ChatResponse {
            choices: vec![Choice {
                message: ChoiceMessage {
                    tool_calls: Some(vec![ToolCallEntry {
                        function: FunctionCall {
                            name: ASSIGN_TOOL.to_string(),
                            arguments: arguments.to_string(),
                        },
                    }]),
                },
            }],
        }
    }

    #[test]
    fn test_parse_valid_tool_call() {
        let response = response_with_arguments(
            r#"{"files": [{"path": "a.rs", "level": "medium"}, {"path": "b.rs", "level": "none"}]}"#,
        );
        let proposal = LlmAdvisor::parse_response(response).unwrap();
        assert_eq!(
            proposal.assignments.get(&PathBuf::from("a.rs")),
            Some(&CompressionLevel::Medium)
        );
        assert_eq!(proposal.assignments.len(), 2);
    }

    #[test]
    fn test_missing_tool_call_is_malformed() {
        let response = ChatResponse {
            choices: vec![Choice {
                message: ChoiceMessage { tool_calls: None },
            }],
        };
        assert!(matches!(
            LlmAdvisor::parse_response(response),
            Err(AdvisoryError::Malformed(_))
        ));
    }

    #[test]
    fn test_duplicate_path_is_malformed() {
        let response = response_with_arguments(
            r#"{"files": [{"path": "a.rs", "level": "trim"}, {"path": "a.rs", "level": "max"}]}"#,
        );
        assert!(matches!(
            LlmAdvisor::parse_response(response),
            Err(AdvisoryError::Malformed(_))
        ));
    }

    #[test]
    fn test_unknown_level_is_malformed() {
        let response =
            response_with_arguments(r#"{"files": [{"path": "a.rs", "level": "tiny"}]}"#);
        assert!(matches!(
            LlmAdvisor::parse_response(response),
            Err(AdvisoryError::Malformed(_))
        ));
    }

    #[test]
    fn test_prompt_lists_files_and_budget() {
        let problem = PlanningProblem::new(
            vec![ProblemFile {
                path: PathBuf::from("src/lib.rs"),
                baseline_tokens: 420,
                keep: false,
            }],
            900,
        );
        let prompt = LlmAdvisor::build_prompt(&problem);
        assert!(prompt.contains("src/lib.rs - 420 tokens"));
        assert!(prompt.contains("900 tokens maximum"));
        assert!(prompt.contains("trim"));
    }
}
