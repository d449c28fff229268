// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Gemini `generateContent` client with function calling.

use super::{Completion, CompletionClient, CompletionRequest, Grounding, ToolDeclaration, ToolInvocation};
use crate::error::AssistantError;
use crate::utils::http_client;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, info};

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    system_instruction: Content,
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool<'a>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_call: Option<FunctionCall>,
}

#[derive(Debug, Serialize, Deserialize)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    args: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
enum Tool<'a> {
    FunctionDeclarations(&'a [ToolDeclaration]),
    GoogleSearch {},
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: Option<u32>,
    #[serde(default)]
    candidates_token_count: Option<u32>,
}

impl GeminiClient {
    pub fn new(api_key: &str, model: &str, timeout: Duration) -> Result<Self, AssistantError> {
        if api_key.trim().is_empty() {
            return Err(AssistantError::MissingApiKey);
        }
        Ok(Self {
            client: http_client(timeout)?,
            api_key: api_key.trim().to_string(),
            model: model.to_string(),
            base_url: BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

fn build_body(request: &CompletionRequest) -> GenerateRequest<'_> {
    let tools = match &request.grounding {
        Grounding::Tools(decls) if decls.is_empty() => Vec::new(),
        Grounding::Tools(decls) => vec![Tool::FunctionDeclarations(decls)],
        Grounding::Search => vec![Tool::GoogleSearch {}],
    };
    GenerateRequest {
        system_instruction: Content {
            role: None,
            parts: vec![Part {
                text: Some(request.system_instruction.clone()),
                ..Part::default()
            }],
        },
        contents: vec![Content {
            role: Some("user".into()),
            parts: vec![
                Part {
                    text: Some(format!("CONTEXT:\n{}", request.context)),
                    ..Part::default()
                },
                Part {
                    text: Some(request.utterance.clone()),
                    ..Part::default()
                },
            ],
        }],
        tools,
    }
}

fn into_completion(response: GenerateResponse) -> Result<Completion, AssistantError> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| AssistantError::InvalidResponse("no candidates in response".into()))?;
    if let Some(reason) = candidate.finish_reason.as_deref() {
        debug!("finish reason: {}", reason);
    }
    let parts = candidate.content.map(|c| c.parts).unwrap_or_default();

    let mut texts = Vec::new();
    let mut calls = Vec::new();
    for part in parts {
        if let Some(text) = part.text {
            texts.push(text);
        }
        if let Some(call) = part.function_call {
            calls.push(ToolInvocation {
                name: call.name,
                args: call.args,
            });
        }
    }
    let text = if texts.is_empty() {
        None
    } else {
        Some(texts.join(""))
    };
    Ok(Completion { text, calls })
}

#[async_trait]
impl CompletionClient for GeminiClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, AssistantError> {
        let url = format!("{}/{}:generateContent", self.base_url, self.model);
        debug!(model = %self.model, "sending completion request");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&build_body(request))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            error!("Gemini API error: {} - {}", status, body);
            return Err(AssistantError::Api(format!("HTTP {}: {}", status, body)));
        }

        let parsed: GenerateResponse = serde_json::from_str(&body).map_err(|e| {
            error!("Failed to parse Gemini response: {}", e);
            AssistantError::InvalidResponse(e.to_string())
        })?;
        if let Some(usage) = &parsed.usage_metadata {
            info!(
                "Gemini usage - prompt: {:?} tokens, response: {:?} tokens",
                usage.prompt_token_count, usage.candidates_token_count
            );
        }
        into_completion(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_body_carries_function_declarations() {
        let request = CompletionRequest {
            system_instruction: "sys".into(),
            context: "ctx".into(),
            utterance: "spent 150 on dinner".into(),
            grounding: Grounding::Tools(super::super::tools::declarations()),
        };
        let body = serde_json::to_value(build_body(&request)).unwrap();
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "sys");
        assert_eq!(body["contents"][0]["parts"][1]["text"], "spent 150 on dinner");
        let decls = body["tools"][0]["functionDeclarations"].as_array().unwrap();
        assert_eq!(decls.len(), 5);
        assert_eq!(decls[0]["name"], "createTransaction");
    }

    #[test]
    fn search_grounding_declares_no_functions() {
        let request = CompletionRequest {
            system_instruction: "sys".into(),
            context: String::new(),
            utterance: "is a CDB better than savings?".into(),
            grounding: Grounding::Search,
        };
        let body = serde_json::to_value(build_body(&request)).unwrap();
        assert_eq!(body["tools"], json!([{ "googleSearch": {} }]));
    }

    #[test]
    fn response_parts_split_into_text_and_calls() {
        let raw = json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [
                        { "text": "Done!" },
                        { "functionCall": { "name": "createTransaction",
                            "args": { "amount": 150, "category": "Jantar", "type": "expense" } } }
                    ]
                },
                "finishReason": "STOP"
            }]
        });
        let parsed: GenerateResponse = serde_json::from_value(raw).unwrap();
        let completion = into_completion(parsed).unwrap();
        assert_eq!(completion.text.as_deref(), Some("Done!"));
        assert_eq!(completion.calls.len(), 1);
        assert_eq!(completion.calls[0].args["amount"], 150);
    }

    #[test]
    fn empty_candidates_is_invalid() {
        let parsed: GenerateResponse = serde_json::from_value(json!({ "candidates": [] })).unwrap();
        assert!(matches!(
            into_completion(parsed),
            Err(AssistantError::InvalidResponse(_))
        ));
    }
}
