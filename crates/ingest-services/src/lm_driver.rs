//! LMDriver (§4.4): drives one LM conversation for one (segment, annotator)
//! pair against a Gemini-style `generateContent`/`cachedContents` surface.
//!
//! Uses the same header-auth / client-timeout / tagged-enum-DTO
//! conventions as this codebase's other external-service clients, adapted
//! to Gemini's cached-content-plus-function-calling shape, since that is
//! what this domain's LM actually exposes.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const MAX_ITERATIONS: u32 = 10;

/// A tool the LM's function-call loop may invoke. `CatalogTool` backs both
/// `query_fine_units` and `create_fine_unit` (§4.4, §4.6).
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, name: &str, args: serde_json::Value) -> serde_json::Value;
}

/// Opaque handle to a server-side cached context (§4.3, GLOSSARY).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheHandle(pub String);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    pub args: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionResponseBody {
    pub name: String,
    pub response: serde_json::Value,
}

/// One message part. Untagged: a `text` field selects `Part::Text`, a
/// `functionCall` object selects `Part::FunctionCall`, a
/// `functionResponse` object selects `Part::FunctionResponse` (§4.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Part {
    FunctionCall {
        #[serde(rename = "functionCall")]
        function_call: FunctionCall,
    },
    FunctionResponse {
        #[serde(rename = "functionResponse")]
        function_response: FunctionResponseBody,
    },
    Text {
        text: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

impl Content {
    fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            parts: vec![Part::Text { text: text.into() }],
        }
    }

    fn function_responses(responses: Vec<FunctionResponseBody>) -> Self {
        Self {
            role: "user".to_string(),
            parts: responses
                .into_iter()
                .map(|r| Part::FunctionResponse { function_response: r })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
    #[serde(rename = "responseMimeType")]
    response_mime_type: &'static str,
    #[serde(rename = "responseSchema")]
    response_schema: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

fn permissive_safety_settings() -> Vec<SafetySetting> {
    [
        "HARM_CATEGORY_HARASSMENT",
        "HARM_CATEGORY_HATE_SPEECH",
        "HARM_CATEGORY_SEXUALLY_EXPLICIT",
        "HARM_CATEGORY_DANGEROUS_CONTENT",
    ]
    .into_iter()
    .map(|category| SafetySetting {
        category,
        threshold: "BLOCK_ONLY_HIGH",
    })
    .collect()
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "systemInstruction")]
    system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<serde_json::Value>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
    #[serde(rename = "safetySettings")]
    safety_settings: Vec<SafetySetting>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "cachedContent")]
    cached_content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct CreateCacheResponse {
    name: String,
}

pub struct LmDriver {
    client: reqwest::Client,
    api_base_url: String,
    api_key: String,
    model_name: String,
    call_deadline: Duration,
}

impl LmDriver {
    pub fn new(
        client: reqwest::Client,
        api_base_url: String,
        api_key: String,
        model_name: String,
        call_deadline: Duration,
    ) -> Self {
        Self {
            client,
            api_base_url,
            api_key,
            model_name,
            call_deadline,
        }
    }

    /// Create a server-side cache. Used by the orchestrator's three-level
    /// fallback (§4.3 step 1): `video_text` present selects the multimodal
    /// variant, absent selects the text-only variant.
    #[tracing::instrument(skip(self, text, system_instruction, tools))]
    pub async fn create_cached_content(
        &self,
        video_uri: Option<&str>,
        text: &str,
        system_instruction: &str,
        tools: &serde_json::Value,
        ttl: Duration,
    ) -> anyhow::Result<CacheHandle> {
        let mut parts = Vec::new();
        if let Some(uri) = video_uri {
            parts.push(serde_json::json!({"fileData": {"fileUri": uri, "mimeType": "video/mp4"}}));
        }
        parts.push(serde_json::json!({"text": text}));

        let url = format!(
            "{}/cachedContents?key={}",
            self.api_base_url, self.api_key
        );
        let body = serde_json::json!({
            "model": format!("models/{}", self.model_name),
            "contents": [{"role": "user", "parts": parts}],
            "systemInstruction": {"role": "system", "parts": [{"text": system_instruction}]},
            "tools": tools,
            "ttl": format!("{}s", ttl.as_secs()),
        });

        let resp: CreateCacheResponse = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(CacheHandle(resp.name))
    }

    /// Drive one (segment, annotator) conversation to completion (§4.4).
    ///
    /// `tools` and `system_instruction` are only sent in-request when `cache`
    /// is `None` — when a cache is present they were already baked into it.
    #[tracing::instrument(skip(self, instruction, tools, system_instruction, response_schema, tool_handler))]
    pub async fn run(
        &self,
        cache: Option<&CacheHandle>,
        instruction: &str,
        system_instruction: &str,
        tools: &serde_json::Value,
        response_schema: &serde_json::Value,
        tool_handler: &dyn ToolHandler,
    ) -> anyhow::Result<serde_json::Value> {
        let mut history = vec![Content::user_text(instruction)];

        for iteration in 0..MAX_ITERATIONS {
            let reply = self.send_once(cache, &history, tools, system_instruction, response_schema).await?;

            let Some(content) = reply.candidates.into_iter().next().and_then(|c| c.content) else {
                return Ok(serde_json::json!({ "annotations": [] }));
            };

            if content.parts.is_empty() {
                return Ok(serde_json::json!({ "annotations": [] }));
            }

            let function_calls: Vec<&FunctionCall> = content
                .parts
                .iter()
                .filter_map(|p| match p {
                    Part::FunctionCall { function_call } => Some(function_call),
                    _ => None,
                })
                .collect();

            if function_calls.is_empty() {
                let text = content
                    .parts
                    .iter()
                    .filter_map(|p| match p {
                        Part::Text { text } => Some(text.as_str()),
                        _ => None,
                    })
                    .collect::<Vec<_>>()
                    .join("");
                return parse_json_reply(&text);
            }

            let mut responses = Vec::with_capacity(function_calls.len());
            for call in &function_calls {
                let result = tool_handler.call(&call.name, call.args.clone()).await;
                responses.push(FunctionResponseBody {
                    name: call.name.clone(),
                    response: result,
                });
            }

            history.push(Content {
                role: "model".to_string(),
                parts: function_calls
                    .into_iter()
                    .cloned()
                    .map(|function_call| Part::FunctionCall { function_call })
                    .collect(),
            });
            history.push(Content::function_responses(responses));

            if iteration + 1 == MAX_ITERATIONS {
                tracing::warn!("lm function-call loop hit MAX_ITERATIONS; parsing last reply as final");
            }
        }

        // Iteration cap reached: one final call, parsed as the terminal reply.
        let reply = self.send_once(cache, &history, tools, system_instruction, response_schema).await?;
        let text = reply
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| {
                c.parts
                    .iter()
                    .filter_map(|p| match p {
                        Part::Text { text } => Some(text.clone()),
                        _ => None,
                    })
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();
        parse_json_reply(&text)
    }

    async fn send_once(
        &self,
        cache: Option<&CacheHandle>,
        history: &[Content],
        tools: &serde_json::Value,
        system_instruction: &str,
        response_schema: &serde_json::Value,
    ) -> anyhow::Result<GenerateContentResponse> {
        let request = GenerateContentRequest {
            contents: history.to_vec(),
            system_instruction: cache
                .is_none()
                .then(|| Content::user_text(system_instruction)),
            tools: cache.is_none().then(|| tools.clone()),
            generation_config: GenerationConfig {
                temperature: 0.0,
                max_output_tokens: 8192,
                response_mime_type: "application/json",
                response_schema: response_schema.clone(),
            },
            safety_settings: permissive_safety_settings(),
            cached_content: cache.map(|c| c.0.clone()),
        };

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.api_base_url, self.model_name, self.api_key
        );

        let call = self.client.post(&url).json(&request).send();
        let response = tokio::time::timeout(self.call_deadline, call)
            .await
            .map_err(|_| anyhow::anyhow!("lm call exceeded deadline of {:?}", self.call_deadline))??;

        Ok(response.error_for_status()?.json().await?)
    }
}

/// Parse the model's final text as JSON. On failure, strip markdown fences
/// and slice from the first `{` to the last `}` before retrying (§4.4).
fn parse_json_reply(text: &str) -> anyhow::Result<serde_json::Value> {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(text) {
        return Ok(value);
    }

    let stripped = text
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(stripped) {
        return Ok(value);
    }

    let start = stripped.find('{');
    let end = stripped.rfind('}');
    match (start, end) {
        (Some(s), Some(e)) if s <= e => {
            let sliced = &stripped[s..=e];
            Ok(serde_json::from_str(sliced)?)
        }
        _ => anyhow::bail!("lm reply is not valid JSON after fence-stripping: {text}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_json() {
        let value = parse_json_reply(r#"{"annotations": []}"#).unwrap();
        assert_eq!(value["annotations"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn strips_markdown_fences() {
        let text = "```json\n{\"annotations\": []}\n```";
        let value = parse_json_reply(text).unwrap();
        assert!(value["annotations"].is_array());
    }

    #[test]
    fn slices_from_first_brace_to_last() {
        let text = "Here is the result: {\"annotations\": []} -- done.";
        let value = parse_json_reply(text).unwrap();
        assert!(value["annotations"].is_array());
    }

    #[test]
    fn rejects_unparseable_text() {
        assert!(parse_json_reply("no json here at all").is_err());
    }
}
