use super::{CompletionRequest, CompletionResponse, CompletionResult, HistoryMessage, ModelBackend};
use crate::error::CompletionError;
use crate::store::Sender;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;

/// Gemini-style `generateContent` backend.
pub struct GeminiClient {
    base_url: String,
    api_key: String,
    client: Client,
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

impl GeminiClient {
    #[must_use]
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .connect_timeout(std::time::Duration::from_secs(10))
                .pool_max_idle_per_host(10)
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }

    fn build_request(request: &CompletionRequest) -> GenerateRequest {
        let mut contents = Vec::with_capacity(request.history.len() + 1);
        for entry in &request.history {
            contents.push(Content {
                role: Some(match entry.role {
                    Sender::Agent => "model",
                    Sender::User | Sender::System => "user",
                }),
                parts: vec![Part {
                    text: entry.text.clone(),
                }],
            });
        }
        contents.push(Content {
            role: Some("user"),
            parts: vec![Part {
                text: request.message.clone(),
            }],
        });

        GenerateRequest {
            system_instruction: request.system_prompt.as_ref().map(|text| Content {
                role: None,
                parts: vec![Part { text: text.clone() }],
            }),
            contents,
        }
    }
}

impl ModelBackend for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    fn generate<'a>(
        &'a self,
        model: &'a str,
        request: &'a CompletionRequest,
    ) -> Pin<Box<dyn Future<Output = CompletionResult> + Send + 'a>> {
        Box::pin(async move {
            let url = format!(
                "{}/v1beta/models/{}:generateContent?key={}",
                self.base_url, model, self.api_key
            );
            let body = Self::build_request(request);

            let response = self
                .client
                .post(&url)
                .json(&body)
                .send()
                .await
                .map_err(|e| CompletionError::Transport(e.to_string()))?;

            let status = response.status().as_u16();
            if !(200..300).contains(&status) {
                let body = response.text().await.unwrap_or_default();
                return Err(classify_http(status, &body, model));
            }

            let parsed: GenerateResponse = response
                .json()
                .await
                .map_err(|e| CompletionError::Unknown(format!("malformed response: {e}")))?;

            let text = parsed
                .candidates
                .first()
                .and_then(|c| c.content.as_ref())
                .map(|content| {
                    content
                        .parts
                        .iter()
                        .map(|p| p.text.as_str())
                        .collect::<Vec<&str>>()
                        .join("")
                })
                .unwrap_or_default();

            if text.is_empty() {
                return Err(CompletionError::Unknown(format!(
                    "model {model} returned no text candidates"
                )));
            }

            Ok(CompletionResponse { text })
        })
    }
}

/// Map a non-2xx completion response onto the classified taxonomy.
#[must_use]
pub fn classify_http(status: u16, body: &str, model: &str) -> CompletionError {
    let lower = body.to_ascii_lowercase();
    let model = model.to_string();

    if status == 401
        || status == 403
        || lower.contains("service_disabled")
        || lower.contains("permission_denied")
        || lower.contains("api key not valid")
    {
        return CompletionError::Auth { model };
    }

    if status == 429 || lower.contains("resource_exhausted") || lower.contains("quota") {
        // A zero-limit marker means the account has no quota at all, which is
        // terminal for every candidate; a plain 429 is transient.
        if lower.contains("limit: 0") || lower.contains("limit:0") {
            return CompletionError::QuotaExceeded { model };
        }
        return CompletionError::RateLimited { model };
    }

    if status == 404 || lower.contains("is not found") || lower.contains("not supported") {
        return CompletionError::ModelUnavailable { model };
    }

    CompletionError::Unknown(format!("status {status}: {body}"))
}
