//! OpenAI-compatible `/v1/chat/completions` client.

use super::{ChatClient, ChatMessage, Completion, LlmError};
use crate::config::LlmSettings;
use reqwest::blocking::Client as HttpClient;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

const COMPLETIONS_PATH: &str = "/v1/chat/completions";

/// Append `/v1/chat/completions` unless the URL already ends with it.
pub fn normalize_url(url: &str) -> String {
    if url.ends_with(COMPLETIONS_PATH) {
        url.to_string()
    } else {
        format!("{}{}", url.trim_end_matches('/'), COMPLETIONS_PATH)
    }
}

pub struct OpenAiChatClient {
    client: HttpClient,
    url: String,
    api_key: Option<String>,
    model: String,
    temperature: f32,
    max_attempts: u32,
    retry_backoff: Duration,
}

impl OpenAiChatClient {
    pub fn new(settings: &LlmSettings, model: &str) -> Result<Self, LlmError> {
        let client =
            HttpClient::builder().timeout(Duration::from_secs(settings.timeout_secs)).build()?;
        Ok(Self {
            client,
            url: normalize_url(&settings.base_url),
            api_key: settings.api_key.clone().filter(|k| !k.trim().is_empty()),
            model: model.to_string(),
            temperature: settings.temperature,
            max_attempts: settings.max_retries.max(1),
            retry_backoff: Duration::from_secs(settings.retry_backoff_secs),
        })
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn send(&self, api_key: &str, messages: &[ChatMessage]) -> Result<Value, LlmError> {
        #[derive(Serialize)]
        struct Request<'a> {
            model: &'a str,
            messages: &'a [ChatMessage],
            temperature: f32,
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {api_key}"))
                .map_err(|e| LlmError::Decode(format!("invalid API key header: {e}")))?,
        );
        let req = Request { model: &self.model, messages, temperature: self.temperature };

        let response = self.client.post(&self.url).headers(headers).json(&req).send()?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(LlmError::Status { status: status.as_u16(), body });
        }
        response.json::<Value>().map_err(|e| LlmError::Decode(e.to_string()))
    }
}

impl ChatClient for OpenAiChatClient {
    fn model(&self) -> &str {
        &self.model
    }

    /// Server errors (5xx) are retried with a fixed pause; everything else
    /// fails on the spot.
    fn complete(&self, messages: &[ChatMessage]) -> Result<Completion, LlmError> {
        let api_key =
            self.api_key.as_deref().ok_or_else(|| LlmError::MissingApiKey(self.model.clone()))?;

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.send(api_key, messages) {
                Ok(raw) => {
                    let text = raw
                        .pointer("/choices/0/message/content")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string();
                    return Ok(Completion { text, raw });
                }
                Err(LlmError::Status { status, body })
                    if status >= 500 && attempt < self.max_attempts =>
                {
                    tracing::warn!(
                        "LLM server error {} from {}, retrying ({}/{}): {}",
                        status,
                        self.model,
                        attempt,
                        self.max_attempts,
                        body.chars().take(200).collect::<String>()
                    );
                    std::thread::sleep(self.retry_backoff);
                }
                Err(e) => {
                    tracing::error!("LLM call to {} failed: {}", self.model, e);
                    return Err(e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Serves the given `(status, body)` responses in order, one per connection.
    fn serve(responses: Vec<(u16, &'static str)>) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();

        std::thread::spawn(move || {
            for (status, body) in responses {
                let Ok((stream, _)) = listener.accept() else { return };
                counter.fetch_add(1, Ordering::SeqCst);

                let mut reader = BufReader::new(stream);
                let mut content_length = 0usize;
                loop {
                    let mut line = String::new();
                    if reader.read_line(&mut line).unwrap_or(0) == 0 || line == "\r\n" {
                        break;
                    }
                    if let Some(v) = line.to_ascii_lowercase().strip_prefix("content-length:") {
                        content_length = v.trim().parse().unwrap_or(0);
                    }
                }
                let mut request_body = vec![0; content_length];
                let _ = reader.read_exact(&mut request_body);

                let mut stream = reader.into_inner();
                let _ = write!(
                    stream,
                    "HTTP/1.1 {status} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
            }
        });

        (format!("http://{addr}"), hits)
    }

    fn client(url: &str, key: Option<&str>) -> OpenAiChatClient {
        let settings = LlmSettings {
            base_url: url.to_string(),
            api_key: key.map(str::to_string),
            timeout_secs: 5,
            ..LlmSettings::default()
        };
        OpenAiChatClient::new(&settings, "gpt-4o").unwrap().with_backoff(Duration::from_millis(10))
    }

    const OK_BODY: &str = r#"{"choices":[{"message":{"role":"assistant","content":"Use a Service."}}]}"#;

    #[test]
    fn test_normalize_url() {
        assert_eq!(normalize_url("https://api.x.com"), "https://api.x.com/v1/chat/completions");
        assert_eq!(normalize_url("https://api.x.com/"), "https://api.x.com/v1/chat/completions");
        assert_eq!(
            normalize_url("https://api.x.com/v1/chat/completions"),
            "https://api.x.com/v1/chat/completions"
        );
    }

    #[test]
    fn test_missing_key_fails_before_request() {
        let (url, hits) = serve(vec![(200, OK_BODY)]);
        let err = client(&url, None).complete(&[ChatMessage::user("hi")]).unwrap_err();
        assert!(matches!(err, LlmError::MissingApiKey(_)));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_server_errors_are_retried() {
        let (url, hits) = serve(vec![(500, "{}"), (503, "{}"), (200, OK_BODY)]);
        let completion =
            client(&url, Some("sk-test")).complete(&[ChatMessage::user("hi")]).unwrap();
        assert_eq!(completion.text, "Use a Service.");
        assert_eq!(completion.raw["choices"][0]["message"]["role"], "assistant");
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_retries_are_bounded() {
        let (url, hits) = serve(vec![(500, "{}"), (500, "{}"), (500, "{}"), (200, OK_BODY)]);
        let err = client(&url, Some("sk-test")).complete(&[ChatMessage::user("hi")]).unwrap_err();
        assert!(matches!(err, LlmError::Status { status: 500, .. }));
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_client_errors_are_not_retried() {
        let (url, hits) = serve(vec![(401, r#"{"error":"bad key"}"#), (200, OK_BODY)]);
        let err = client(&url, Some("sk-test")).complete(&[ChatMessage::user("hi")]).unwrap_err();
        match err {
            LlmError::Status { status, body } => {
                assert_eq!(status, 401);
                assert!(body.contains("bad key"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
