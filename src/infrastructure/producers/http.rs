use crate::domain::services::content_producer::{
    GeneratedImage, GeneratedStory, ImageProducer, ImageRequest, ProducerError, SpeechProducer,
    SpeechRequest, StoryProducer, StoryRequest, SynthesizedAudio,
};
use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderMap, RETRY_AFTER};
use reqwest::{Client, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use time::Duration;
use tracing::warn;

const DEFAULT_SAMPLE_RATE: u32 = 24_000;
const SAMPLE_RATE_HEADER: &str = "x-sample-rate";

#[derive(Debug, Clone)]
pub struct HttpProducerConfig {
    pub story_url: String,
    pub speech_url: String,
    pub image_url: String,
    pub api_key: Option<String>,
    pub timeout: std::time::Duration,
}

/// Talks to the three generation providers over JSON/HTTP.
#[derive(Clone)]
pub struct HttpContentProducer {
    client: Client,
    config: HttpProducerConfig,
}

impl HttpContentProducer {
    pub fn new(config: HttpProducerConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<Response, ProducerError> {
        let mut request = self.client.post(url).json(body);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ProducerError::transient(format!("provider timed out: {e}"))
            } else {
                ProducerError::transient(format!("provider unreachable: {e}"))
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let headers = response.headers().clone();
        let body_text = response.text().await.unwrap_or_default();
        Err(classify_failure(status, &headers, &body_text))
    }

    async fn post_json<B: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<R, ProducerError> {
        self.post(url, body)
            .await?
            .json::<R>()
            .await
            .map_err(|e| ProducerError::terminal(format!("unreadable provider response: {e}")))
    }

    async fn post_bytes<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<(Vec<u8>, HeaderMap), ProducerError> {
        let response = self.post(url, body).await?;
        let headers = response.headers().clone();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ProducerError::transient(format!("provider body interrupted: {e}")))?;
        Ok((bytes.to_vec(), headers))
    }
}

/// Maps a non-2xx provider response onto the retry taxonomy.
pub fn classify_failure(status: StatusCode, headers: &HeaderMap, body_text: &str) -> ProducerError {
    let snippet: String = body_text.chars().take(200).collect();
    if status == StatusCode::TOO_MANY_REQUESTS {
        let message = format!("provider rate limited: {snippet}");
        return match retry_after_hint(headers, body_text) {
            Some(hint) => ProducerError::rate_limited(message, hint),
            None => ProducerError::transient(message),
        };
    }
    if status.is_server_error() || status == StatusCode::REQUEST_TIMEOUT {
        return ProducerError::transient(format!("provider error {}: {snippet}", status.as_u16()));
    }
    ProducerError::terminal(format!("provider rejected request {}: {snippet}", status.as_u16()))
}

/// Reads a retry hint from `Retry-After` (seconds) or a `retry_after_seconds` body field.
pub fn retry_after_hint(headers: &HeaderMap, body_text: &str) -> Option<Duration> {
    let from_header = headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());

    let from_body = || {
        let data = serde_json::from_str::<serde_json::Value>(body_text).ok()?;
        data.get("retry_after_seconds")
            .or_else(|| data.get("error").and_then(|e| e.get("retry_after_seconds")))
            .and_then(serde_json::Value::as_u64)
    };

    from_header
        .or_else(from_body)
        .map(|secs| Duration::seconds(i64::try_from(secs).unwrap_or(i64::MAX)))
}

fn content_type(headers: &HeaderMap, fallback: &str) -> String {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| fallback.to_string())
}

#[async_trait]
impl StoryProducer for HttpContentProducer {
    async fn generate_story(
        &self,
        request: &StoryRequest,
    ) -> Result<GeneratedStory, ProducerError> {
        let story: GeneratedStory = self.post_json(&self.config.story_url, request).await?;
        if story.segments.is_empty() {
            return Err(ProducerError::terminal("provider returned a story without segments"));
        }
        Ok(story)
    }
}

#[async_trait]
impl SpeechProducer for HttpContentProducer {
    async fn synthesize(&self, request: &SpeechRequest) -> Result<SynthesizedAudio, ProducerError> {
        let (bytes, headers) = self.post_bytes(&self.config.speech_url, request).await?;
        let sample_rate = headers
            .get(SAMPLE_RATE_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or_else(|| {
                warn!("speech_provider_missing_sample_rate");
                DEFAULT_SAMPLE_RATE
            });
        Ok(SynthesizedAudio {
            bytes,
            sample_rate,
            mime_type: content_type(&headers, "audio/pcm"),
        })
    }
}

#[async_trait]
impl ImageProducer for HttpContentProducer {
    async fn generate_image(
        &self,
        request: &ImageRequest,
    ) -> Result<GeneratedImage, ProducerError> {
        let (bytes, headers) = self.post_bytes(&self.config.image_url, request).await?;
        Ok(GeneratedImage {
            bytes,
            mime_type: content_type(&headers, "image/png"),
        })
    }
}
