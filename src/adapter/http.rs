use reqwest::{Client, Response, StatusCode, Url};

use super::error::AdapterError;
use super::types::{
    JobSnapshot, SynthesizeRequest, TranscriptionRequest, TranslateRequest, TranslateResponse,
};
use super::ServiceAdapter;
use crate::config::GatewayConfig;

/// Audio container requested from the speech synthesis capability.
const OUTPUT_FORMAT: &str = "mp3";

/// HTTP client for a capability gateway exposing transcription, translation,
/// speech synthesis and object storage as JSON endpoints.
pub struct HttpGateway {
    api_key: String,
    client: Client,
    base_url: Url,
}

impl HttpGateway {
    pub fn new(config: &GatewayConfig) -> Result<Self, AdapterError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .build()?;
        Self::with_client(client, &config.url, config.api_key.clone())
    }

    /// Create a gateway client around an existing `reqwest::Client`.
    pub fn with_client(client: Client, base_url: &str, api_key: String) -> Result<Self, AdapterError> {
        let base_url =
            Url::parse(base_url).map_err(|e| AdapterError::Endpoint(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(AdapterError::Endpoint(base_url.to_string()));
        }
        Ok(Self {
            api_key,
            client,
            base_url,
        })
    }

    /// Build an endpoint URL; each segment is percent-encoded on its own, so
    /// keys containing `/` stay a single path segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, AdapterError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| AdapterError::Endpoint(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if self.api_key.is_empty() {
            builder
        } else {
            builder.header("x-api-key", &self.api_key)
        }
    }
}

async fn check_status(response: Response) -> Result<Response, AdapterError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "unknown error".to_string());
    Err(AdapterError::Api {
        status: status.as_u16(),
        message,
    })
}

impl ServiceAdapter for HttpGateway {
    #[tracing::instrument(skip(self, request), fields(job = %request.job_name))]
    async fn transcribe(&self, request: &TranscriptionRequest) -> Result<(), AdapterError> {
        let url = self.endpoint(&["transcription-jobs"])?;
        let response = self
            .authorize(self.client.post(url))
            .json(request)
            .send()
            .await?;

        // A job with this name already exists: the submission is idempotent.
        if response.status() == StatusCode::CONFLICT {
            tracing::debug!("transcription job already submitted");
            return Ok(());
        }
        check_status(response).await?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn poll_status(&self, job_name: &str) -> Result<JobSnapshot, AdapterError> {
        let url = self.endpoint(&["transcription-jobs", job_name])?;
        let response = self.authorize(self.client.get(url)).send().await?;
        let snapshot = check_status(response).await?.json::<JobSnapshot>().await?;
        Ok(snapshot)
    }

    #[tracing::instrument(skip(self, text), fields(chars = text.len()))]
    async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<String, AdapterError> {
        let url = self.endpoint(&["translate"])?;
        let body = TranslateRequest {
            text: text.to_string(),
            source_language_code: source_language.to_string(),
            target_language_code: target_language.to_string(),
        };
        let response = self
            .authorize(self.client.post(url))
            .json(&body)
            .send()
            .await?;
        let translated = check_status(response)
            .await?
            .json::<TranslateResponse>()
            .await?;
        Ok(translated.translated_text)
    }

    #[tracing::instrument(skip(self, text), fields(chars = text.len()))]
    async fn synthesize(&self, text: &str, voice: &str) -> Result<Vec<u8>, AdapterError> {
        let url = self.endpoint(&["synthesize"])?;
        let body = SynthesizeRequest {
            text: text.to_string(),
            voice_id: voice.to_string(),
            output_format: OUTPUT_FORMAT.to_string(),
        };
        let response = self
            .authorize(self.client.post(url))
            .json(&body)
            .send()
            .await?;
        let audio = check_status(response).await?.bytes().await?;
        Ok(audio.to_vec())
    }

    #[tracing::instrument(skip(self, body), fields(bytes = body.len()))]
    async fn put(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<(), AdapterError> {
        let url = self.endpoint(&["objects", bucket, key])?;
        let response = self
            .authorize(self.client.put(url))
            .header("content-type", "audio/mpeg")
            .body(body)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }
}
