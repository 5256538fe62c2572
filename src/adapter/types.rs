//! Tipos de dados trocados com o gateway de capacidades.
//!
//! Todas as structs derivam `Serialize` e `Deserialize` para conversão JSON
//! conforme o formato esperado pelos endpoints de transcrição, tradução e
//! síntese de voz.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Pedido de criação de um job de transcrição assíncrono.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptionRequest {
    /// Nome do job, derivado da chave original (`{key}_job`).
    pub job_name: String,
    /// URI do áudio de entrada (`s3://{bucket}/{key}`).
    pub media_uri: String,
    /// Bucket onde a transcrição é gravada.
    pub output_bucket: String,
    /// Chave de saída da transcrição (`transcriptions/{job}.json`).
    pub output_key: String,
    /// Pede ao serviço para identificar o idioma falado.
    pub identify_language: bool,
}

/// Status reportado por um job de transcrição.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TranscriptionStatus {
    InProgress,
    Completed,
    Failed,
    Unknown,
}

impl TranscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TranscriptionStatus::InProgress => "IN_PROGRESS",
            TranscriptionStatus::Completed => "COMPLETED",
            TranscriptionStatus::Failed => "FAILED",
            TranscriptionStatus::Unknown => "UNKNOWN",
        }
    }

    /// Converte o status textual do serviço. `QUEUED` conta como em andamento;
    /// qualquer outro valor não reconhecido vira `Unknown`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "IN_PROGRESS" | "QUEUED" => TranscriptionStatus::InProgress,
            "COMPLETED" => TranscriptionStatus::Completed,
            "FAILED" => TranscriptionStatus::Failed,
            _ => TranscriptionStatus::Unknown,
        }
    }
}

impl fmt::Display for TranscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for TranscriptionStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TranscriptionStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(TranscriptionStatus::parse(&raw))
    }
}

/// Fotografia de um job de transcrição retornada por `poll_status`.
///
/// `transcript` e `language_code` só vêm preenchidos quando o status é
/// `COMPLETED`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub status: TranscriptionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_code: Option<String>,
}

impl JobSnapshot {
    pub fn in_progress() -> Self {
        Self {
            status: TranscriptionStatus::InProgress,
            transcript: None,
            language_code: None,
        }
    }

    pub fn completed(transcript: impl Into<String>, language_code: impl Into<String>) -> Self {
        Self {
            status: TranscriptionStatus::Completed,
            transcript: Some(transcript.into()),
            language_code: Some(language_code.into()),
        }
    }

    pub fn failed() -> Self {
        Self {
            status: TranscriptionStatus::Failed,
            transcript: None,
            language_code: None,
        }
    }
}

/// Corpo do pedido de tradução.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslateRequest {
    pub text: String,
    pub source_language_code: String,
    pub target_language_code: String,
}

/// Resposta do endpoint de tradução.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslateResponse {
    pub translated_text: String,
}

/// Corpo do pedido de síntese de voz. A resposta é o áudio bruto.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesizeRequest {
    pub text: String,
    pub voice_id: String,
    pub output_format: String,
}
