use base64::Engine;
use base64::alphabet;
use base64::engine::DecodePaddingMode;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use keeper_core::{SecretDraft, SecretId, SecretKind, SecretRecord};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::AppError;

/// Standard alphabet, written unpadded, read with or without padding.
const CONTENT_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ValueEncoding {
    Utf8,
    #[default]
    Base64,
}

#[derive(Deserialize)]
pub struct CredentialsRequest {
    pub login: String,
    pub password: String,
}

#[derive(Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

#[derive(Deserialize)]
pub struct SecretRequest {
    pub kind: SecretKind,
    #[serde(default)]
    pub encoding: ValueEncoding,
    pub content: String,
    #[serde(default)]
    pub metadata: Option<String>,
}

impl SecretRequest {
    pub fn into_draft(self) -> Result<SecretDraft, AppError> {
        let content = match self.encoding {
            ValueEncoding::Utf8 => self.content.into_bytes(),
            ValueEncoding::Base64 => CONTENT_ENGINE
                .decode(self.content.as_bytes())
                .map_err(|err| AppError::bad_request(format!("content is not base64: {err}")))?,
        };

        let mut draft = SecretDraft::new(self.kind, content);
        draft.metadata = self.metadata;
        Ok(draft)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedResponse {
    pub id: SecretId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretResponse {
    pub id: SecretId,
    pub kind: SecretKind,
    pub encoding: ValueEncoding,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<SecretRecord> for SecretResponse {
    fn from(record: SecretRecord) -> Self {
        let (content, encoding) = encode_content(record.kind, record.content);
        Self {
            id: record.id,
            kind: record.kind,
            encoding,
            content,
            metadata: record.metadata,
            created_at: record.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListSecretsResponse {
    pub items: Vec<SecretResponse>,
}

impl ListSecretsResponse {
    pub fn from_records(records: Vec<SecretRecord>) -> Self {
        Self {
            items: records.into_iter().map(SecretResponse::from).collect(),
        }
    }
}

fn encode_content(kind: SecretKind, content: Vec<u8>) -> (String, ValueEncoding) {
    if kind == SecretKind::Binary {
        return (CONTENT_ENGINE.encode(content), ValueEncoding::Base64);
    }
    match String::from_utf8(content) {
        Ok(text) => (text, ValueEncoding::Utf8),
        Err(err) => (
            CONTENT_ENGINE.encode(err.into_bytes()),
            ValueEncoding::Base64,
        ),
    }
}

/// Decodes a response `content` field back into bytes.
pub fn decode_content(encoding: ValueEncoding, content: &str) -> Result<Vec<u8>, AppError> {
    match encoding {
        ValueEncoding::Utf8 => Ok(content.as_bytes().to_vec()),
        ValueEncoding::Base64 => CONTENT_ENGINE
            .decode(content.as_bytes())
            .map_err(|err| AppError::bad_request(format!("content is not base64: {err}"))),
    }
}
