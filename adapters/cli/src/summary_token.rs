use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use spellfall_core::GameSummary;
use thiserror::Error;

const TOKEN_DOMAIN: &str = "spellfall";
const TOKEN_VERSION: &str = "v1";
/// Separates the domain, version and payload segments.
const FIELD_DELIMITER: char = ':';

/// Errors that can occur while encoding or decoding summary tokens.
#[derive(Debug, Error)]
pub(crate) enum SummaryTokenError {
    /// The provided string was empty or contained only whitespace.
    #[error("summary token was empty")]
    EmptyPayload,
    /// The token did not contain a version segment.
    #[error("summary token is missing the version")]
    MissingVersion,
    /// The token did not include the payload segment.
    #[error("summary token is missing the payload")]
    MissingPayload,
    /// The token used an unexpected prefix segment.
    #[error("summary prefix '{0}' is not supported")]
    InvalidPrefix(String),
    /// The token used an unsupported version identifier.
    #[error("summary version '{0}' is not supported")]
    UnsupportedVersion(String),
    /// The base64 payload could not be decoded.
    #[error("could not decode summary payload: {0}")]
    InvalidEncoding(#[source] base64::DecodeError),
    /// The payload could not be serialised or deserialised.
    #[error("could not convert summary payload: {0}")]
    InvalidPayload(#[source] serde_json::Error),
}

/// Encodes a summary into a single line for the persistence collaborator.
pub(crate) fn encode(summary: &GameSummary) -> Result<String, SummaryTokenError> {
    let json = serde_json::to_vec(summary).map_err(SummaryTokenError::InvalidPayload)?;
    let encoded = STANDARD_NO_PAD.encode(json);
    Ok(format!(
        "{TOKEN_DOMAIN}{FIELD_DELIMITER}{TOKEN_VERSION}{FIELD_DELIMITER}{encoded}"
    ))
}

/// Decodes a summary from its token representation.
pub(crate) fn decode(value: &str) -> Result<GameSummary, SummaryTokenError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(SummaryTokenError::EmptyPayload);
    }

    let mut parts = trimmed.split(FIELD_DELIMITER);
    let domain = parts.next().unwrap_or_default();
    let version = parts.next().ok_or(SummaryTokenError::MissingVersion)?;
    let payload = parts.next().ok_or(SummaryTokenError::MissingPayload)?;

    if domain != TOKEN_DOMAIN {
        return Err(SummaryTokenError::InvalidPrefix(domain.to_owned()));
    }
    if version != TOKEN_VERSION {
        return Err(SummaryTokenError::UnsupportedVersion(version.to_owned()));
    }

    let bytes = STANDARD_NO_PAD
        .decode(payload.as_bytes())
        .map_err(SummaryTokenError::InvalidEncoding)?;
    serde_json::from_slice(&bytes).map_err(SummaryTokenError::InvalidPayload)
}
