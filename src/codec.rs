//! Opaque identifier codec.
//!
//! Every numeric primary key crossing the API boundary is rendered as the
//! base64 encoding of its decimal string (`1` becomes `"MQ=="`). This is
//! obfuscation only: anybody can reverse it, so it must never stand in for an
//! authorization check (see `services::policy`).

use base64::alphabet;
use base64::engine::{general_purpose, DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use thiserror::Error;

/// Decoder that accepts identifiers with or without trailing `=` padding,
/// since some clients strip it from URL segments.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdCodecError {
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),
}

/// Encode a primary key into its opaque form.
pub fn encode(id: i64) -> String {
    general_purpose::STANDARD.encode(id.to_string())
}

/// Decode an opaque identifier back into a primary key.
///
/// The decoded payload must be a non-empty run of ASCII digits that fits in
/// an `i64`. Signs, whitespace and trailing garbage are rejected.
pub fn decode(opaque: &str) -> Result<i64, IdCodecError> {
    let invalid = || IdCodecError::InvalidIdentifier(opaque.to_string());

    let bytes = LENIENT.decode(opaque.trim()).map_err(|_| invalid())?;
    let text = std::str::from_utf8(&bytes).map_err(|_| invalid())?;

    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    text.parse::<i64>().map_err(|_| invalid())
}

/// Encode an optional back-reference (e.g. `usuario_creador`).
pub fn encode_opt(id: Option<i64>) -> Option<String> {
    id.map(encode)
}
