//! Reversible, URL-safe tokens for post links.
//!
//! A token is the percent-encoded post URL wrapped in unpadded URL-safe
//! base64, so it can sit in a single path segment.

use std::string::FromUtf8Error;

use base64::{
    Engine as _,
    engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("token is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("token payload is not UTF-8: {0}")]
    Utf8(#[from] FromUtf8Error),
}

pub fn encode(url: &str) -> String {
    let escaped = urlencoding::encode(url);
    URL_SAFE_NO_PAD.encode(escaped.as_bytes())
}

pub fn decode(token: &str) -> Result<String, DecodeError> {
    let mut padded = token.trim().to_string();
    while padded.len() % 4 != 0 {
        padded.push('=');
    }

    let bytes = URL_SAFE.decode(padded.as_bytes())?;
    let escaped = String::from_utf8(bytes)?;
    let url = urlencoding::decode(&escaped)?;
    Ok(url.into_owned())
}
