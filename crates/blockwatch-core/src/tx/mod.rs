//! Transaction envelope decoding and content hashing.
//!
//! A Cosmos SDK transaction travels as a `TxRaw` envelope whose body and auth
//! info are themselves protobuf-encoded byte strings. Decoding is staged:
//!
//! ```text
//! raw bytes ──► TxRaw ──► body_bytes      ──► TxBody
//!                    ├──► auth_info_bytes ──► AuthInfo
//!                    └──► signatures (kept raw)
//! ```
//!
//! The content hash is SHA-256 over the raw bytes and never depends on
//! whether decoding succeeds.

pub mod proto;

use std::fmt;
use std::str::FromStr;

use prost::Message;
use sha2::{Digest, Sha256};
use thiserror::Error;

use proto::{AuthInfo, Fee, TxBody, TxRaw};

// ─── DecodeError ─────────────────────────────────────────────────────────────

/// Decoding failure, tagged with the stage that rejected the bytes.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid tx envelope: {0}")]
    Envelope(#[source] prost::DecodeError),

    #[error("invalid tx body: {0}")]
    Body(#[source] prost::DecodeError),

    #[error("invalid tx auth info: {0}")]
    AuthInfo(#[source] prost::DecodeError),
}

impl DecodeError {
    /// Name of the failing stage (`"envelope"`, `"body"` or `"auth_info"`).
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Envelope(_) => "envelope",
            Self::Body(_) => "body",
            Self::AuthInfo(_) => "auth_info",
        }
    }
}

// ─── Tx ──────────────────────────────────────────────────────────────────────

/// A fully decoded transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct Tx {
    pub body: TxBody,
    pub auth_info: AuthInfo,
    pub signatures: Vec<Vec<u8>>,
}

impl Tx {
    /// Type URLs of the messages carried in the body, in order.
    pub fn message_types(&self) -> impl Iterator<Item = &str> {
        self.body.messages.iter().map(|m| m.type_url.as_str())
    }

    pub fn memo(&self) -> &str {
        &self.body.memo
    }

    pub fn fee(&self) -> Option<&Fee> {
        self.auth_info.fee.as_ref()
    }

    /// Re-encode into `TxRaw` wire bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        TxRaw {
            body_bytes: self.body.encode_to_vec(),
            auth_info_bytes: self.auth_info.encode_to_vec(),
            signatures: self.signatures.clone(),
        }
        .encode_to_vec()
    }
}

/// Decode raw transaction bytes into a [`Tx`].
pub fn decode_tx(raw: &[u8]) -> Result<Tx, DecodeError> {
    let envelope = TxRaw::decode(raw).map_err(DecodeError::Envelope)?;
    let body = TxBody::decode(envelope.body_bytes.as_slice()).map_err(DecodeError::Body)?;
    let auth_info =
        AuthInfo::decode(envelope.auth_info_bytes.as_slice()).map_err(DecodeError::AuthInfo)?;
    Ok(Tx {
        body,
        auth_info,
        signatures: envelope.signatures,
    })
}

// ─── TxHash ──────────────────────────────────────────────────────────────────

/// SHA-256 content hash of a transaction's raw bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TxHash([u8; 32]);

impl TxHash {
    /// Hash raw transaction bytes.
    pub fn of(raw: &[u8]) -> Self {
        Self(Sha256::digest(raw).into())
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode_upper(self.0))
    }
}

impl fmt::Debug for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxHash({self})")
    }
}

impl FromStr for TxHash {
    type Err = hex::FromHexError;

    /// Parses 64 hex characters, with or without a `0x` prefix.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let mut out = [0u8; 32];
        hex::decode_to_slice(s, &mut out)?;
        Ok(Self(out))
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
