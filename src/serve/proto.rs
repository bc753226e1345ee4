#![deny(missing_docs)]

//! # Protobuf Encoding Seam
//!
//! The protobuf wire encoding of an OpenAPI document is produced by an
//! external encoder; this crate treats it as a byte-level transform of
//! the canonical JSON bytes and injects it where the serving layer needs
//! it.

use crate::error::AppResult;

/// Byte-level protobuf encoder over canonical JSON document bytes.
pub trait ProtoEncoder: Send + Sync {
    /// Encodes JSON document bytes into the protobuf wire form.
    fn encode(&self, json: &[u8]) -> AppResult<Vec<u8>>;
}

/// Passthrough encoder: the protobuf variant carries the JSON bytes
/// unchanged. Stand-in for deployments without an external encoder, and
/// for tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityProto;

impl ProtoEncoder for IdentityProto {
    fn encode(&self, json: &[u8]) -> AppResult<Vec<u8>> {
        Ok(json.to_vec())
    }
}

impl<F> ProtoEncoder for F
where
    F: Fn(&[u8]) -> AppResult<Vec<u8>> + Send + Sync,
{
    fn encode(&self, json: &[u8]) -> AppResult<Vec<u8>> {
        self(json)
    }
}
