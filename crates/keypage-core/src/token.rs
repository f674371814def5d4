//! Continuation tokens and their string encoding.
//!
//! A token string is URL-safe, unpadded base64 over:
//!
//! ```text
//! header (1 byte) | payload | tag (16 bytes, optional)
//! ```
//!
//! The header's high nibble is the format version and its low nibble holds
//! the flags (compressed, hashed). The payload is the JSON
//! encoded direction and values, raw-deflated when compressed. The tag is a
//! truncated SHA-256 over the column signature and the payload, binding the
//! token to the column set that produced it.

use std::io::{Read, Write};

use base64::prelude::*;
use flate2::Compression;
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{
    ColumnDefinition, Direction, Error, Result, ScalarType, TRACING_TARGET_TOKEN, TokenOptions,
    Value,
};

/// Current token format version.
const VERSION: u8 = 1;
/// Payload is raw-deflate compressed.
const FLAG_COMPRESSED: u8 = 0b0001;
/// Token carries an integrity tag.
const FLAG_HASHED: u8 = 0b0010;
/// Length of the truncated integrity tag.
const TAG_LEN: usize = 16;
/// Upper bound on a decompressed payload.
const MAX_PAYLOAD_LEN: u64 = 64 * 1024;

/// A decoded position in a paginated result set.
///
/// The values are the ordering-column values of the record the next page
/// starts after, in column order. A token without values addresses the first
/// page in its direction.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ContinuationToken {
    direction: Option<Direction>,
    values: Vec<Value>,
}

impl ContinuationToken {
    /// Returns the sentinel meaning "no token was supplied".
    pub fn none() -> Self {
        Self::default()
    }

    /// Creates a token positioned after `values` in `direction`.
    pub fn new(direction: Direction, values: Vec<Value>) -> Self {
        Self {
            direction: Some(direction),
            values,
        }
    }

    /// Creates a token addressing the first page in `direction`.
    pub fn first_page(direction: Direction) -> Self {
        Self::new(direction, Vec::new())
    }

    /// Returns whether this is the "no token" sentinel.
    #[inline]
    pub fn is_none(&self) -> bool {
        self.direction.is_none() && self.values.is_empty()
    }

    /// Returns the navigation direction, if one was specified.
    #[inline]
    pub fn direction(&self) -> Option<Direction> {
        self.direction
    }

    /// Returns the reference values.
    #[inline]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Returns whether the token carries reference values.
    #[inline]
    pub fn has_values(&self) -> bool {
        !self.values.is_empty()
    }
}

#[derive(Serialize, Deserialize)]
struct Payload {
    #[serde(rename = "d")]
    direction: Direction,
    #[serde(rename = "v", default)]
    values: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq)]
struct ColumnSignature {
    scalar_type: ScalarType,
    nullable: bool,
}

/// Encodes and decodes continuation tokens for one frozen column set.
#[derive(Debug, Clone)]
pub struct TokenEncoder {
    columns: Vec<ColumnSignature>,
    signature: Vec<u8>,
    direction: Direction,
    options: TokenOptions,
}

impl TokenEncoder {
    /// Creates an encoder bound to `columns`.
    ///
    /// Tokens without an explicit direction are encoded in `direction`.
    pub fn new<E>(
        columns: &[ColumnDefinition<E>],
        direction: Direction,
        options: TokenOptions,
    ) -> Self {
        let signature = columns
            .iter()
            .map(|column| {
                let field = column.field();
                format!(
                    "{}:{}{}:{}",
                    field.name(),
                    field.scalar_type(),
                    if field.is_nullable() { "?" } else { "" },
                    if column.is_ascending() { "asc" } else { "desc" },
                )
            })
            .collect::<Vec<_>>()
            .join(";")
            .into_bytes();

        let columns = columns
            .iter()
            .map(|column| ColumnSignature {
                scalar_type: column.field().scalar_type(),
                nullable: column.field().is_nullable(),
            })
            .collect();

        Self {
            columns,
            signature,
            direction,
            options,
        }
    }

    /// Returns the token options.
    #[inline]
    pub fn options(&self) -> TokenOptions {
        self.options
    }

    /// Encodes a token into its string form.
    pub fn encode(&self, token: &ContinuationToken) -> Result<String> {
        self.check_values(token.values())?;

        let payload = Payload {
            direction: token.direction().unwrap_or(self.direction),
            values: token.values().to_vec(),
        };
        let mut body = serde_json::to_vec(&payload).map_err(|e| {
            Error::internal()
                .with_message("failed to serialize token payload")
                .with_source(e)
        })?;

        let mut flags = 0;
        if self.options.use_compression {
            body = deflate(&body)?;
            flags |= FLAG_COMPRESSED;
        }
        if self.options.include_hash {
            flags |= FLAG_HASHED;
        }

        let mut bytes = Vec::with_capacity(1 + body.len() + TAG_LEN);
        bytes.push(VERSION << 4 | flags);
        bytes.extend_from_slice(&body);
        if self.options.include_hash {
            bytes.extend_from_slice(&self.tag(&body));
        }

        Ok(BASE64_URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Decodes a token string.
    ///
    /// An absent or blank string yields [`ContinuationToken::none`].
    pub fn decode(&self, token: Option<&str>) -> Result<ContinuationToken> {
        let Some(token) = token.map(str::trim).filter(|t| !t.is_empty()) else {
            return Ok(ContinuationToken::none());
        };

        let bytes = BASE64_URL_SAFE_NO_PAD
            .decode(token)
            .map_err(|e| invalid("token is not valid base64").with_source(e))?;
        let Some((&header, rest)) = bytes.split_first() else {
            return Err(invalid("token is empty"));
        };

        if header >> 4 != VERSION {
            return Err(invalid(format!("unsupported token version {}", header >> 4)));
        }
        let flags = header & 0x0f;

        let body = if flags & FLAG_HASHED != 0 {
            if rest.len() < TAG_LEN {
                return Err(invalid("token is truncated"));
            }
            let (body, tag) = rest.split_at(rest.len() - TAG_LEN);
            if self.tag(body).as_slice() != tag {
                tracing::warn!(target: TRACING_TARGET_TOKEN, "Rejected token with mismatching hash");
                return Err(invalid("token hash does not match this column set"));
            }
            body
        } else if self.options.include_hash {
            return Err(invalid("token is missing its integrity hash"));
        } else {
            rest
        };

        let body = if flags & FLAG_COMPRESSED != 0 {
            inflate(body)?
        } else {
            body.to_vec()
        };

        let payload: Payload = serde_json::from_slice(&body)
            .map_err(|e| invalid("token payload is malformed").with_source(e))?;
        self.check_values(&payload.values)
            .map_err(|e| invalid(e.message.unwrap_or_default()))?;

        Ok(ContinuationToken::new(payload.direction, payload.values))
    }

    fn check_values(&self, values: &[Value]) -> Result<()> {
        if values.is_empty() {
            return Ok(());
        }

        if values.len() != self.columns.len() {
            return Err(Error::invalid_argument().with_message(format!(
                "token carries {} values for {} columns",
                values.len(),
                self.columns.len()
            )));
        }

        for (index, (value, column)) in values.iter().zip(&self.columns).enumerate() {
            let valid = match value {
                Value::Null => column.nullable,
                Value::Float(v) if !v.is_finite() => false,
                _ => column.scalar_type.accepts(value),
            };
            if !valid {
                return Err(Error::invalid_argument().with_message(format!(
                    "value at position {} is not a valid {}",
                    index, column.scalar_type
                )));
            }
        }

        Ok(())
    }

    fn tag(&self, body: &[u8]) -> [u8; TAG_LEN] {
        let digest = Sha256::new()
            .chain_update(&self.signature)
            .chain_update([0u8])
            .chain_update(body)
            .finalize();

        let mut tag = [0u8; TAG_LEN];
        tag.copy_from_slice(&digest[..TAG_LEN]);
        tag
    }
}

fn invalid(message: impl Into<String>) -> Error {
    Error::invalid_token().with_message(message)
}

fn deflate(body: &[u8]) -> Result<Vec<u8>> {
    let compress_error = |e: std::io::Error| {
        Error::internal()
            .with_message("failed to compress token payload")
            .with_source(e)
    };

    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(body).map_err(compress_error)?;
    encoder.finish().map_err(compress_error)
}

fn inflate(body: &[u8]) -> Result<Vec<u8>> {
    let mut decoded = Vec::new();
    DeflateDecoder::new(body)
        .take(MAX_PAYLOAD_LEN + 1)
        .read_to_end(&mut decoded)
        .map_err(|e| invalid("token payload is not valid deflate data").with_source(e))?;

    if decoded.len() as u64 > MAX_PAYLOAD_LEN {
        return Err(invalid("token payload is too large"));
    }
    Ok(decoded)
}
