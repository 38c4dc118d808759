//! EIP-4361 sign-in message codec.
//!
//! The encoder is the single source of truth for the bytes a wallet signs.
//! The verifier never hashes the submitted text directly: it parses it,
//! re-encodes the parsed fields, and checks the signature over that output,
//! so any message that does not survive `parse` → `encode` unchanged can
//! never verify.
//!
//! Layout (optional lines are omitted entirely when absent):
//!
//! ```text
//! {domain} wants you to sign in with your Ethereum account:
//! {address}
//!
//! {statement}
//!
//! URI: {uri}
//! Version: {version}
//! Chain ID: {chain_id}
//! Nonce: {nonce}
//! Issued At: {issued_at}
//! Expiration Time: {expiration_time}
//! Not Before: {not_before}
//! Request ID: {request_id}
//! Resources:
//! - {resource}
//! ```

use alloy_primitives::Address;
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use std::fmt;

const HEADER_SUFFIX: &str = " wants you to sign in with your Ethereum account:";
const URI_TAG: &str = "URI: ";
const VERSION_TAG: &str = "Version: ";
const CHAIN_TAG: &str = "Chain ID: ";
const NONCE_TAG: &str = "Nonce: ";
const ISSUED_AT_TAG: &str = "Issued At: ";
const EXPIRATION_TAG: &str = "Expiration Time: ";
const NOT_BEFORE_TAG: &str = "Not Before: ";
const REQUEST_ID_TAG: &str = "Request ID: ";
const RESOURCES_TAG: &str = "Resources:";
const RESOURCE_PREFIX: &str = "- ";

/// The only protocol version this codec speaks.
pub const SIWE_VERSION: &str = "1";

/// Minimum nonce length allowed inside a message.
const MIN_NONCE_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MessageError {
    #[error("message is empty")]
    Empty,

    #[error("invalid header line")]
    InvalidHeader,

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("missing line: {0}")]
    MissingLine(&'static str),

    #[error("expected empty line at line {0}")]
    ExpectedBlankLine(usize),

    #[error("invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("unsupported version: {0}")]
    UnsupportedVersion(String),

    #[error("unexpected content at line {0}")]
    UnexpectedLine(usize),
}

/// An RFC 3339 timestamp that remembers the exact text it was parsed from.
///
/// Re-encoding must reproduce the signed bytes, and RFC 3339 allows many
/// spellings of the same instant, so the submitted text is kept alongside
/// the parsed value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timestamp {
    raw: String,
    at: DateTime<Utc>,
}

impl Timestamp {
    pub fn parse(field: &'static str, raw: &str) -> Result<Self, MessageError> {
        let at = DateTime::parse_from_rfc3339(raw)
            .map_err(|e| MessageError::InvalidField {
                field,
                reason: e.to_string(),
            })?
            .with_timezone(&Utc);
        Ok(Timestamp {
            raw: raw.to_string(),
            at,
        })
    }

    /// Millisecond precision with a `Z` suffix, the shape browsers produce.
    /// `at` is truncated to match the text, so parsing `as_str()` gives back
    /// an equal timestamp.
    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        let at = at.trunc_subsecs(3);
        Timestamp {
            raw: at.to_rfc3339_opts(SecondsFormat::Millis, true),
            at,
        }
    }

    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn at(&self) -> DateTime<Utc> {
        self.at
    }
}

/// A parsed sign-in message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiweMessage {
    pub domain: String,
    pub address: Address,
    pub statement: Option<String>,
    pub uri: String,
    pub version: String,
    pub chain_id: u64,
    pub nonce: String,
    pub issued_at: Timestamp,
    pub expiration_time: Option<Timestamp>,
    pub not_before: Option<Timestamp>,
    pub request_id: Option<String>,
    pub resources: Vec<String>,
}

impl SiweMessage {
    /// Encode into the canonical text. Deterministic: equal messages
    /// always produce identical strings.
    pub fn encode(&self) -> String {
        let mut lines: Vec<String> = vec![
            format!("{}{}", self.domain, HEADER_SUFFIX),
            self.address.to_checksum(None),
            String::new(),
        ];
        if let Some(statement) = &self.statement {
            lines.push(statement.clone());
        }
        lines.push(String::new());

        lines.push(format!("{URI_TAG}{}", self.uri));
        lines.push(format!("{VERSION_TAG}{}", self.version));
        lines.push(format!("{CHAIN_TAG}{}", self.chain_id));
        lines.push(format!("{NONCE_TAG}{}", self.nonce));
        lines.push(format!("{ISSUED_AT_TAG}{}", self.issued_at.as_str()));
        if let Some(exp) = &self.expiration_time {
            lines.push(format!("{EXPIRATION_TAG}{}", exp.as_str()));
        }
        if let Some(nbf) = &self.not_before {
            lines.push(format!("{NOT_BEFORE_TAG}{}", nbf.as_str()));
        }
        if let Some(request_id) = &self.request_id {
            lines.push(format!("{REQUEST_ID_TAG}{request_id}"));
        }
        if !self.resources.is_empty() {
            lines.push(RESOURCES_TAG.to_string());
            for resource in &self.resources {
                lines.push(format!("{RESOURCE_PREFIX}{resource}"));
            }
        }

        lines.join("\n")
    }

    /// Strictly parse the canonical text. Field order is fixed, lines are
    /// separated by a bare `\n`, and nothing may follow the last field.
    pub fn parse(message: &str) -> Result<Self, MessageError> {
        if message.is_empty() {
            return Err(MessageError::Empty);
        }
        let lines: Vec<&str> = message.split('\n').collect();
        let mut cursor = Cursor { lines, pos: 0 };

        let header = cursor.next("header")?;
        let domain = header
            .strip_suffix(HEADER_SUFFIX)
            .filter(|d| !d.is_empty() && !d.contains(char::is_whitespace))
            .ok_or(MessageError::InvalidHeader)?
            .to_string();

        // EIP-55 only; unchecksummed spellings are rejected
        let address = Address::parse_checksummed(cursor.next("address")?, None)
            .map_err(|e| MessageError::InvalidAddress(e.to_string()))?;
        cursor.blank()?;

        // Either a blank line (no statement) or statement + blank line
        let statement = match cursor.next("statement")? {
            "" => None,
            line => {
                cursor.blank()?;
                Some(line.to_string())
            }
        };

        let uri = cursor.tagged(URI_TAG, "URI")?.to_string();
        url::Url::parse(&uri).map_err(|e| MessageError::InvalidField {
            field: "URI",
            reason: e.to_string(),
        })?;

        let version = cursor.tagged(VERSION_TAG, "Version")?.to_string();
        if version != SIWE_VERSION {
            return Err(MessageError::UnsupportedVersion(version));
        }

        let chain_id = parse_chain_id(cursor.tagged(CHAIN_TAG, "Chain ID")?)?;

        let nonce = cursor.tagged(NONCE_TAG, "Nonce")?.to_string();
        if nonce.len() < MIN_NONCE_LEN || !nonce.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(MessageError::InvalidField {
                field: "Nonce",
                reason: format!("must be at least {MIN_NONCE_LEN} alphanumeric characters"),
            });
        }

        let issued_at = Timestamp::parse("Issued At", cursor.tagged(ISSUED_AT_TAG, "Issued At")?)?;

        let expiration_time = cursor
            .optional(EXPIRATION_TAG)
            .map(|raw| Timestamp::parse("Expiration Time", raw))
            .transpose()?;
        let not_before = cursor
            .optional(NOT_BEFORE_TAG)
            .map(|raw| Timestamp::parse("Not Before", raw))
            .transpose()?;
        let request_id = cursor.optional(REQUEST_ID_TAG).map(str::to_string);

        let mut resources = Vec::new();
        if cursor.peek() == Some(RESOURCES_TAG) {
            cursor.pos += 1;
            while let Some(resource) = cursor.optional(RESOURCE_PREFIX) {
                resources.push(resource.to_string());
            }
            if resources.is_empty() {
                return Err(MessageError::InvalidField {
                    field: "Resources",
                    reason: "list is empty".to_string(),
                });
            }
        }

        if cursor.peek().is_some() {
            return Err(MessageError::UnexpectedLine(cursor.pos + 1));
        }

        Ok(SiweMessage {
            domain,
            address,
            statement,
            uri,
            version,
            chain_id,
            nonce,
            issued_at,
            expiration_time,
            not_before,
            request_id,
            resources,
        })
    }
}

impl fmt::Display for SiweMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

/// Digits only, no sign and no leading zeros, so the value prints back
/// exactly as written.
fn parse_chain_id(raw: &str) -> Result<u64, MessageError> {
    let invalid = |reason: &str| MessageError::InvalidField {
        field: "Chain ID",
        reason: reason.to_string(),
    };
    if raw.is_empty() || !raw.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid("not a decimal integer"));
    }
    if raw.len() > 1 && raw.starts_with('0') {
        return Err(invalid("leading zeros"));
    }
    raw.parse::<u64>().map_err(|e| invalid(&e.to_string()))
}

struct Cursor<'a> {
    lines: Vec<&'a str>,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn peek(&self) -> Option<&'a str> {
        self.lines.get(self.pos).copied()
    }

    fn next(&mut self, what: &'static str) -> Result<&'a str, MessageError> {
        let line = self.peek().ok_or(MessageError::MissingLine(what))?;
        self.pos += 1;
        Ok(line)
    }

    fn blank(&mut self) -> Result<(), MessageError> {
        let line_no = self.pos + 1;
        match self.next("empty line")? {
            "" => Ok(()),
            _ => Err(MessageError::ExpectedBlankLine(line_no)),
        }
    }

    fn tagged(&mut self, tag: &str, what: &'static str) -> Result<&'a str, MessageError> {
        let line = self.next(what)?;
        line.strip_prefix(tag).ok_or(MessageError::MissingLine(what))
    }

    fn optional(&mut self, tag: &str) -> Option<&'a str> {
        let value = self.peek()?.strip_prefix(tag)?;
        self.pos += 1;
        Some(value)
    }
}
