//! Payload grammar for the aggregation protocol.
//!
//! Outbound payloads are UTF-8 text, one `|`-separated line per message:
//!
//! ```text
//! Bet:     <client_id>|<name>|<surname>|<document>|<birthdate>|<number>\n
//! Finish:  <client_id>|FINISHED\n
//! Query:   <client_id>|REQUEST_WINNERS\n
//! ```
//!
//! Inbound payloads are free text. A trimmed `BATCH_RECEIVED` acknowledges a
//! batch; a winner reply is either `WINNERS:` followed by a `|`-separated
//! document list, or the literal `NOT_READY`.

use crate::error::{ClientError, Result};

/// Field separator inside every protocol line.
pub const FIELD_SEPARATOR: char = '|';

/// Number of fields a well-formed bet record carries.
pub const RECORD_ARITY: usize = 5;

/// Trimmed server reply that acknowledges a batch.
pub const BATCH_ACK: &str = "BATCH_RECEIVED";

/// Trimmed server reply while winner aggregation is still in progress.
pub const NOT_READY: &str = "NOT_READY";

/// Prefix of a successful winner reply.
pub const WINNERS_PREFIX: &str = "WINNERS:";

/// One serialized bet line, immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BetMessage {
    line: String,
}

impl BetMessage {
    /// Serialize a raw record into a bet line.
    ///
    /// Returns `None` when the record has fewer than [`RECORD_ARITY`]
    /// fields; extra fields beyond the arity are ignored.
    pub fn new(client_id: &str, fields: &[String]) -> Option<Self> {
        if fields.len() < RECORD_ARITY {
            return None;
        }

        let field_bytes: usize = fields[..RECORD_ARITY].iter().map(|f| f.len()).sum();
        let mut line = String::with_capacity(client_id.len() + field_bytes + RECORD_ARITY + 1);
        line.push_str(client_id);
        for field in &fields[..RECORD_ARITY] {
            line.push(FIELD_SEPARATOR);
            line.push_str(field);
        }
        line.push('\n');

        Some(Self { line })
    }

    /// Serialized bytes, terminator included.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        self.line.as_bytes()
    }

    /// Serialized length in bytes, terminator included.
    #[inline]
    pub fn len(&self) -> usize {
        self.line.len()
    }

    /// A bet line is never empty; present for clippy symmetry with `len`.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.line.is_empty()
    }
}

/// Build the finish-phase payload.
pub fn finished_message(client_id: &str) -> String {
    format!("{client_id}{FIELD_SEPARATOR}FINISHED\n")
}

/// Build the winner-query payload.
pub fn winners_request(client_id: &str) -> String {
    format!("{client_id}{FIELD_SEPARATOR}REQUEST_WINNERS\n")
}

/// Whether a batch reply payload acknowledges the batch.
pub fn is_batch_ack(payload: &[u8]) -> bool {
    String::from_utf8_lossy(payload).trim() == BATCH_ACK
}

/// Parsed winner-query reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WinnerReply {
    /// Aggregation finished; the winning documents (possibly none).
    Winners(Vec<String>),
    /// Aggregation still in progress; ask again later.
    NotReady,
}

impl WinnerReply {
    /// Parse a winner-query reply payload.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Protocol`] when the payload matches neither
    /// the `WINNERS:` grammar nor `NOT_READY`.
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let text = String::from_utf8_lossy(payload);
        let trimmed = text.trim();

        if let Some(rest) = trimmed.strip_prefix(WINNERS_PREFIX) {
            let winners = rest
                .split(FIELD_SEPARATOR)
                .map(str::trim)
                .filter(|entry| !entry.is_empty())
                .map(str::to_string)
                .collect();
            return Ok(Self::Winners(winners));
        }

        if trimmed == NOT_READY {
            return Ok(Self::NotReady);
        }

        Err(ClientError::Protocol(format!(
            "unexpected winner reply: {trimmed:?}"
        )))
    }
}
