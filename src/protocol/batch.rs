//! Batch assembly under the record count and byte size caps.
//!
//! The builder consumes raw records one at a time and accumulates their
//! serialized bet lines in a single `BytesMut`. A batch is flushed the
//! instant the next line would violate either cap, so no batch ever exceeds
//! a cap — except a batch holding a single line that is larger than the byte
//! cap on its own, which is sent alone rather than split.

use bytes::{Bytes, BytesMut};
use tracing::{debug, warn};

use super::message::BetMessage;

/// A completed batch: the concatenated bet lines forming one frame payload.
#[derive(Debug, Clone)]
pub struct Batch {
    records: usize,
    payload: Bytes,
}

impl Batch {
    /// Number of bet lines in this batch.
    #[inline]
    pub fn records(&self) -> usize {
        self.records
    }

    /// Serialized payload length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// A flushed batch always carries at least one line.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// The frame payload.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
}

/// Incremental batch builder.
///
/// Feed records with [`push`](Self::push); each call returns the previous
/// batch when the new record did not fit into it. Call
/// [`finish`](Self::finish) after the source is exhausted to flush the last
/// accumulator.
#[derive(Debug)]
pub struct BatchBuilder {
    client_id: String,
    max_records: usize,
    max_bytes: usize,
    buf: BytesMut,
    records: usize,
    skipped: u64,
}

impl BatchBuilder {
    /// Create a builder for the given client identity and caps.
    pub fn new(client_id: impl Into<String>, max_records: usize, max_bytes: usize) -> Self {
        debug_assert!(max_records > 0 && max_bytes > 0);
        Self {
            client_id: client_id.into(),
            max_records,
            max_bytes,
            buf: BytesMut::with_capacity(max_bytes),
            records: 0,
            skipped: 0,
        }
    }

    /// Feed one raw record.
    ///
    /// Records with fewer than five fields are dropped, never fatal. Returns
    /// the completed batch when appending the record would have pushed the
    /// accumulator over either cap.
    pub fn push(&mut self, fields: &[String]) -> Option<Batch> {
        let Some(message) = BetMessage::new(&self.client_id, fields) else {
            self.skipped += 1;
            debug!(fields = fields.len(), "dropping record with short arity");
            return None;
        };

        if message.len() > self.max_bytes {
            // Never split a line: it travels alone, over the byte cap.
            warn!(
                bytes = message.len(),
                cap = self.max_bytes,
                "bet line exceeds the batch byte cap, sending it alone"
            );
        }

        let flushed = if self.records > 0
            && (self.buf.len() + message.len() > self.max_bytes
                || self.records >= self.max_records)
        {
            self.take()
        } else {
            None
        };

        self.buf.extend_from_slice(message.as_bytes());
        self.records += 1;
        flushed
    }

    /// Flush the final accumulator. `None` when nothing is pending.
    pub fn finish(&mut self) -> Option<Batch> {
        self.take()
    }

    /// Records dropped so far for short arity.
    #[inline]
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    fn take(&mut self) -> Option<Batch> {
        if self.records == 0 {
            return None;
        }
        let records = std::mem::take(&mut self.records);
        let payload = self.buf.split().freeze();
        Some(Batch { records, payload })
    }
}
