//! Protocol module - payload grammar and batch assembly.
//!
//! This module implements everything above the framing layer:
//! - bet line serialization and the control messages
//! - server reply parsing (batch ack, winner reply grammar)
//! - batch assembly under the record count and byte size caps

mod batch;
pub mod message;

pub use batch::{Batch, BatchBuilder};
pub use message::{finished_message, is_batch_ack, winners_request, BetMessage, WinnerReply};
