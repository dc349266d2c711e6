//! Transport module - length-prefixed framing over a byte stream.

mod framed;

pub use framed::{FramedStream, LEN_PREFIX_SIZE, MAX_REPLY_BYTES};
