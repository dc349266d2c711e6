//! # betstream
//!
//! Client that streams bet records from a local file to a remote aggregation
//! service over a single persistent TCP connection, then queries the service
//! for the deferred winner list.
//!
//! ## Architecture
//!
//! - **Protocol** ([`protocol`]): payload grammar (bet lines, `FINISHED`,
//!   `REQUEST_WINNERS`, winner replies) and batch assembly under the record
//!   count and byte size caps.
//! - **Transport** ([`transport`]): length-prefixed framing over the stream
//!   connection. 4-byte big-endian length, then the payload.
//! - **Session** ([`session`]): drives the protocol phases in order and owns
//!   the connection for its whole lifetime.
//! - **Shutdown** ([`shutdown`]): signal listener that cancels the session
//!   token; it never touches the connection itself.
//!
//! ## Example
//!
//! ```ignore
//! use clap::Parser;
//! use betstream::config::{Args, ClientConfig};
//! use betstream::{shutdown, Session};
//!
//! #[tokio::main]
//! async fn main() -> betstream::Result<()> {
//!     let config = ClientConfig::load(Args::parse())?;
//!     let cancel = shutdown::spawn_monitor();
//!     let mut session = Session::new(config, cancel);
//!     session.run().await
//! }
//! ```

pub mod config;
pub mod error;
pub mod protocol;
pub mod session;
pub mod shutdown;
pub mod source;
pub mod transport;

pub use error::{ClientError, Result};
pub use session::{Session, SessionState};
