//! Session controller - drives the protocol phases over one connection.
//!
//! A session is one end-to-end client run: connect, stream every batch,
//! signal completion, query the winner list, terminate. All phases are
//! strict request/response over the same framed connection; one frame is in
//! flight at any time and batches are never reordered.
//!
//! The session is the sole owner of the connection. The shutdown monitor
//! only fires the cancellation token; the controller observes the token at
//! every blocking I/O boundary and releases the socket itself, exactly once,
//! on every exit path. An I/O failure observed after the token fired is
//! classified as the expected abort rather than a network fault.

use std::future::Future;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::protocol::{message, Batch, BatchBuilder, WinnerReply};
use crate::source::BetFile;
use crate::transport::FramedStream;

/// Where the session currently stands.
///
/// `Closed` and `Aborted` are terminal; both guarantee the connection was
/// released exactly once. `Aborted` absorbs every I/O or protocol failure
/// and any shutdown request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Init,
    Connected,
    BatchingInFlight,
    FinishSent,
    WinnersQueried,
    Closed,
    Aborted,
}

/// One client run over one connection.
pub struct Session {
    config: ClientConfig,
    cancel: CancellationToken,
    state: SessionState,
}

impl Session {
    /// Create a session; nothing is connected until [`run`](Self::run).
    pub fn new(config: ClientConfig, cancel: CancellationToken) -> Self {
        Self {
            config,
            cancel,
            state: SessionState::Init,
        }
    }

    /// Current state, mostly useful after `run` returns.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Run the session to completion and log the terminal outcome.
    ///
    /// # Errors
    ///
    /// Every failure is terminal for the session: connection and source
    /// errors, protocol violations in the finish/winner phases, and
    /// [`ClientError::Cancelled`] when the shutdown monitor fired.
    pub async fn run(&mut self) -> Result<()> {
        let outcome = self.drive().await;

        match &outcome {
            Ok(()) => {
                self.state = SessionState::Closed;
                info!(client_id = %self.config.id, "session closed");
            }
            Err(ClientError::Cancelled) => {
                self.state = SessionState::Aborted;
                info!(client_id = %self.config.id, "session aborted by shutdown request");
            }
            Err(err) => {
                self.state = SessionState::Aborted;
                error!(client_id = %self.config.id, error = %err, "session aborted");
            }
        }

        outcome
    }

    async fn drive(&mut self) -> Result<()> {
        let mut stream = self.connect().await?;
        self.state = SessionState::Connected;
        info!(server = %self.config.server_address, "connected");

        let outcome = self.run_phases(&mut stream).await;

        // Single release point for the connection, reached on every path.
        // After a forced shutdown the peer may already be gone; that is not
        // worth reporting.
        if let Err(err) = stream.shutdown().await {
            if !matches!(outcome, Err(ClientError::Cancelled)) {
                debug!(error = %err, "connection teardown reported an error");
            }
        }

        outcome
    }

    /// Establish the connection, allowing a single reconnect attempt.
    async fn connect(&self) -> Result<FramedStream<TcpStream>> {
        match self.dial().await {
            Ok(stream) => Ok(stream),
            Err(ClientError::Cancelled) => Err(ClientError::Cancelled),
            Err(err) => {
                warn!(server = %self.config.server_address, error = %err, "connect failed, retrying once");
                self.pause().await?;
                self.dial().await
            }
        }
    }

    async fn dial(&self) -> Result<FramedStream<TcpStream>> {
        let connect = async {
            let stream = TcpStream::connect(&self.config.server_address).await?;
            Ok(FramedStream::new(stream))
        };
        guarded(&self.cancel, connect).await
    }

    async fn run_phases<S>(&mut self, stream: &mut FramedStream<S>) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        self.send_batches(stream).await?;
        self.send_finished(stream).await?;
        self.query_winners(stream).await
    }

    /// Batch phase: drain the record source, one batch round-trip at a time.
    async fn send_batches<S>(&mut self, stream: &mut FramedStream<S>) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        self.state = SessionState::BatchingInFlight;

        let mut source = BetFile::open(&self.config.data_file).await?;
        let mut builder = BatchBuilder::new(
            self.config.id.clone(),
            self.config.batch_max_amount,
            self.config.batch_max_bytes,
        );
        let mut sent = 0u64;
        let mut acked = 0u64;

        // A source read error propagates immediately; the unflushed
        // accumulator is discarded with the session.
        while let Some(fields) = source.next_record().await? {
            if let Some(batch) = builder.push(&fields) {
                sent += 1;
                acked += u64::from(self.dispatch(stream, batch).await?);
            }
        }
        if let Some(batch) = builder.finish() {
            sent += 1;
            acked += u64::from(self.dispatch(stream, batch).await?);
        }

        self.state = SessionState::Connected;
        info!(
            rows = source.rows(),
            skipped = builder.skipped(),
            batches = sent,
            acked,
            "batch phase finished"
        );
        Ok(())
    }

    /// One batch round-trip. Returns whether the server acknowledged it.
    async fn dispatch<S>(&self, stream: &mut FramedStream<S>, batch: Batch) -> Result<bool>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let records = batch.records();
        guarded(&self.cancel, stream.send_frame(batch.payload())).await?;
        let reply = guarded(&self.cancel, stream.recv_frame()).await?;

        let accepted = message::is_batch_ack(&reply);
        if accepted {
            debug!(records, bytes = batch.len(), "batch acknowledged");
        } else {
            // Accepted limitation: a rejected batch is lost, the session
            // continues with the next one.
            warn!(
                records,
                reply = %String::from_utf8_lossy(&reply).trim(),
                "server rejected batch"
            );
        }

        self.pause().await?;
        Ok(accepted)
    }

    /// Finish phase: tell the server this client is done streaming.
    async fn send_finished<S>(&mut self, stream: &mut FramedStream<S>) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let payload = message::finished_message(&self.config.id);
        guarded(&self.cancel, stream.send_frame(payload.as_bytes())).await?;
        self.state = SessionState::FinishSent;

        let reply = guarded(&self.cancel, stream.recv_frame()).await?;
        debug!(
            reply = %String::from_utf8_lossy(&reply).trim(),
            "finish acknowledged"
        );
        self.state = SessionState::Connected;
        Ok(())
    }

    /// Winner-query phase: poll while the server reports `NOT_READY`, up to
    /// the configured number of attempts. Exhausting the attempts is a
    /// logged outcome and a normal termination, not a failure.
    async fn query_winners<S>(&mut self, stream: &mut FramedStream<S>) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let payload = message::winners_request(&self.config.id);

        for attempt in 1..=self.config.winner_poll_attempts {
            guarded(&self.cancel, stream.send_frame(payload.as_bytes())).await?;
            let reply = guarded(&self.cancel, stream.recv_frame()).await?;
            self.state = SessionState::WinnersQueried;

            match WinnerReply::parse(&reply)? {
                WinnerReply::Winners(winners) => {
                    info!(
                        client_id = %self.config.id,
                        winners = winners.len(),
                        "winner query succeeded"
                    );
                    return Ok(());
                }
                WinnerReply::NotReady => {
                    info!(
                        attempt,
                        attempts = self.config.winner_poll_attempts,
                        "winners not ready"
                    );
                    if attempt < self.config.winner_poll_attempts {
                        self.pause().await?;
                    }
                }
            }
        }

        info!(client_id = %self.config.id, "winners not available yet, giving up for this run");
        Ok(())
    }

    /// Cancellable inter-round pause, also used between winner polls.
    async fn pause(&self) -> Result<()> {
        if self.config.batch_pause.is_zero() {
            return Ok(());
        }
        tokio::select! {
            _ = self.cancel.cancelled() => Err(ClientError::Cancelled),
            _ = tokio::time::sleep(self.config.batch_pause) => Ok(()),
        }
    }
}

/// Race a fallible I/O future against the shutdown token.
///
/// An I/O failure observed after cancellation is reported as
/// [`ClientError::Cancelled`] so shutdown is never mis-logged as a network
/// fault.
async fn guarded<T, F>(cancel: &CancellationToken, io: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        _ = cancel.cancelled() => Err(ClientError::Cancelled),
        result = io => result.map_err(|err| {
            if cancel.is_cancelled() {
                ClientError::Cancelled
            } else {
                err
            }
        }),
    }
}
