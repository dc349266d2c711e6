//! End-to-end session tests against an in-process mock aggregation service.
//!
//! The mock speaks the real wire protocol over a real TCP socket: one frame
//! per request, one per reply, batches acknowledged with `BATCH_RECEIVED`.

use std::path::PathBuf;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use betstream::config::ClientConfig;
use betstream::transport::FramedStream;
use betstream::{ClientError, Session, SessionState};

fn scratch_file(name: &str, contents: &str) -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let path = std::env::temp_dir().join(format!(
        "betstream-e2e-{}-{}-{}.csv",
        std::process::id(),
        name,
        nanos
    ));
    std::fs::write(&path, contents).unwrap();
    path
}

fn config(server_address: String, data_file: PathBuf) -> ClientConfig {
    ClientConfig {
        id: "1".to_string(),
        server_address,
        data_file,
        batch_max_amount: 2,
        batch_max_bytes: 1000,
        batch_pause: Duration::ZERO,
        winner_poll_attempts: 1,
    }
}

const THREE_RECORDS: &str = "\
Santiago,Lorca,30904465,1999-03-17,7574
Ana,Paz,24242424,2000-01-01,2
Juan,Rulfo,11223344,1998-12-31,9
";

/// Mock aggregation service for a single client connection. Serves until
/// the client hangs up, then reports the record count of every batch seen.
async fn spawn_server(winner_reply: &'static str) -> (String, JoinHandle<Vec<usize>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();

    let handle = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut framed = FramedStream::new(stream);
        let mut batches = Vec::new();

        loop {
            let payload = match framed.recv_frame().await {
                Ok(payload) => payload,
                Err(_) => break,
            };
            let text = String::from_utf8_lossy(&payload).into_owned();

            let reply = if text.contains("|REQUEST_WINNERS") {
                winner_reply
            } else if text.contains("|FINISHED") {
                "OK"
            } else {
                batches.push(text.lines().count());
                "BATCH_RECEIVED"
            };
            if framed.send_frame(reply.as_bytes()).await.is_err() {
                break;
            }
        }

        batches
    });

    (address, handle)
}

#[tokio::test]
async fn test_session_streams_batches_and_reads_winners() {
    let _ = tracing_subscriber::fmt::try_init();

    let path = scratch_file("scenario", THREE_RECORDS);
    let (address, server) = spawn_server("WINNERS:7|9").await;

    let mut session = Session::new(config(address, path.clone()), CancellationToken::new());
    let result = session.run().await;

    assert!(result.is_ok());
    assert_eq!(session.state(), SessionState::Closed);

    // Caps (2, 1000) partition three records as [2, 1].
    assert_eq!(server.await.unwrap(), vec![2, 1]);

    let _ = std::fs::remove_file(path);
}

#[tokio::test]
async fn test_not_ready_single_shot_still_closes() {
    let _ = tracing_subscriber::fmt::try_init();

    let path = scratch_file("notready", THREE_RECORDS);
    let (address, server) = spawn_server("NOT_READY").await;

    let mut session = Session::new(config(address, path.clone()), CancellationToken::new());
    let result = session.run().await;

    assert!(result.is_ok());
    assert_eq!(session.state(), SessionState::Closed);
    assert_eq!(server.await.unwrap(), vec![2, 1]);

    let _ = std::fs::remove_file(path);
}

#[tokio::test]
async fn test_shutdown_while_awaiting_reply_aborts_cleanly() {
    let _ = tracing_subscriber::fmt::try_init();

    let path = scratch_file("shutdown", THREE_RECORDS);

    // A server that accepts and then goes silent: the client blocks on the
    // first batch reply until the shutdown monitor fires.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();
    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        // Hold the socket open without ever replying.
        tokio::time::sleep(Duration::from_secs(5)).await;
        drop(stream);
    });

    let cancel = CancellationToken::new();
    let trigger = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            cancel.cancel();
        }
    });

    let mut session = Session::new(config(address, path.clone()), cancel);
    let result = session.run().await;

    assert!(matches!(result, Err(ClientError::Cancelled)));
    assert_eq!(session.state(), SessionState::Aborted);

    trigger.await.unwrap();
    server.abort();
    let _ = std::fs::remove_file(path);
}

#[tokio::test]
async fn test_connect_failure_aborts() {
    let _ = tracing_subscriber::fmt::try_init();

    let path = scratch_file("refused", THREE_RECORDS);

    // Bind then drop to get an address nobody is listening on.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();
    drop(listener);

    let mut session = Session::new(config(address, path.clone()), CancellationToken::new());
    let result = session.run().await;

    assert!(matches!(result, Err(ClientError::Io(_))));
    assert_eq!(session.state(), SessionState::Aborted);

    let _ = std::fs::remove_file(path);
}
