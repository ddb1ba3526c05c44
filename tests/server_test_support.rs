//! Test utilities for shell server integration tests.
//!
//! Starts an acceptor on an ephemeral port and provides line-oriented
//! clients.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use shellport::config::ServerConfig;
use shellport::server::{Acceptor, AcceptorHandle, StopReason};
use shellport::shell::{Binding, BindingShell};

/// Accept timeout used by tests, short so shutdown is observed quickly.
pub const TEST_ACCEPT_TIMEOUT: Duration = Duration::from_millis(100);

/// How long tests wait for asynchronous state changes.
pub const WAIT_LIMIT: Duration = Duration::from_secs(5);

/// A running acceptor. Shut down when dropped.
pub struct TestServer {
    pub handle: AcceptorHandle,
    pub shell: Arc<BindingShell>,
    task: Option<JoinHandle<StopReason>>,
}

impl TestServer {
    /// Starts a server with no startup scripts.
    pub async fn start() -> Self {
        Self::start_with_shell(BindingShell::new(Binding::new()), Vec::new()).await
    }

    /// Starts a server that runs `scripts` at the start of every session.
    pub async fn start_with_shell(shell: BindingShell, scripts: Vec<String>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let config = ServerConfig::new(1)
            .with_accept_timeout(TEST_ACCEPT_TIMEOUT)
            .with_startup_scripts(scripts);
        let shell = Arc::new(shell);

        let acceptor = Acceptor::from_listener(listener, &config, Arc::clone(&shell)).unwrap();
        let handle = acceptor.handle();
        let task = acceptor.spawn();

        Self {
            handle,
            shell,
            task: Some(task),
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.handle.local_addr()
    }

    /// Connects a new client.
    pub async fn connect(&self) -> TestClient {
        TestClient::connect(self.addr()).await
    }

    /// Waits until the server tracks exactly `expected` live clients.
    pub async fn wait_for_clients(&self, expected: usize) {
        let handle = self.handle.clone();
        tokio::time::timeout(WAIT_LIMIT, async move {
            while handle.client_count() != expected {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap_or_else(|_| {
            panic!(
                "expected {} clients, have {}",
                expected,
                self.handle.client_count()
            )
        });
    }

    /// Requests shutdown and waits for the accept loop task to finish.
    pub async fn stop(&mut self) {
        self.handle.shutdown();
        if let Some(task) = self.task.take() {
            let reason = tokio::time::timeout(WAIT_LIMIT, task)
                .await
                .expect("accept loop should stop")
                .unwrap();
            assert!(matches!(reason, StopReason::Shutdown), "{}", reason);
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.shutdown();
    }
}

/// A line-oriented shell client.
pub struct TestClient {
    lines: Lines<BufReader<OwnedReadHalf>>,
    write: OwnedWriteHalf,
}

impl TestClient {
    pub async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (read, write) = stream.into_split();
        Self {
            lines: BufReader::new(read).lines(),
            write,
        }
    }

    /// Sends one line of input.
    pub async fn send(&mut self, line: &str) {
        self.write.write_all(line.as_bytes()).await.unwrap();
        self.write.write_all(b"\n").await.unwrap();
    }

    /// Receives one line of output. Panics on EOF or timeout.
    pub async fn recv(&mut self) -> String {
        tokio::time::timeout(WAIT_LIMIT, self.lines.next_line())
            .await
            .expect("timed out waiting for a line")
            .unwrap()
            .expect("connection closed while waiting for a line")
    }

    /// Sends `line` and returns the single line of output.
    pub async fn eval(&mut self, line: &str) -> String {
        self.send(line).await;
        self.recv().await
    }

    /// Asserts that the server closed the connection.
    ///
    /// A reset counts as closed.
    pub async fn assert_closed(&mut self) {
        let next = tokio::time::timeout(WAIT_LIMIT, self.lines.next_line())
            .await
            .expect("connection should have been closed");
        match next {
            Ok(None) | Err(_) => {}
            Ok(Some(line)) => panic!("expected closed connection, got line {:?}", line),
        }
    }
}
