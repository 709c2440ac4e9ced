//! Test harness driving a complete POP3 session over an in-memory duplex
//! stream: a real `Session` runs as a spawned task on one end while the
//! test plays the client on the other, byte-for-byte.

use std::{net::SocketAddr, path::Path, sync::Arc};

use popgate::{pop3::Session, store::MemoryStore};
use tokio::{
    io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader, DuplexStream, ReadHalf, WriteHalf},
    task::JoinHandle,
};

pub struct SessionHarness {
    reader: BufReader<ReadHalf<DuplexStream>>,
    writer: WriteHalf<DuplexStream>,
    handle: JoinHandle<anyhow::Result<()>>,
}

impl SessionHarness {
    /// Start a session against the given store and mail root, consuming
    /// the greeting.
    pub async fn connect(store: &MemoryStore, mail_root: &Path) -> Self {
        let (client, server) = tokio::io::duplex(64 * 1024);
        let peer: SocketAddr = "127.0.0.1:0".parse().unwrap();

        let session = Session::create(
            server,
            peer,
            Arc::new(store.clone()),
            mail_root.to_path_buf(),
            String::from("popgate test server"),
        );
        let handle = tokio::spawn(session.run());

        let (reader, writer) = tokio::io::split(client);
        let mut harness = Self {
            reader: BufReader::new(reader),
            writer,
            handle,
        };

        let greeting = harness.read_line().await;
        assert_eq!(greeting, "+OK popgate test server");

        harness
    }

    /// Connect and drive the session into the Transaction phase.
    pub async fn sign_in(store: &MemoryStore, mail_root: &Path, user: &str) -> Self {
        let mut harness = Self::connect(store, mail_root).await;

        let response = harness.command(&format!("USER {user}")).await;
        assert_eq!(response, "+OK", "USER should succeed");
        let response = harness.command("PASS anything").await;
        assert_eq!(response, "+OK user signed in");

        harness
    }

    /// Read one response line, stripped of its CRLF.
    pub async fn read_line(&mut self) -> String {
        let mut line = String::new();
        self.reader
            .read_line(&mut line)
            .await
            .expect("session closed the stream unexpectedly");
        line.trim_end_matches(['\r', '\n']).to_string()
    }

    /// Send a command expecting a single-line response.
    pub async fn command(&mut self, line: &str) -> String {
        self.send(line).await;
        self.read_line().await
    }

    /// Send a command expecting a multi-line response. Returns the status
    /// line followed by the body lines, terminator excluded. Negative
    /// responses come back as just the status line. Not safe for bodies
    /// containing a literal `.` line; use [`Self::command_raw`] there.
    pub async fn command_multiline(&mut self, line: &str) -> Vec<String> {
        self.send(line).await;

        let status = self.read_line().await;
        let mut lines = vec![status.clone()];
        if status.starts_with("-ERR") {
            return lines;
        }

        loop {
            let line = self.read_line().await;
            if line == "." {
                return lines;
            }
            lines.push(line);
        }
    }

    /// Send a command and read back exactly `len` raw bytes, stuffing and
    /// all.
    pub async fn command_raw(&mut self, line: &str, len: usize) -> Vec<u8> {
        self.send(line).await;

        let mut raw = vec![0_u8; len];
        self.reader
            .read_exact(&mut raw)
            .await
            .expect("short response");
        raw
    }

    async fn send(&mut self, line: &str) {
        self.writer
            .write_all(format!("{line}\r\n").as_bytes())
            .await
            .expect("write to session failed");
    }

    /// Clean termination: QUIT, then wait for the session task.
    pub async fn quit(mut self) {
        let response = self.command("QUIT").await;
        assert_eq!(response, "+OK goodbye");

        self.handle
            .await
            .expect("session task panicked")
            .expect("session ended with an error");
    }

    /// Abrupt termination: drop the client side without QUIT and wait for
    /// the session task to notice the EOF.
    pub async fn disconnect(self) {
        drop(self.reader);
        drop(self.writer);

        self.handle
            .await
            .expect("session task panicked")
            .expect("session ended with an error");
    }
}

/// A single-header-line message whose computed total size is exactly
/// `total` bytes.
pub fn message_of_size(total: usize) -> String {
    assert!(total >= 2);
    "x".repeat(total - 2)
}
