use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use thiserror::Error;
use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, ReadHalf, WriteHalf,
};

use crate::{
    incoming, internal,
    mailbox::{
        metadata::split_blocks, sync, DeletionSet, Mailbox, MailboxError, MessageMetadata,
        Snapshot,
    },
    outgoing,
    store::ObjectStore,
};

use super::{command::Command, response::Response, State};

#[derive(PartialEq, Eq, Debug)]
pub enum Event {
    KeepAlive,
    Close,
}

/// Command-level failures. Every variant renders as a `-ERR` line and
/// leaves the session phase unchanged; none of them ends the connection.
#[derive(Debug, Error)]
pub enum Pop3Error {
    #[error("no such message")]
    NoSuchMessage,

    #[error("message deleted")]
    Deleted,

    #[error("message already deleted")]
    AlreadyDeleted,

    #[error("USER required first")]
    NoUser,

    #[error("could not synchronise mailbox: {0}")]
    Sync(#[source] MailboxError),

    #[error("failed to read message {0}")]
    Content(String),
}

/// What one session carries: its phase, its mailbox, the snapshot frozen
/// at sign-in and the tentative deletions.
#[derive(Default)]
struct Context {
    state: State,
    mailbox: Option<Mailbox>,
    snapshot: Option<Snapshot>,
    deleted: DeletionSet,
}

pub struct Session<Stream: AsyncRead + AsyncWrite + Send> {
    peer: SocketAddr,
    reader: BufReader<ReadHalf<Stream>>,
    writer: WriteHalf<Stream>,
    banner: String,
    store: Arc<dyn ObjectStore>,
    mail_root: PathBuf,
    context: Context,
}

impl<Stream: AsyncRead + AsyncWrite + Send> Session<Stream> {
    pub fn create(
        stream: Stream,
        peer: SocketAddr,
        store: Arc<dyn ObjectStore>,
        mail_root: PathBuf,
        banner: String,
    ) -> Self {
        let (reader, writer) = tokio::io::split(stream);

        Self {
            peer,
            reader: BufReader::new(reader),
            writer,
            banner,
            store,
            mail_root,
            context: Context::default(),
        }
    }

    /// Drive the session: greet, then read one line at a time, fully
    /// handling each command (including any multi-line write) before the
    /// next read. A read or write failure, or the client closing the
    /// stream, ends the loop immediately; pending deletions are committed
    /// only by an explicit `QUIT`.
    pub async fn run(mut self) -> anyhow::Result<()> {
        internal!("Connected to {}", self.peer);

        let banner = self.banner.clone();
        self.send(&Response::ok(banner)).await?;

        let mut line = String::new();
        loop {
            line.clear();
            if self.reader.read_line(&mut line).await? == 0 {
                internal!("Client {} disconnected", self.peer);
                break;
            }

            let (response, event) = self.execute(line.trim_end_matches(['\r', '\n'])).await;
            self.send(&response).await?;

            if event == Event::Close {
                break;
            }
        }

        internal!("Connection to {} closed", self.peer);
        Ok(())
    }

    async fn send(&mut self, response: &Response) -> std::io::Result<()> {
        let wire = response.render();
        outgoing!("{}", wire.lines().next().unwrap_or_default());

        self.writer.write_all(wire.as_bytes()).await?;
        self.writer.flush().await
    }

    /// Parse and dispatch a single command line, producing the response
    /// and whether the connection should stay open. Phase legality is
    /// checked here, in one place, before any handler runs.
    async fn execute(&mut self, line: &str) -> (Response, Event) {
        let command = match Command::try_from(line) {
            Ok(command) => command,
            Err(err) => {
                incoming!(level = DEBUG, "Rejected line: {err}");
                return (Response::err(err.to_string()), Event::KeepAlive);
            }
        };

        incoming!("{command}");

        if let Some(required) = command.required_state() {
            if self.context.state != required {
                return (
                    Response::err(format!(
                        "command not valid in the {} state",
                        self.context.state
                    )),
                    Event::KeepAlive,
                );
            }
        }

        let result = match command {
            Command::User(name) => self.user(&name).await,
            Command::Pass(_) => self.pass(),
            Command::Stat => self.stat(),
            Command::List(None) => self.list_all(),
            Command::List(Some(n)) => self.list_one(n),
            Command::Uidl(None) => self.uidl_all(),
            Command::Uidl(Some(n)) => self.uidl_one(n),
            Command::Top(n, lines) => self.top(n, lines).await,
            Command::Retr(n) => self.retr(n).await,
            Command::Dele(n) => self.dele(n),
            Command::Rset => self.rset(),
            Command::Noop => Ok(Response::ok("")),
            Command::Quit => return (self.quit().await, Event::Close),
        };

        (
            result.unwrap_or_else(|err| Response::err(err.to_string())),
            Event::KeepAlive,
        )
    }

    /// `USER`: open the local mailbox, synchronise it against the remote
    /// store and freeze this session's snapshot. On failure the phase is
    /// unchanged and the client may retry.
    async fn user(&mut self, name: &str) -> Result<Response, Pop3Error> {
        let mailbox = Mailbox::open(&self.mail_root, name)
            .await
            .map_err(Pop3Error::Sync)?;
        let fetched = sync(self.store.as_ref(), &mailbox)
            .await
            .map_err(Pop3Error::Sync)?;
        let snapshot = Snapshot::build(&mailbox).await.map_err(Pop3Error::Sync)?;

        internal!(
            "Synchronised {fetched} new message(s) for {name}; {} known",
            snapshot.len()
        );

        self.context.mailbox = Some(mailbox);
        self.context.snapshot = Some(snapshot);

        Ok(Response::ok(""))
    }

    /// `PASS`: any credential is accepted (this is a trusted local
    /// gateway), but a successful `USER` must have come first.
    fn pass(&mut self) -> Result<Response, Pop3Error> {
        if self.context.snapshot.is_none() {
            return Err(Pop3Error::NoUser);
        }

        self.context.deleted = DeletionSet::default();
        self.context.state = State::Transaction;

        Ok(Response::ok("user signed in"))
    }

    fn snapshot(&self) -> Result<&Snapshot, Pop3Error> {
        self.context.snapshot.as_ref().ok_or(Pop3Error::NoUser)
    }

    /// Shared validation for every numbered command: the position must be
    /// inside the snapshot and not already marked deleted.
    fn resolve(&self, position: usize) -> Result<&MessageMetadata, Pop3Error> {
        let metadata = self
            .snapshot()?
            .get(position)
            .ok_or(Pop3Error::NoSuchMessage)?;

        if self.context.deleted.contains(position) {
            return Err(Pop3Error::Deleted);
        }

        Ok(metadata)
    }

    fn stat(&self) -> Result<Response, Pop3Error> {
        let (count, size) = self.snapshot()?.stat(&self.context.deleted);
        Ok(Response::ok(format!("{count} {size}")))
    }

    fn list_all(&self) -> Result<Response, Pop3Error> {
        let snapshot = self.snapshot()?;
        let (count, size) = snapshot.stat(&self.context.deleted);

        let lines = snapshot
            .iter()
            .filter(|(position, _)| !self.context.deleted.contains(*position))
            .map(|(position, metadata)| format!("{position} {}", metadata.total_size))
            .collect();

        Ok(Response::ok_multiline(
            format!("{count} messages ({size} octets)"),
            lines,
        ))
    }

    fn list_one(&self, position: usize) -> Result<Response, Pop3Error> {
        let metadata = self.resolve(position)?;
        Ok(Response::ok(format!("{position} {}", metadata.total_size)))
    }

    fn uidl_all(&self) -> Result<Response, Pop3Error> {
        let lines = self
            .snapshot()?
            .iter()
            .filter(|(position, _)| !self.context.deleted.contains(*position))
            .map(|(position, metadata)| format!("{position} {}", metadata.remote_id))
            .collect();

        Ok(Response::ok_multiline("", lines))
    }

    fn uidl_one(&self, position: usize) -> Result<Response, Pop3Error> {
        let metadata = self.resolve(position)?;
        Ok(Response::ok(format!("{position} {}", metadata.remote_id)))
    }

    async fn content_of(&self, metadata: &MessageMetadata) -> Result<String, Pop3Error> {
        let mailbox = self.context.mailbox.as_ref().ok_or(Pop3Error::NoUser)?;
        mailbox
            .read_message(&metadata.remote_id)
            .await
            .map_err(|_| Pop3Error::Content(metadata.remote_id.clone()))
    }

    /// `RETR`: the whole message, dot-stuffed by the response framing.
    async fn retr(&self, position: usize) -> Result<Response, Pop3Error> {
        let metadata = self.resolve(position)?;
        let content = self.content_of(metadata).await?;

        Ok(Response::ok_multiline(
            format!("{} octets", metadata.total_size),
            content.lines().map(str::to_string).collect(),
        ))
    }

    /// `TOP`: the full header block, the blank separator, then at most
    /// `limit` body lines.
    async fn top(&self, position: usize, limit: usize) -> Result<Response, Pop3Error> {
        let metadata = self.resolve(position)?;
        let content = self.content_of(metadata).await?;

        let (headers, body) = split_blocks(&content);
        let mut lines: Vec<String> = headers.iter().map(|line| (*line).to_string()).collect();

        // body[0] is the separator blank line and doesn't count against
        // the limit
        let mut body = body.iter();
        if let Some(separator) = body.next() {
            lines.push((*separator).to_string());
            lines.extend(body.take(limit).map(|line| (*line).to_string()));
        }

        Ok(Response::ok_multiline(
            format!("{} octets", metadata.total_size),
            lines,
        ))
    }

    /// `DELE`: a repeated delete of the same position gets its own
    /// wording, distinct from the read commands' "message deleted".
    fn dele(&mut self, position: usize) -> Result<Response, Pop3Error> {
        self.resolve(position).map_err(|err| match err {
            Pop3Error::Deleted => Pop3Error::AlreadyDeleted,
            err => err,
        })?;
        self.context.deleted.mark(position);

        Ok(Response::ok(format!("message {position} deleted")))
    }

    fn rset(&mut self) -> Result<Response, Pop3Error> {
        let discarded = self.context.deleted.len();
        self.context.deleted.reset();

        if discarded > 0 {
            internal!("Discarded {discarded} pending deletion(s)");
        }

        Ok(Response::ok(""))
    }

    /// `QUIT`: in the Transaction phase, enter Update and commit the
    /// tentative deletions before closing. Individual removal failures
    /// are logged and counted but never abort the rest of the commit or
    /// the close itself.
    async fn quit(&mut self) -> Response {
        if self.context.state == State::Transaction {
            self.context.state = State::Update;

            if !self.context.deleted.is_empty() {
                let (removed, failed) = self.commit().await;
                internal!("Committed {removed} deletion(s), {failed} failure(s)");
            }
        }

        Response::ok("goodbye")
    }

    async fn commit(&mut self) -> (usize, usize) {
        let (Some(mailbox), Some(snapshot)) = (&self.context.mailbox, &self.context.snapshot)
        else {
            return (0, 0);
        };

        let mut removed = 0;
        let mut failed = 0;
        for position in self.context.deleted.iter() {
            let Some(metadata) = snapshot.get(position) else {
                continue;
            };

            match mailbox.remove_message(&metadata.remote_id).await {
                Ok(()) => removed += 1,
                Err(err) => {
                    internal!(
                        level = WARN,
                        "Failed to remove {}: {err}",
                        metadata.remote_id
                    );
                    failed += 1;
                }
            }
        }

        (removed, failed)
    }
}
