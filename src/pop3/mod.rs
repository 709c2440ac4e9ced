pub mod command;
pub mod response;
pub mod session;

use core::fmt::{self, Display, Formatter};
use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use tokio::net::TcpStream;

use crate::store::ObjectStore;

pub use command::Command;
pub use response::{Response, Status};
pub use session::Session;

/// The POP3 session phases. A session starts Unauthorized, reaches
/// Transaction after `USER`/`PASS`, and ends in Update when a `QUIT`
/// commits the pending deletions. Update is terminal: the connection
/// closes immediately afterwards.
#[derive(PartialEq, Eq, Hash, Debug, Clone, Copy, Default)]
pub enum State {
    #[default]
    Unauthorized,
    Transaction,
    Update,
}

impl Display for State {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        fmt.write_str(match self {
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Transaction => "TRANSACTION",
            Self::Update => "UPDATE",
        })
    }
}

/// The gateway itself: everything a new connection needs to become a
/// session.
pub struct Pop3 {
    store: Arc<dyn ObjectStore>,
    mail_root: PathBuf,
    banner: String,
}

impl Pop3 {
    #[must_use]
    pub fn new(store: Arc<dyn ObjectStore>, mail_root: PathBuf, banner: String) -> Self {
        Self {
            store,
            mail_root,
            banner,
        }
    }

    #[must_use]
    pub fn handle(&self, stream: TcpStream, peer: SocketAddr) -> Session<TcpStream> {
        Session::create(
            stream,
            peer,
            Arc::clone(&self.store),
            self.mail_root.clone(),
            self.banner.clone(),
        )
    }
}
