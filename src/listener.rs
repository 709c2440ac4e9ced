use std::{net::SocketAddr, sync::Arc};

use futures_util::future::join_all;
use tokio::net::TcpListener;

use crate::{
    controller::{Signal, SHUTDOWN_BROADCAST},
    internal,
    pop3::Pop3,
};

/// The TCP accept loop. Every accepted connection becomes an independent
/// spawned session; sessions share nothing in memory beyond the gateway
/// handle itself.
pub struct Listener {
    socket: SocketAddr,
    gateway: Arc<Pop3>,
}

impl Listener {
    #[must_use]
    pub fn new(socket: SocketAddr, gateway: Arc<Pop3>) -> Self {
        Self { socket, gateway }
    }

    pub async fn serve(&self) -> anyhow::Result<()> {
        let mut sessions = Vec::default();

        let (address, port) = (self.socket.ip(), self.socket.port());
        let listener = TcpListener::bind(self.socket).await?;
        internal!(level = INFO, "POP3 listener on {address}:{port}");

        let mut receiver = SHUTDOWN_BROADCAST.subscribe();

        loop {
            tokio::select! {
                sig = receiver.recv() => {
                    if matches!(sig, Ok(Signal::Shutdown)) {
                        internal!(level = INFO, "POP3 listener {}:{} received shutdown signal, finishing sessions ...", address, port);
                        join_all(sessions).await;
                        SHUTDOWN_BROADCAST.send(Signal::Finalised)?;
                        break;
                    }
                }

                connection = listener.accept() => {
                    let (stream, peer) = connection?;
                    let session = self.gateway.handle(stream, peer);
                    sessions.push(tokio::spawn(async move {
                        if let Err(err) = session.run().await {
                            internal!(level = WARN, "Session for {peer} ended with error: {err}");
                        }
                    }));
                }
            }
        }

        Ok(())
    }
}
