use std::sync::{Arc, LazyLock};

use tokio::sync::broadcast;

use crate::{config::Config, internal, listener::Listener, logging, pop3::Pop3};

#[derive(Debug, Clone, Copy)]
pub enum Signal {
    Shutdown,
    Finalised,
}

pub static SHUTDOWN_BROADCAST: LazyLock<broadcast::Sender<Signal>> = LazyLock::new(|| {
    let (sender, _receiver) = broadcast::channel(64);
    sender
});

async fn shutdown() -> anyhow::Result<()> {
    let _ = tokio::signal::ctrl_c().await;
    internal!("CTRL+C entered -- Enter it again to force shutdown");

    let mut receiver = SHUTDOWN_BROADCAST.subscribe();

    SHUTDOWN_BROADCAST
        .send(Signal::Shutdown)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Interrupted, e.to_string()))?;

    loop {
        tokio::select! {
            sig = receiver.recv() => {
                match sig {
                    Ok(s) => tracing::debug!("Received {s:?}"),
                    Err(broadcast::error::RecvError::Closed) => break,
                    Err(e) => tracing::debug!("Received: {e:?}"),
                }
            }

            _ = tokio::signal::ctrl_c() => {
                break;
            }
        }
    }

    Ok(())
}

/// Owns the whole gateway: builds the object store and the listener from
/// the configuration and runs until interrupted.
pub struct Controller {
    config: Config,
}

impl From<Config> for Controller {
    fn from(config: Config) -> Self {
        Self { config }
    }
}

impl Controller {
    /// Run the gateway until the listener fails or a shutdown signal
    /// arrives.
    ///
    /// # Errors
    ///
    /// If the listening socket cannot be bound.
    pub async fn run(self) -> anyhow::Result<()> {
        logging::init();

        internal!("Controller running");

        let store = self.config.store.build();
        let gateway = Arc::new(Pop3::new(
            store,
            self.config.mail_root.clone(),
            self.config.banner.clone(),
        ));
        let listener = Listener::new(self.config.socket, gateway);

        tokio::select! {
            result = listener.serve() => result?,
            _ = shutdown() => {}
        };

        internal!("Shutting down...");

        Ok(())
    }
}
