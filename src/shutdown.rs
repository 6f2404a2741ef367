use console::Term;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Cooperative stop signal shared by the poll loop and the Ctrl+C handler
#[derive(Clone)]
pub struct Shutdown {
    requested: Arc<AtomicBool>,
    sender: broadcast::Sender<()>,
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Shutdown {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(1);
        Self {
            requested: Arc::new(AtomicBool::new(false)),
            sender,
        }
    }

    #[inline]
    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }

    pub fn request(&self) {
        self.requested.store(true, Ordering::Release);
        let _ = self.sender.send(());
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.sender.subscribe()
    }

    /// Resolve once shutdown has been requested
    pub async fn wait(&self, receiver: &mut broadcast::Receiver<()>) {
        if self.is_requested() {
            return;
        }
        let _ = receiver.recv().await;
    }

    /// First Ctrl+C asks the loop to stop; the second one exits immediately.
    pub fn install_ctrl_c_handler(&self) {
        let shutdown = self.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to install Ctrl+C handler: {}", e);
                return;
            }

            let is_tty = Term::stderr().is_term();
            if is_tty {
                eprintln!("\n\nShutdown requested, finishing current repository...");
                eprintln!("Press Ctrl+C again to force quit.");
            } else {
                warn!("Shutdown requested, finishing current repository");
            }
            shutdown.request();

            if tokio::signal::ctrl_c().await.is_ok() {
                debug!("Second Ctrl+C received");
                if is_tty {
                    eprintln!("Force quit!");
                }
                std::process::exit(130);
            }
        });
    }
}
