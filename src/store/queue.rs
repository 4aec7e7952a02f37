use std::{
    sync::{mpsc, Mutex},
    thread::{self, JoinHandle},
};

use anyhow::{Context, Result};
use log::{debug, error, warn};
use tokio::sync::oneshot;

use super::{PersistedRecord, PersistedSessionStore};

enum PersistCommand {
    Save(Box<PersistedRecord>),
    Clear,
    Flush(oneshot::Sender<()>),
    Shutdown,
}

/// Applies session writes one at a time, in the order they were queued.
///
/// A `clear` queued after a `save` always lands last. Failures are logged and
/// dropped; the in-memory session never waits on them.
pub struct PersistQueue {
    sender: mpsc::Sender<PersistCommand>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl PersistQueue {
    pub fn new(store: PersistedSessionStore) -> Result<Self> {
        let (sender, receiver) = mpsc::channel::<PersistCommand>();

        let worker = thread::Builder::new()
            .name("monkmode-persist".into())
            .spawn(move || {
                while let Ok(command) = receiver.recv() {
                    match command {
                        PersistCommand::Save(record) => {
                            if let Err(err) = store.save(&record) {
                                warn!("Failed to persist session; recovery degraded: {err}");
                            } else {
                                debug!("Persisted session ({:?})", record.status);
                            }
                        }
                        PersistCommand::Clear => {
                            if let Err(err) = store.clear() {
                                warn!("Failed to clear persisted session: {err}");
                            } else {
                                debug!("Cleared persisted session");
                            }
                        }
                        PersistCommand::Flush(done) => {
                            let _ = done.send(());
                        }
                        PersistCommand::Shutdown => break,
                    }
                }
            })
            .context("failed to spawn persistence worker thread")?;

        Ok(Self {
            sender,
            worker: Mutex::new(Some(worker)),
        })
    }

    pub fn save(&self, record: PersistedRecord) {
        self.send(PersistCommand::Save(Box::new(record)));
    }

    pub fn clear(&self) {
        self.send(PersistCommand::Clear);
    }

    /// Resolves once every write queued before this call has been applied.
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        self.send(PersistCommand::Flush(done_tx));
        let _ = done_rx.await;
    }

    fn send(&self, command: PersistCommand) {
        if self.sender.send(command).is_err() {
            error!("Persistence worker is gone; write dropped");
        }
    }
}

impl Drop for PersistQueue {
    fn drop(&mut self) {
        let mut guard = match self.worker.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(handle) = guard.take() {
            let _ = self.sender.send(PersistCommand::Shutdown);
            if let Err(join_err) = handle.join() {
                error!("Failed to join persistence thread: {join_err:?}");
            }
        }
    }
}
