use std::{
    path::{Path, PathBuf},
    sync::{mpsc, Arc, Mutex},
    thread::{self, JoinHandle},
};

use anyhow::{anyhow, Context, Result};
use log::{error, info};
use rusqlite::Connection;
use tokio::sync::oneshot;

mod helpers;
mod migrations;
mod repositories;

use migrations::run_migrations;

type DbJob = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

enum WorkerMessage {
    Run(DbJob),
    Shutdown,
}

struct DatabaseInner {
    sender: mpsc::Sender<WorkerMessage>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for DatabaseInner {
    fn drop(&mut self) {
        let mut guard = match self.worker.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(handle) = guard.take() {
            if let Err(err) = self.sender.send(WorkerMessage::Shutdown) {
                error!("loop database worker unreachable at shutdown: {err}");
            }
            if let Err(join_err) = handle.join() {
                error!("loop database worker panicked: {join_err:?}");
            }
        }
    }
}

/// Handle to the loop/category database. The single SQLite connection
/// lives on a dedicated worker thread; jobs go over an mpsc channel and
/// callers await the result on a oneshot reply.
#[derive(Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
    db_path: Arc<PathBuf>,
}

impl Database {
    pub fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create database directory {}", parent.display())
            })?;
        }

        let (job_tx, job_rx) = mpsc::channel::<WorkerMessage>();
        let (ready_tx, ready_rx) = mpsc::channel();
        let path_for_worker = db_path.clone();

        let worker = thread::Builder::new()
            .name("mindknot-db".into())
            .spawn(move || {
                let mut conn = match Connection::open(&path_for_worker) {
                    Ok(connection) => connection,
                    Err(err) => {
                        let _ = ready_tx.send(Err(anyhow::Error::new(err)
                            .context("failed to open loop database")));
                        return;
                    }
                };

                if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
                    error!("could not enable WAL on loop database: {err}");
                }
                if let Err(err) = conn.pragma_update(None, "foreign_keys", "ON") {
                    error!("could not enable foreign keys on loop database: {err}");
                }

                let init_result =
                    run_migrations(&mut conn).context("loop database migrations failed");
                if ready_tx.send(init_result).is_err() {
                    error!("database opener dropped before the ready signal");
                    return;
                }

                while let Ok(message) = job_rx.recv() {
                    match message {
                        WorkerMessage::Run(job) => {
                            job(&mut conn);
                        }
                        WorkerMessage::Shutdown => break,
                    }
                }

                info!("loop database worker shutting down");
            })
            .with_context(|| "failed to spawn loop database worker")?;

        ready_rx
            .recv()
            .context("loop database worker exited before signaling readiness")??;

        info!("loop database ready at {}", db_path.as_path().display());

        Ok(Self {
            inner: Arc::new(DatabaseInner {
                sender: job_tx,
                worker: Mutex::new(Some(worker)),
            }),
            db_path: Arc::new(db_path),
        })
    }

    pub fn path(&self) -> &Path {
        self.db_path.as_path()
    }

    pub async fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let sender = self.inner.sender.clone();
        let (reply_tx, reply_rx) = oneshot::channel();

        let message = WorkerMessage::Run(Box::new(move |conn| {
            let result = task(conn);
            if reply_tx.send(result).is_err() {
                error!("database caller went away before its reply");
            }
        }));

        sender
            .send(message)
            .map_err(|err| anyhow!("loop database worker unreachable: {err}"))?;

        reply_rx
            .await
            .map_err(|_| anyhow!("loop database worker terminated unexpectedly"))?
    }
}
