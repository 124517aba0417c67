//! The scrape controller: a single task owning the scrape registry.
//!
//! All requests and all progress updates arrive through one mailbox and are
//! handled one at a time in arrival order, so every caller sees a
//! consistent registry without locks.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{mpsc, oneshot, OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

use encore_core::{ScrapeError, ScrapeRecord, ScrapeStatus};

use crate::walker::{TreeWalker, WalkContext, WalkOutcome};

const MAILBOX_SIZE: usize = 256;

/// Which scrapes a request applies to.
#[derive(Debug, Clone)]
pub(crate) enum Target {
    Root(PathBuf),
    All,
}

impl Target {
    fn matches(&self, record: &ScrapeRecord) -> bool {
        match self {
            Target::Root(root) => record.root_path == *root,
            Target::All => true,
        }
    }
}

pub(crate) enum Message {
    Start {
        root: PathBuf,
        reply: oneshot::Sender<Result<ScrapeRecord, ScrapeError>>,
    },
    /// Signal the targeted active scrapes; replies with tokens that fire
    /// once each of them has settled.
    Stop {
        target: Target,
        reply: oneshot::Sender<Vec<CancellationToken>>,
    },
    Status {
        target: Target,
        reply: oneshot::Sender<Vec<ScrapeRecord>>,
    },
    /// Settlement token of one scrape, if it is known.
    Settled {
        root: PathBuf,
        reply: oneshot::Sender<Option<CancellationToken>>,
    },
    Update {
        generation: u64,
        record: ScrapeRecord,
    },
}

struct Entry {
    generation: u64,
    record: ScrapeRecord,
    cancel: CancellationToken,
    settled: CancellationToken,
}

pub(crate) struct Controller {
    registry: HashMap<PathBuf, Entry>,
    ctx: WalkContext,
    permits: Arc<Semaphore>,
    mailbox: mpsc::WeakSender<Message>,
    next_generation: u64,
}

impl Controller {
    /// Spawn the controller task and return its mailbox.
    ///
    /// The task ends once every sender, including those held by running
    /// workers, has been dropped.
    pub(crate) fn spawn(ctx: WalkContext, max_concurrent: usize) -> mpsc::Sender<Message> {
        let (tx, rx) = mpsc::channel(MAILBOX_SIZE);
        let controller = Controller {
            registry: HashMap::new(),
            ctx,
            permits: Arc::new(Semaphore::new(max_concurrent)),
            mailbox: tx.downgrade(),
            next_generation: 0,
        };
        tokio::spawn(controller.run(rx));
        tx
    }

    async fn run(mut self, mut rx: mpsc::Receiver<Message>) {
        debug!("Scrape controller started");
        while let Some(message) = rx.recv().await {
            self.handle(message);
        }
        debug!("Scrape controller stopped");
    }

    fn handle(&mut self, message: Message) {
        match message {
            Message::Start { root, reply } => {
                let _ = reply.send(self.start(root));
            }
            Message::Stop { target, reply } => {
                let _ = reply.send(self.stop(&target));
            }
            Message::Status { target, reply } => {
                let records = self
                    .registry
                    .values()
                    .filter(|e| target.matches(&e.record))
                    .map(|e| e.record.clone())
                    .collect();
                let _ = reply.send(records);
            }
            Message::Settled { root, reply } => {
                let _ = reply.send(self.registry.get(&root).map(|e| e.settled.clone()));
            }
            Message::Update { generation, record } => self.update(generation, record),
        }
    }

    fn start(&mut self, root: PathBuf) -> Result<ScrapeRecord, ScrapeError> {
        if let Some(active) = self
            .registry
            .values()
            .find(|e| e.record.is_active() && e.record.overlaps(&root))
        {
            debug!(
                root = %root.display(),
                active = %active.record.root_path.display(),
                "Overlapping scrape is still active"
            );
            return Err(ScrapeError::AlreadyQueued { root });
        }
        let mailbox = self.mailbox.upgrade().ok_or(ScrapeError::EngineClosed)?;

        self.next_generation += 1;
        let generation = self.next_generation;
        let record = ScrapeRecord::queued(&root);
        let cancel = CancellationToken::new();
        let settled = CancellationToken::new();

        let worker = Worker {
            ctx: self.ctx.clone(),
            record: record.clone(),
            generation,
            cancel: cancel.clone(),
            settled: settled.clone(),
            permits: self.permits.clone(),
            mailbox,
        };
        let span = info_span!("scrape", root = %root.display());
        tokio::spawn(worker.run().instrument(span));

        if let Some(previous) = self.registry.insert(
            root,
            Entry {
                generation,
                record: record.clone(),
                cancel,
                settled,
            },
        ) {
            debug!(status = %previous.record.status, "Replacing finished scrape record");
        }
        Ok(record)
    }

    fn stop(&mut self, target: &Target) -> Vec<CancellationToken> {
        self.registry
            .values()
            .filter(|e| e.record.is_active() && target.matches(&e.record))
            .map(|e| {
                info!(root = %e.record.root_path.display(), "Stopping scrape");
                e.cancel.cancel();
                e.settled.clone()
            })
            .collect()
    }

    fn update(&mut self, generation: u64, record: ScrapeRecord) {
        match self.registry.get_mut(&record.root_path) {
            Some(entry) if entry.generation == generation => entry.record = record,
            _ => debug!(root = %record.root_path.display(), "Dropping stale scrape update"),
        }
    }
}

/// Drives one scrape from queued to a terminal state.
struct Worker {
    ctx: WalkContext,
    record: ScrapeRecord,
    generation: u64,
    cancel: CancellationToken,
    settled: CancellationToken,
    permits: Arc<Semaphore>,
    mailbox: mpsc::Sender<Message>,
}

impl Worker {
    async fn run(mut self) {
        // Fires on every exit path, including unwinding.
        let _settled = self.settled.clone().drop_guard();

        info!("Scrape queued");
        let Some(permit) = self.acquire().await else {
            info!("Scrape cancelled before it started");
            self.record.finish(ScrapeStatus::Cancelled, None);
            self.publish().await;
            return;
        };

        info!("Scrape starting");
        self.record.status = ScrapeStatus::Running;
        self.record.current_path = self.record.root_path.clone();
        self.publish().await;

        let (mut record, outcome) = self.walk(permit).await;
        match outcome {
            Ok(WalkOutcome::Completed) => record.finish(ScrapeStatus::Finished, None),
            Ok(WalkOutcome::Cancelled) => record.finish(ScrapeStatus::Cancelled, None),
            Err(err) => {
                warn!(error = %err, "Scrape failed");
                record.finish(ScrapeStatus::Failed, Some(err.to_string()));
            }
        }
        info!(
            status = %record.status,
            scraped = record.files_scraped,
            new = record.new_files,
            updated = record.updated_files,
            skipped = record.files_skipped,
            "Scrape ended"
        );
        self.record = record;
        self.publish().await;
    }

    /// Wait for a run slot unless cancelled first.
    async fn acquire(&self) -> Option<OwnedSemaphorePermit> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            permit = self.permits.clone().acquire_owned() => permit.ok(),
        }
    }

    async fn walk(
        &self,
        permit: OwnedSemaphorePermit,
    ) -> (ScrapeRecord, Result<WalkOutcome, ScrapeError>) {
        let ctx = self.ctx.clone();
        let record = self.record.clone();
        let cancel = self.cancel.clone();
        let mailbox = self.mailbox.clone();
        let generation = self.generation;

        // Last snapshot seen, kept so a panicking walk still reports the
        // files it already committed.
        let last = Arc::new(Mutex::new(record.clone()));
        let seen = last.clone();

        let joined = tokio::task::spawn_blocking(move || {
            // The slot is held exactly as long as the walk runs.
            let _permit = permit;
            let mut walker = TreeWalker::new(ctx, record, cancel, |snapshot: &ScrapeRecord| {
                *seen.lock().unwrap_or_else(PoisonError::into_inner) = snapshot.clone();
                let _ = mailbox.blocking_send(Message::Update {
                    generation,
                    record: snapshot.clone(),
                });
            });
            let outcome = walker.run();
            (walker.into_record(), outcome)
        })
        .await;

        match joined {
            Ok(result) => result,
            Err(err) => {
                let record = last.lock().unwrap_or_else(PoisonError::into_inner).clone();
                (
                    record,
                    Err(ScrapeError::WorkerPanicked {
                        message: err.to_string(),
                    }),
                )
            }
        }
    }

    async fn publish(&self) {
        let update = Message::Update {
            generation: self.generation,
            record: self.record.clone(),
        };
        if self.mailbox.send(update).await.is_err() {
            debug!("Scrape controller gone, update dropped");
        }
    }
}
