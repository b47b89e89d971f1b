//! Single-writer actor for concurrent producers.
//!
//! One tokio task owns the [`PatternStore`]; price feeds and pattern
//! detectors talk to it through cloned [`TrackerHandle`]s. Requests are
//! applied in channel arrival order, so every tick sees one consistent
//! price across all entries.

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use super::events::{Event, Notice};
use super::state::TrackedPattern;
use super::store::PatternStore;
use crate::clock::Clock;
use crate::error::TrackerError;
use crate::pattern::DetectedPattern;
use crate::stats::AccuracyStats;

type Reply<T> = oneshot::Sender<T>;

enum Request {
    Apply {
        event: Event,
        reply: Reply<Result<Vec<Notice>, TrackerError>>,
    },
    Intake {
        patterns: Vec<DetectedPattern>,
        price: f64,
        reply: Reply<Result<Vec<Notice>, TrackerError>>,
    },
    Tick {
        price: f64,
        reply: Reply<Result<Vec<Notice>, TrackerError>>,
    },
    ClearResolved {
        reply: Reply<usize>,
    },
    Remove {
        id: String,
        reply: Reply<bool>,
    },
    Stats {
        reply: Reply<AccuracyStats>,
    },
    Snapshot {
        reply: Reply<Vec<TrackedPattern>>,
    },
}

#[derive(Clone)]
pub struct TrackerHandle {
    tx: mpsc::Sender<Request>,
}

impl TrackerHandle {
    /// Move `store` into its own task. The task ends once every handle is
    /// dropped and yields the store back through the join handle.
    pub fn spawn<C>(store: PatternStore<C>, capacity: usize) -> (Self, JoinHandle<PatternStore<C>>)
    where
        C: Clock + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let task = tokio::spawn(run(store, rx));
        (Self { tx }, task)
    }

    /// Apply a pre-stamped event, e.g. one built from a feed record.
    pub async fn apply(&self, event: Event) -> Result<Vec<Notice>, TrackerError> {
        self.call(|reply| Request::Apply { event, reply }).await?
    }

    pub async fn intake(&self, patterns: Vec<DetectedPattern>, price: f64) -> Result<Vec<Notice>, TrackerError> {
        self.call(|reply| Request::Intake { patterns, price, reply }).await?
    }

    pub async fn tick(&self, price: f64) -> Result<Vec<Notice>, TrackerError> {
        self.call(|reply| Request::Tick { price, reply }).await?
    }

    pub async fn clear_resolved(&self) -> Result<usize, TrackerError> {
        self.call(|reply| Request::ClearResolved { reply }).await
    }

    pub async fn remove(&self, id: &str) -> Result<bool, TrackerError> {
        let id = id.to_string();
        self.call(|reply| Request::Remove { id, reply }).await
    }

    pub async fn stats(&self) -> Result<AccuracyStats, TrackerError> {
        self.call(|reply| Request::Stats { reply }).await
    }

    pub async fn snapshot(&self) -> Result<Vec<TrackedPattern>, TrackerError> {
        self.call(|reply| Request::Snapshot { reply }).await
    }

    async fn call<T, F>(&self, make: F) -> Result<T, TrackerError>
    where
        F: FnOnce(Reply<T>) -> Request,
    {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| TrackerError::StoreClosed)?;
        rx.await.map_err(|_| TrackerError::StoreClosed)
    }
}

async fn run<C: Clock>(mut store: PatternStore<C>, mut rx: mpsc::Receiver<Request>) -> PatternStore<C> {
    while let Some(req) = rx.recv().await {
        // A dropped receiver means the caller gave up; the mutation still stands.
        match req {
            Request::Apply { event, reply } => {
                let _ = reply.send(store.apply(event));
            }
            Request::Intake { patterns, price, reply } => {
                let _ = reply.send(store.intake(patterns, price));
            }
            Request::Tick { price, reply } => {
                let _ = reply.send(store.tick(price));
            }
            Request::ClearResolved { reply } => {
                let _ = reply.send(store.clear_resolved());
            }
            Request::Remove { id, reply } => {
                let _ = reply.send(store.remove(&id));
            }
            Request::Stats { reply } => {
                let _ = reply.send(store.stats());
            }
            Request::Snapshot { reply } => {
                let _ = reply.send(store.entries().to_vec());
            }
        }
    }
    store
}
