use std::collections::VecDeque;

use rustc_hash::FxHashSet;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::steam::SteamApiError;
use crate::world::player::{PlayerId, PlayerRecord};
use crate::world::session::Session;

/// Most identifiers a single batch request may carry (Steam Web API
/// limit per call)
pub const MAX_BATCH: usize = 100;

/// Result channel for one in-flight batch request
pub type BatchReceiver<T> = oneshot::Receiver<Result<Vec<(PlayerId, T)>, SteamApiError>>;

/// Generic fetch-and-merge queue for one enrichment data kind.
///
/// Holds an ordered set of identifiers awaiting fetch and at most one
/// in-flight batch request. Polling never blocks: completion is checked
/// with `try_recv` once per tick.
pub struct BatchQueue<T> {
    kind: &'static str,
    pending: VecDeque<PlayerId>,
    queued: FxHashSet<PlayerId>,
    in_flight: Option<BatchReceiver<T>>,
}

impl<T> BatchQueue<T> {
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            pending: VecDeque::new(),
            queued: FxHashSet::default(),
            in_flight: None,
        }
    }

    /// Queue an identifier for fetching. Duplicates are ignored.
    pub fn request(&mut self, id: PlayerId) {
        if self.queued.insert(id) {
            self.pending.push_back(id);
        }
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn has_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    fn forget(&mut self, id: PlayerId) {
        if self.queued.remove(&id) {
            self.pending.retain(|pending| *pending != id);
        }
    }

    /// Drain a completed batch, if any, merging each returned entry
    /// into the session with `store` and dropping it from the pending
    /// set. Identifiers the response omitted stay queued and are
    /// retried by a later batch. A failed batch only clears the
    /// in-flight slot; the pending set is untouched so the whole batch
    /// is retried.
    ///
    /// A batch that completes after a session reset still merges,
    /// recreating records for identifiers that may no longer be
    /// relevant. Known quirk, kept as-is.
    pub fn poll(&mut self, session: &mut Session, mut store: impl FnMut(&mut PlayerRecord, T)) {
        let Some(receiver) = self.in_flight.as_mut() else {
            return;
        };

        match receiver.try_recv() {
            Ok(Ok(entries)) => {
                debug!(kind = self.kind, count = entries.len(), "batch ready");
                for (id, value) in entries {
                    let (record, _) = session.find_or_create_player(id);
                    store(record, value);
                    self.forget(id);
                }
                self.in_flight = None;
            }
            Ok(Err(err)) => {
                warn!(kind = self.kind, error = %err, "batch fetch failed, will retry");
                self.in_flight = None;
            }
            Err(oneshot::error::TryRecvError::Empty) => {}
            Err(oneshot::error::TryRecvError::Closed) => {
                warn!(kind = self.kind, "batch fetch task dropped its result, will retry");
                self.in_flight = None;
            }
        }
    }

    /// Issue the next batch if none is in flight and identifiers are
    /// waiting. `send` receives the oldest pending identifiers (at most
    /// [`MAX_BATCH`]) and returns a receiver when the API is reachable;
    /// overflow stays queued for a later cycle.
    pub fn issue(&mut self, send: impl FnOnce(Vec<PlayerId>) -> Option<BatchReceiver<T>>) {
        if self.in_flight.is_some() || self.pending.is_empty() {
            return;
        }

        let batch: Vec<PlayerId> = self.pending.iter().take(MAX_BATCH).copied().collect();
        debug!(kind = self.kind, count = batch.len(), "issuing batch");
        self.in_flight = send(batch);
    }
}
