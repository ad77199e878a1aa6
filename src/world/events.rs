use crate::world::player::PlayerRecord;
use crate::world::record::{LineRecord, PlayerClass};
use crate::world::session::Session;

/// Handle returned by listener registration, used for removal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Raw line notifications: one callback per console line, parsed or not
pub trait LineListener: Send {
    fn on_line_parsed(&mut self, session: &Session, record: &LineRecord) {
        let _ = (session, record);
    }

    fn on_line_unparsed(&mut self, session: &Session, text: &str) {
        let _ = (session, text);
    }
}

/// Higher-level semantic events derived from reconciliation
pub trait WorldEventListener: Send {
    fn on_local_player_spawned(&mut self, session: &Session, class: PlayerClass) {
        let _ = (session, class);
    }

    fn on_local_player_initialized(&mut self, session: &Session, initialized: bool) {
        let _ = (session, initialized);
    }

    fn on_chat(&mut self, session: &Session, speaker: &PlayerRecord, message: &str) {
        let _ = (session, speaker, message);
    }

    fn on_player_dropped(&mut self, session: &Session, player: &PlayerRecord, reason: &str) {
        let _ = (session, player, reason);
    }

    fn on_player_status_updated(&mut self, session: &Session, player: &PlayerRecord) {
        let _ = (session, player);
    }
}

/// Ordered collection of boxed listeners.
///
/// Dispatch takes a snapshot of the collection first: listeners added or
/// removed from inside a callback never affect the dispatch already in
/// progress.
pub struct ListenerSet<L: ?Sized> {
    entries: Vec<(ListenerId, Box<L>)>,
    /// Removals requested while a snapshot is out
    detached: Vec<ListenerId>,
    dispatching: bool,
    next_id: u64,
}

impl<L: ?Sized> Default for ListenerSet<L> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            detached: Vec::new(),
            dispatching: false,
            next_id: 0,
        }
    }
}

impl<L: ?Sized> ListenerSet<L> {
    pub fn insert(&mut self, listener: Box<L>) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, listener));
        id
    }

    /// Remove a listener. During a dispatch the removal is deferred to
    /// the end of that dispatch.
    pub fn remove(&mut self, id: ListenerId) -> bool {
        if let Some(position) = self.entries.iter().position(|(entry, _)| *entry == id) {
            self.entries.remove(position);
            return true;
        }
        if self.dispatching && !self.detached.contains(&id) {
            self.detached.push(id);
            return true;
        }
        false
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Take the current entries as a dispatch snapshot. Must be paired
    /// with [`ListenerSet::end_dispatch`].
    pub(crate) fn begin_dispatch(&mut self) -> Vec<(ListenerId, Box<L>)> {
        self.dispatching = true;
        std::mem::take(&mut self.entries)
    }

    /// Return a snapshot, applying deferred removals and keeping any
    /// listeners registered mid-dispatch after the surviving snapshot.
    pub(crate) fn end_dispatch(&mut self, mut snapshot: Vec<(ListenerId, Box<L>)>) {
        snapshot.retain(|(id, _)| !self.detached.contains(id));
        let added = std::mem::replace(&mut self.entries, snapshot);
        self.entries.extend(added);
        self.detached.clear();
        self.dispatching = false;
    }
}
