use std::any::{Any, TypeId};
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;

use crate::steam::types::{PlayerBans, PlayerSummary};
use crate::util::text::collapse_newlines;
use crate::world::team::Team;

/// Stable 64-bit account identifier (SteamID64). Never recycled within
/// a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Connection lifecycle as reported by the server's status output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayerLifecycle {
    #[default]
    Connecting,
    Spawning,
    Active,
    Disconnecting,
}

/// Transient per-tick fields for a connected player. Replaced wholesale
/// on every full status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerStatus {
    pub id: PlayerId,
    pub name: String,
    /// Server-assigned client index; 0 means not known
    pub client_index: u32,
    /// Time connected as reported by the server
    pub connected: Duration,
    pub ping_ms: u32,
    pub loss: u32,
    pub state: PlayerLifecycle,
}

impl PlayerStatus {
    fn empty(id: PlayerId) -> Self {
        Self {
            id,
            name: String::new(),
            client_index: 0,
            connected: Duration::ZERO,
            ping_ms: 0,
            loss: 0,
            state: PlayerLifecycle::Connecting,
        }
    }
}

/// Kill/death tallies, with sub-counts involving the local player
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlayerScores {
    pub kills: u32,
    pub deaths: u32,
    /// Kills where the victim was the local player
    pub kills_on_local: u32,
    /// Deaths where the attacker was the local player
    pub deaths_to_local: u32,
}

/// Open-ended per-player side storage keyed by data type, so features
/// outside the core can attach state without the record knowing their
/// types.
#[derive(Default)]
pub struct Attachments {
    entries: FxHashMap<TypeId, Box<dyn Any + Send>>,
}

impl Attachments {
    pub fn get<T: Any + Send>(&self) -> Option<&T> {
        self.entries
            .get(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast_ref())
    }

    pub fn get_mut<T: Any + Send>(&mut self) -> Option<&mut T> {
        self.entries
            .get_mut(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast_mut())
    }

    pub fn get_or_default<T: Any + Send + Default>(&mut self) -> &mut T {
        self.entries
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::<T>::default())
            .downcast_mut()
            .expect("attachment entry keyed by its own TypeId")
    }

    pub fn insert<T: Any + Send>(&mut self, value: T) -> Option<T> {
        self.entries
            .insert(TypeId::of::<T>(), Box::new(value))
            .and_then(|boxed| boxed.downcast().ok())
            .map(|boxed| *boxed)
    }

    pub fn remove<T: Any + Send>(&mut self) -> Option<T> {
        self.entries
            .remove(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast().ok())
            .map(|boxed| *boxed)
    }
}

impl fmt::Debug for Attachments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Attachments({} entries)", self.entries.len())
    }
}

/// The durable per-session entity for one account. Created lazily on
/// first reference, removed only by a full session reset.
#[derive(Debug)]
pub struct PlayerRecord {
    status: PlayerStatus,
    name_safe: String,
    pub team: Option<Team>,
    pub scores: PlayerScores,
    last_status_update: Option<DateTime<Utc>>,
    last_ping_update: Option<DateTime<Utc>>,
    active_since: Option<DateTime<Utc>>,
    /// Steam profile summary, filled in by the enrichment queue
    pub summary: Option<PlayerSummary>,
    /// Ban history, filled in by the enrichment queue
    pub bans: Option<PlayerBans>,
    /// Recorded playtime in the monitored game, filled in by the
    /// enrichment queue
    pub playtime: Option<Duration>,
    pub attachments: Attachments,
}

impl PlayerRecord {
    pub fn new(id: PlayerId) -> Self {
        Self {
            status: PlayerStatus::empty(id),
            name_safe: String::new(),
            team: None,
            scores: PlayerScores::default(),
            last_status_update: None,
            last_ping_update: None,
            active_since: None,
            summary: None,
            bans: None,
            playtime: None,
            attachments: Attachments::default(),
        }
    }

    pub fn id(&self) -> PlayerId {
        self.status.id
    }

    pub fn status(&self) -> &PlayerStatus {
        &self.status
    }

    /// Display name with newlines collapsed
    pub fn name(&self) -> &str {
        &self.name_safe
    }

    /// Server client index from the last status or short-status line;
    /// `None` until assigned or after lobby-change invalidation
    pub fn client_index(&self) -> Option<u32> {
        (self.status.client_index > 0).then_some(self.status.client_index)
    }

    pub fn last_status_update(&self) -> Option<DateTime<Utc>> {
        self.last_status_update
    }

    pub fn last_ping_update(&self) -> Option<DateTime<Utc>> {
        self.last_ping_update
    }

    /// Replace the status snapshot. An id change under an existing
    /// record is a logic error.
    pub fn set_status(&mut self, status: PlayerStatus, timestamp: DateTime<Utc>) {
        debug_assert_eq!(
            self.status.id, status.id,
            "status snapshot reassigned to a different account"
        );

        if self.status.state != PlayerLifecycle::Active && status.state == PlayerLifecycle::Active {
            self.active_since = Some(timestamp);
        }

        self.name_safe = collapse_newlines(&status.name);
        self.status = status;
        self.last_status_update = Some(timestamp);
        self.last_ping_update = Some(timestamp);
    }

    /// Update ping only, leaving the rest of the snapshot untouched
    pub fn set_ping(&mut self, ping_ms: u32, timestamp: DateTime<Utc>) {
        self.status.ping_ms = ping_ms;
        self.last_ping_update = Some(timestamp);
    }

    pub(crate) fn set_client_index(&mut self, client_index: u32) {
        self.status.client_index = client_index;
    }

    /// How long the current active interval has lasted; zero whenever
    /// the player is not in the active state.
    pub fn active_time(&self) -> Duration {
        if self.status.state != PlayerLifecycle::Active {
            return Duration::ZERO;
        }

        match (self.last_status_update, self.active_since) {
            (Some(updated), Some(since)) => (updated - since).to_std().unwrap_or_default(),
            _ => Duration::ZERO,
        }
    }

    /// Wall-time since this player connected, as of `now`
    pub fn connected_for(&self, now: DateTime<Utc>) -> Duration {
        match self.last_status_update {
            Some(updated) => {
                let at_update = self.status.connected;
                let since_update = (now - updated).to_std().unwrap_or_default();
                at_update + since_update
            }
            None => Duration::ZERO,
        }
    }
}
