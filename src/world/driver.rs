use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use rustc_hash::FxHashSet;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::config::Settings;
use crate::steam::types::{PlayerBans, PlayerSummary};
use crate::steam::{SteamApiClient, SteamApiError};
use crate::world::enrich::BatchQueue;
use crate::world::events::{LineListener, ListenerId, ListenerSet, WorldEventListener};
use crate::world::ingest::LineParser;
use crate::world::player::{PlayerId, PlayerRecord};
use crate::world::record::LineRecord;
use crate::world::session::Session;
use crate::world::team::{TeamPairingError, TeamRelationship};

/// Minimum wall-clock spacing between friends-list refreshes
const FRIENDS_REFRESH_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Owns the session model, the listener sets, and the enrichment
/// queues, and orchestrates each update tick.
///
/// All mutation happens on ingestion or update calls made by a single
/// owning task; nothing here blocks on network completion. `update`
/// must be called from within a tokio runtime when an API client is
/// configured, since batch fetches are spawned onto it.
pub struct World {
    settings: Settings,
    api: Option<Arc<SteamApiClient>>,
    parser: Box<dyn LineParser>,
    session: Session,
    line_listeners: ListenerSet<dyn LineListener>,
    event_listeners: ListenerSet<dyn WorldEventListener>,
    summaries: BatchQueue<PlayerSummary>,
    bans: BatchQueue<PlayerBans>,
    playtime: BatchQueue<Duration>,
    friends_in_flight: Option<oneshot::Receiver<Result<FxHashSet<PlayerId>, SteamApiError>>>,
}

impl World {
    pub fn new(settings: Settings, parser: impl LineParser + 'static, start: DateTime<Utc>) -> Self {
        Self {
            settings,
            api: None,
            parser: Box::new(parser),
            session: Session::new(start),
            line_listeners: ListenerSet::default(),
            event_listeners: ListenerSet::default(),
            summaries: BatchQueue::new("summaries"),
            bans: BatchQueue::new("bans"),
            playtime: BatchQueue::new("playtime"),
            friends_in_flight: None,
        }
    }

    /// Attach the Steam Web API client; without one, enrichment fetches
    /// are never issued.
    pub fn with_api_client(mut self, client: SteamApiClient) -> Self {
        self.api = Some(Arc::new(client));
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub(crate) fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    /// Advance the session's logical clock. Driven by the embedder as
    /// its parser tracks timestamps embedded in the log.
    pub fn set_log_timestamp(&mut self, timestamp: DateTime<Utc>) {
        self.session.set_current_timestamp(timestamp);
    }

    pub(crate) fn parse(&mut self, line: &str, now: DateTime<Utc>) -> Option<LineRecord> {
        self.parser.parse_line(line, now)
    }

    // --- listener registration ---

    pub fn add_line_listener(&mut self, listener: Box<dyn LineListener>) -> ListenerId {
        self.line_listeners.insert(listener)
    }

    pub fn remove_line_listener(&mut self, id: ListenerId) -> bool {
        self.line_listeners.remove(id)
    }

    pub fn add_event_listener(&mut self, listener: Box<dyn WorldEventListener>) -> ListenerId {
        self.event_listeners.insert(listener)
    }

    pub fn remove_event_listener(&mut self, id: ListenerId) -> bool {
        self.event_listeners.remove(id)
    }

    pub(crate) fn emit_line_parsed(&mut self, record: &LineRecord) {
        let mut snapshot = self.line_listeners.begin_dispatch();
        for (_, listener) in snapshot.iter_mut() {
            listener.on_line_parsed(&self.session, record);
        }
        self.line_listeners.end_dispatch(snapshot);
    }

    pub(crate) fn emit_line_unparsed(&mut self, text: &str) {
        let mut snapshot = self.line_listeners.begin_dispatch();
        for (_, listener) in snapshot.iter_mut() {
            listener.on_line_unparsed(&self.session, text);
        }
        self.line_listeners.end_dispatch(snapshot);
    }

    pub(crate) fn emit_event(&mut self, mut call: impl FnMut(&mut dyn WorldEventListener, &Session)) {
        let mut snapshot = self.event_listeners.begin_dispatch();
        for (_, listener) in snapshot.iter_mut() {
            call(listener.as_mut(), &self.session);
        }
        self.event_listeners.end_dispatch(snapshot);
    }

    // --- player helpers ---

    /// Find-or-create used by the reconciliation engine. With lazy
    /// loading disabled, a newly created record queues every
    /// enrichment kind up front.
    pub(crate) fn find_or_create_player(&mut self, id: PlayerId) -> &mut PlayerRecord {
        let (_, created) = self.session.find_or_create_player(id);
        if created && !self.settings.lazy_load_api_data {
            self.summaries.request(id);
            self.bans.request(id);
            self.playtime.request(id);
        }
        self.session.find_or_create_player(id).0
    }

    /// Relationship between a player's lobby team and the local
    /// player's; `Unknown` when no local account is configured.
    pub fn team_relationship_to_local(
        &self,
        id: PlayerId,
    ) -> Result<TeamRelationship, TeamPairingError> {
        let Some(local) = self.settings.local_player else {
            return Ok(TeamRelationship::Unknown);
        };
        self.session.team_relationship(id, local)
    }

    // --- lazy enrichment accessors ---

    /// Account summary if fetched; otherwise queues the id and returns
    /// `None`. Callers re-query on a later tick.
    pub fn player_summary(&mut self, id: PlayerId) -> Option<&PlayerSummary> {
        let missing = self
            .session
            .find_player(id)
            .map_or(true, |record| record.summary.is_none());
        if missing {
            self.summaries.request(id);
            return None;
        }
        self.session
            .find_player(id)
            .and_then(|record| record.summary.as_ref())
    }

    /// Ban record if fetched; otherwise queues the id and returns `None`.
    pub fn player_bans(&mut self, id: PlayerId) -> Option<&PlayerBans> {
        let missing = self
            .session
            .find_player(id)
            .map_or(true, |record| record.bans.is_none());
        if missing {
            self.bans.request(id);
            return None;
        }
        self.session
            .find_player(id)
            .and_then(|record| record.bans.as_ref())
    }

    /// Recorded playtime if fetched; otherwise queues the id and
    /// returns `None`.
    pub fn player_playtime(&mut self, id: PlayerId) -> Option<Duration> {
        let known = self.session.find_player(id).and_then(|record| record.playtime);
        if known.is_none() {
            self.playtime.request(id);
        }
        known
    }

    /// Friend-relationship against the latest friends snapshot; `None`
    /// until one has been fetched.
    pub fn is_friend(&self, id: PlayerId) -> Option<bool> {
        self.session.is_friend(id)
    }

    // --- tick ---

    /// The per-tick entry point: drain ready enrichment results, issue
    /// new batches when idle, and drive the friends-list refresh. Never
    /// blocks; call regularly.
    pub fn update(&mut self) {
        self.summaries
            .poll(&mut self.session, |record, summary| {
                record.summary = Some(summary);
            });
        self.bans.poll(&mut self.session, |record, bans| {
            record.bans = Some(bans);
        });
        self.playtime.poll(&mut self.session, |record, playtime| {
            record.playtime = Some(playtime);
        });
        self.poll_friends();

        let Some(api) = self.api.clone() else {
            return;
        };
        self.summaries.issue(|ids| Some(api.spawn_summaries(ids)));
        self.bans.issue(|ids| Some(api.spawn_bans(ids)));
        self.playtime.issue(|ids| Some(api.spawn_playtime(ids)));
        self.refresh_friends(&api);
    }

    fn poll_friends(&mut self) {
        let Some(receiver) = self.friends_in_flight.as_mut() else {
            return;
        };

        match receiver.try_recv() {
            Ok(Ok(friends)) => {
                debug!(count = friends.len(), "friends list refreshed");
                self.session.set_friends(friends);
                self.friends_in_flight = None;
            }
            Ok(Err(err)) => {
                // A private friends list comes back as 401; expected,
                // and the previous snapshot stays in place either way.
                if err.status() == Some(StatusCode::UNAUTHORIZED) {
                    debug!("friends list is private, keeping previous snapshot");
                } else {
                    warn!(error = %err, "friends list refresh failed");
                }
                self.friends_in_flight = None;
            }
            Err(oneshot::error::TryRecvError::Empty) => {}
            Err(oneshot::error::TryRecvError::Closed) => {
                warn!("friends list fetch task dropped its result");
                self.friends_in_flight = None;
            }
        }
    }

    fn should_refresh_friends(&self) -> bool {
        if self.friends_in_flight.is_some() || self.settings.local_player.is_none() {
            return false;
        }
        match self.session.friends_requested_at {
            Some(requested) => requested.elapsed() >= FRIENDS_REFRESH_INTERVAL,
            None => true,
        }
    }

    fn refresh_friends(&mut self, api: &Arc<SteamApiClient>) {
        if !self.should_refresh_friends() {
            return;
        }
        let Some(local) = self.settings.local_player else {
            return;
        };
        self.session.friends_requested_at = Some(Instant::now());
        self.friends_in_flight = Some(api.spawn_friend_list(local));
    }
}
