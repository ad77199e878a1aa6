use std::time::Instant;

use chrono::{DateTime, Utc};
use hashbrown::HashMap;
use rustc_hash::FxHashSet;
use tracing::warn;

use crate::world::player::{PlayerId, PlayerRecord};
use crate::world::record::LobbyMember;
use crate::world::team::{self, Team, TeamPairingError, TeamRelationship};

/// In-memory model of the current game session.
///
/// Owned and mutated by a single driver; rebuilt from scratch whenever
/// the log stream reports a fresh lobby.
pub struct Session {
    players: HashMap<PlayerId, PlayerRecord>,
    lobby_members: Vec<Option<LobbyMember>>,
    pending_members: Vec<Option<LobbyMember>>,
    pub vote_in_progress: bool,
    pub local_player_initialized: bool,
    /// Logical clock, advanced by the embedder as its parser tracks log
    /// timestamps
    current_timestamp: DateTime<Utc>,
    last_status_update: Option<DateTime<Utc>>,
    friends: Option<FxHashSet<PlayerId>>,
    pub(crate) friends_requested_at: Option<Instant>,
}

impl Session {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            players: HashMap::new(),
            lobby_members: Vec::new(),
            pending_members: Vec::new(),
            vote_in_progress: false,
            local_player_initialized: false,
            current_timestamp: start,
            last_status_update: None,
            friends: None,
            friends_requested_at: None,
        }
    }

    pub fn current_timestamp(&self) -> DateTime<Utc> {
        self.current_timestamp
    }

    pub fn set_current_timestamp(&mut self, timestamp: DateTime<Utc>) {
        self.current_timestamp = timestamp;
    }

    pub fn last_status_update(&self) -> Option<DateTime<Utc>> {
        self.last_status_update
    }

    pub(crate) fn note_status_update(&mut self, timestamp: DateTime<Utc>) {
        self.last_status_update = Some(match self.last_status_update {
            Some(existing) => existing.max(timestamp),
            None => timestamp,
        });
    }

    // --- player table ---

    pub fn find_player(&self, id: PlayerId) -> Option<&PlayerRecord> {
        self.players.get(&id)
    }

    pub fn find_player_mut(&mut self, id: PlayerId) -> Option<&mut PlayerRecord> {
        self.players.get_mut(&id)
    }

    /// Look up a record, creating a blank one on first reference.
    /// Returns whether the record was just created alongside it.
    pub fn find_or_create_player(&mut self, id: PlayerId) -> (&mut PlayerRecord, bool) {
        let mut created = false;
        let record = self.players.entry(id).or_insert_with(|| {
            created = true;
            PlayerRecord::new(id)
        });
        (record, created)
    }

    pub fn players(&self) -> impl Iterator<Item = &PlayerRecord> {
        self.players.values()
    }

    pub(crate) fn players_mut(&mut self) -> impl Iterator<Item = &mut PlayerRecord> {
        self.players.values_mut()
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Resolve a display name to the identifier whose status snapshot
    /// matches and was updated most recently.
    pub fn find_id_for_name(&self, name: &str) -> Option<PlayerId> {
        let mut best: Option<(DateTime<Utc>, PlayerId)> = None;

        for record in self.players.values() {
            if record.status().name != name {
                continue;
            }
            let Some(updated) = record.last_status_update() else {
                continue;
            };
            if best.map_or(true, |(ts, _)| updated > ts) {
                best = Some((updated, record.id()));
            }
        }

        best.map(|(_, id)| id)
    }

    /// Most-recently-updated players, descending, truncated to `count`
    pub fn recent_players(&self, count: usize) -> Vec<&PlayerRecord> {
        let mut records: Vec<&PlayerRecord> = self.players.values().collect();
        records.sort_by(|a, b| b.last_status_update().cmp(&a.last_status_update()));
        records.truncate(count);
        records
    }

    // --- lobby slots ---

    /// Resize both slot sequences to the counts a lobby header declared,
    /// discarding out-of-range slots.
    pub(crate) fn resize_lobby(&mut self, members: usize, pending: usize) {
        self.lobby_members.resize(members, None);
        self.pending_members.resize(pending, None);
    }

    /// Write a member into its declared slot. Writes beyond the current
    /// bounds are ignored; only the most recent header controls bounds.
    pub(crate) fn write_lobby_slot(&mut self, member: LobbyMember) {
        let slots = if member.pending {
            &mut self.pending_members
        } else {
            &mut self.lobby_members
        };
        let index = member.index;
        if let Some(slot) = slots.get_mut(index) {
            *slot = Some(member);
        }
    }

    pub fn lobby_is_empty(&self) -> bool {
        self.lobby_members.is_empty() && self.pending_members.is_empty()
    }

    /// Slot-sequence sizes, counting unwritten slots
    pub fn approx_lobby_member_count(&self) -> usize {
        self.lobby_members.len() + self.pending_members.len()
    }

    /// Team for an identifier according to the lobby slots, confirmed
    /// slots checked first.
    pub fn lobby_team(&self, id: PlayerId) -> Option<Team> {
        self.lobby_members
            .iter()
            .chain(self.pending_members.iter())
            .flatten()
            .find(|member| member.id == id)
            .map(|member| member.team)
    }

    /// Relationship between two identifiers' lobby teams
    pub fn team_relationship(
        &self,
        left: PlayerId,
        right: PlayerId,
    ) -> Result<TeamRelationship, TeamPairingError> {
        team::relationship(self.lobby_team(left), self.lobby_team(right))
    }

    /// Player records seated in the lobby: confirmed occupants first,
    /// then pending occupants not already seen among the confirmed.
    /// Occupants with no player record are logged and skipped.
    pub fn lobby_players(&self) -> impl Iterator<Item = &PlayerRecord> {
        let confirmed = self.lobby_members.iter().flatten();
        let pending = self.pending_members.iter().flatten().filter(|member| {
            !self
                .lobby_members
                .iter()
                .flatten()
                .any(|confirmed| confirmed.id == member.id)
        });

        confirmed.chain(pending).filter_map(|member| {
            let found = self.players.get(&member.id);
            if found.is_none() {
                warn!(id = %member.id, "lobby slot occupant has no player record, skipping");
            }
            found
        })
    }

    // --- friends cache ---

    pub fn set_friends(&mut self, friends: FxHashSet<PlayerId>) {
        self.friends = Some(friends);
    }

    /// Set-membership query against the latest friends snapshot; `None`
    /// until a snapshot has been fetched.
    pub fn is_friend(&self, id: PlayerId) -> Option<bool> {
        self.friends.as_ref().map(|friends| friends.contains(&id))
    }

    // --- lifecycle ---

    /// Full reset: drop every player record and both slot sequences.
    pub fn reset(&mut self) {
        self.players.clear();
        self.lobby_members.clear();
        self.pending_members.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::player::{PlayerLifecycle, PlayerStatus};
    use chrono::TimeZone;
    use std::time::Duration;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_600_000_000 + secs, 0).unwrap()
    }

    fn session() -> Session {
        Session::new(ts(0))
    }

    fn status(id: PlayerId, name: &str) -> PlayerStatus {
        PlayerStatus {
            id,
            name: name.to_string(),
            client_index: 1,
            connected: Duration::from_secs(10),
            ping_ms: 30,
            loss: 0,
            state: PlayerLifecycle::Active,
        }
    }

    fn seat(id: u64, team: Team, pending: bool, index: usize) -> LobbyMember {
        LobbyMember {
            id: PlayerId(id),
            team,
            pending,
            index,
        }
    }

    #[test]
    fn test_find_or_create_reports_creation() {
        let mut session = session();

        let (_, created) = session.find_or_create_player(PlayerId(1));
        assert!(created);

        let (_, created) = session.find_or_create_player(PlayerId(1));
        assert!(!created);
        assert_eq!(session.player_count(), 1);
    }

    #[test]
    fn test_find_id_for_name_prefers_latest_update() {
        let mut session = session();

        let (old, _) = session.find_or_create_player(PlayerId(1));
        old.set_status(status(PlayerId(1), "dup"), ts(10));

        let (new, _) = session.find_or_create_player(PlayerId(2));
        new.set_status(status(PlayerId(2), "dup"), ts(20));

        assert_eq!(session.find_id_for_name("dup"), Some(PlayerId(2)));
        assert_eq!(session.find_id_for_name("nobody"), None);
    }

    #[test]
    fn test_find_id_ignores_players_without_status() {
        let mut session = session();
        session.find_or_create_player(PlayerId(1));
        assert_eq!(session.find_id_for_name(""), None);
    }

    #[test]
    fn test_recent_players_sorted_and_truncated() {
        let mut session = session();
        for (id, at) in [(1u64, 30i64), (2, 10), (3, 20)] {
            let (record, _) = session.find_or_create_player(PlayerId(id));
            record.set_status(status(PlayerId(id), "p"), ts(at));
        }

        let recent = session.recent_players(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].id(), PlayerId(1));
        assert_eq!(recent[1].id(), PlayerId(3));
    }

    #[test]
    fn test_out_of_bounds_slot_write_ignored() {
        let mut session = session();
        session.resize_lobby(2, 0);
        session.write_lobby_slot(seat(5, Team::Defenders, false, 4));

        assert_eq!(session.lobby_team(PlayerId(5)), None);
    }

    #[test]
    fn test_resize_discards_out_of_range_slots() {
        let mut session = session();
        session.resize_lobby(4, 0);
        session.write_lobby_slot(seat(5, Team::Defenders, false, 3));
        assert_eq!(session.lobby_team(PlayerId(5)), Some(Team::Defenders));

        session.resize_lobby(2, 0);
        assert_eq!(session.lobby_team(PlayerId(5)), None);
    }

    #[test]
    fn test_lobby_team_checks_confirmed_before_pending() {
        let mut session = session();
        session.resize_lobby(1, 1);
        session.write_lobby_slot(seat(5, Team::Attackers, true, 0));
        session.write_lobby_slot(seat(5, Team::Defenders, false, 0));

        assert_eq!(session.lobby_team(PlayerId(5)), Some(Team::Defenders));
    }

    #[test]
    fn test_lobby_players_deduplicates_pending() {
        let mut session = session();
        session.resize_lobby(2, 2);
        session.write_lobby_slot(seat(1, Team::Defenders, false, 0));
        session.write_lobby_slot(seat(2, Team::Attackers, false, 1));
        session.write_lobby_slot(seat(1, Team::Defenders, true, 0));
        session.write_lobby_slot(seat(3, Team::Attackers, true, 1));

        for id in [1u64, 2, 3] {
            session.find_or_create_player(PlayerId(id));
        }

        let seen: Vec<PlayerId> = session.lobby_players().map(|p| p.id()).collect();
        assert_eq!(seen, vec![PlayerId(1), PlayerId(2), PlayerId(3)]);
    }

    #[test]
    fn test_lobby_players_skips_missing_records() {
        let mut session = session();
        session.resize_lobby(2, 0);
        session.write_lobby_slot(seat(1, Team::Defenders, false, 0));
        session.write_lobby_slot(seat(2, Team::Attackers, false, 1));
        session.find_or_create_player(PlayerId(2));

        let seen: Vec<PlayerId> = session.lobby_players().map(|p| p.id()).collect();
        assert_eq!(seen, vec![PlayerId(2)]);
    }

    #[test]
    fn test_team_relationship_via_lobby() {
        let mut session = session();
        session.resize_lobby(3, 0);
        session.write_lobby_slot(seat(1, Team::Defenders, false, 0));
        session.write_lobby_slot(seat(2, Team::Defenders, false, 1));
        session.write_lobby_slot(seat(3, Team::Attackers, false, 2));

        assert_eq!(
            session.team_relationship(PlayerId(1), PlayerId(2)).unwrap(),
            TeamRelationship::Same
        );
        assert_eq!(
            session.team_relationship(PlayerId(1), PlayerId(3)).unwrap(),
            TeamRelationship::Opposing
        );
        assert_eq!(
            session.team_relationship(PlayerId(1), PlayerId(9)).unwrap(),
            TeamRelationship::Unknown
        );
    }

    #[test]
    fn test_reset_clears_players_and_slots() {
        let mut session = session();
        session.resize_lobby(1, 1);
        session.write_lobby_slot(seat(1, Team::Defenders, false, 0));
        session.find_or_create_player(PlayerId(1));

        session.reset();

        assert_eq!(session.player_count(), 0);
        assert!(session.lobby_is_empty());
        assert_eq!(session.lobby_team(PlayerId(1)), None);
    }

    #[test]
    fn test_friends_snapshot_membership() {
        let mut session = session();
        assert_eq!(session.is_friend(PlayerId(1)), None);

        let mut friends = FxHashSet::default();
        friends.insert(PlayerId(1));
        session.set_friends(friends);

        assert_eq!(session.is_friend(PlayerId(1)), Some(true));
        assert_eq!(session.is_friend(PlayerId(2)), Some(false));
    }

    #[test]
    fn test_note_status_update_keeps_max() {
        let mut session = session();
        session.note_status_update(ts(20));
        session.note_status_update(ts(10));
        assert_eq!(session.last_status_update(), Some(ts(20)));
    }
}
