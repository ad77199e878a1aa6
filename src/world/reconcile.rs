use std::time::Duration;

use tracing::{debug, warn};

use crate::world::driver::World;
use crate::world::record::{LineRecord, LobbyChangeKind, PlayerClass};

/// Connection-time deltas smaller than this keep the previously stored
/// value, so a field expected to grow monotonically does not stutter
/// when successive readings jitter by a second.
const CONNECTION_JITTER_WINDOW: Duration = Duration::from_secs(2);

impl World {
    /// Apply one typed record to the session model, bypassing the text
    /// pipeline. Kinds outside the table below are no-ops.
    pub fn apply_record(&mut self, record: &LineRecord) {
        match record {
            LineRecord::LobbyHeader { members, pending } => {
                self.session_mut().resize_lobby(*members, *pending);
            }

            LineRecord::LobbyStatusFailed => {
                if !self.session().lobby_is_empty() {
                    debug!("lobby status lookup failed, resetting session");
                    self.session_mut().reset();
                }
            }

            LineRecord::LobbyChanged(kind) => {
                if *kind == LobbyChangeKind::Created {
                    debug!("new lobby created, resetting session");
                    self.session_mut().reset();
                }

                if matches!(kind, LobbyChangeKind::Created | LobbyChangeKind::Updated) {
                    // Existing client indices can no longer be trusted
                    for player in self.session_mut().players_mut() {
                        player.set_client_index(0);
                    }
                }
            }

            LineRecord::HostNewGame
            | LineRecord::Connecting { .. }
            | LineRecord::ClientReachedSpawn => {
                if self.session().local_player_initialized {
                    self.session_mut().local_player_initialized = false;
                    self.emit_event(|listener, session| {
                        listener.on_local_player_initialized(session, false);
                    });
                }
                self.session_mut().vote_in_progress = false;
            }

            LineRecord::Chat { name, message } => {
                let Some(id) = self.session().find_id_for_name(name) else {
                    warn!(%name, %message, "dropping chat message from unknown name");
                    return;
                };
                if self.session().find_player(id).is_none() {
                    warn!(%name, %id, "dropping chat message, no record for speaker");
                    return;
                }
                self.emit_event(|listener, session| {
                    if let Some(speaker) = session.find_player(id) {
                        listener.on_chat(session, speaker, message);
                    }
                });
            }

            LineRecord::PlayerDropped { name, reason } => {
                let Some(id) = self.session().find_id_for_name(name) else {
                    warn!(%name, "dropping \"player dropped\" line for unknown name");
                    return;
                };
                if self.session().find_player(id).is_none() {
                    warn!(%name, %id, "dropping \"player dropped\" line, no record");
                    return;
                }
                self.emit_event(|listener, session| {
                    if let Some(player) = session.find_player(id) {
                        listener.on_player_dropped(session, player, reason);
                    }
                });
            }

            LineRecord::ConfigExec { file_name } => {
                if let Some(class) = PlayerClass::from_config_file(file_name) {
                    debug!(?class, "local player spawned");
                    self.emit_event(|listener, session| {
                        listener.on_local_player_spawned(session, class);
                    });

                    if !self.session().local_player_initialized {
                        self.session_mut().local_player_initialized = true;
                        self.emit_event(|listener, session| {
                            listener.on_local_player_initialized(session, true);
                        });
                    }
                }
            }

            LineRecord::LobbyMember(member) => {
                self.session_mut().write_lobby_slot(member.clone());
                self.find_or_create_player(member.id).team = Some(member.team);
            }

            LineRecord::Ping { name, ping_ms } => {
                if let Some(id) = self.session().find_id_for_name(name) {
                    let now = self.session().current_timestamp();
                    self.find_or_create_player(id).set_ping(*ping_ms, now);
                }
            }

            LineRecord::PlayerStatus(status) => {
                let now = self.session().current_timestamp();
                let mut status = status.clone();
                let id = status.id;

                let player = self.find_or_create_player(id);
                let previous = player.status().connected;
                let delta = if status.connected > previous {
                    status.connected - previous
                } else {
                    previous - status.connected
                };
                if delta < CONNECTION_JITTER_WINDOW {
                    status.connected = previous;
                }
                player.set_status(status, now);

                self.session_mut().note_status_update(now);
                self.emit_event(|listener, session| {
                    if let Some(player) = session.find_player(id) {
                        listener.on_player_status_updated(session, player);
                    }
                });
            }

            LineRecord::PlayerStatusShort { name, client_index } => {
                if let Some(id) = self.session().find_id_for_name(name) {
                    self.find_or_create_player(id).set_client_index(*client_index);
                }
            }

            LineRecord::KillNotification {
                attacker, victim, ..
            } => {
                let local = self.settings().local_player;
                let attacker_id = self.session().find_id_for_name(attacker);
                let victim_id = self.session().find_id_for_name(victim);

                if let Some(id) = attacker_id {
                    let scores = &mut self.find_or_create_player(id).scores;
                    scores.kills += 1;
                    if victim_id.is_some() && victim_id == local {
                        scores.kills_on_local += 1;
                    }
                }

                if let Some(id) = victim_id {
                    let scores = &mut self.find_or_create_player(id).scores;
                    scores.deaths += 1;
                    if attacker_id.is_some() && attacker_id == local {
                        scores.deaths_to_local += 1;
                    }
                }
            }

            LineRecord::VoteStarted => self.session_mut().vote_in_progress = true,
            LineRecord::VoteEnded => self.session_mut().vote_in_progress = false,

            LineRecord::Suicide { .. } | LineRecord::CvarValue { .. } => {}
        }
    }
}
