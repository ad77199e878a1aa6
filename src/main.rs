use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, Utc};
use tracing::{info, Level};

use sideline::config::Settings;
use sideline::steam::SteamApiClient;
use sideline::world::player::{PlayerId, PlayerLifecycle, PlayerStatus};
use sideline::world::record::{LineRecord, LobbyChangeKind, LobbyMember, PlayerClass};
use sideline::world::{PlayerRecord, Session, World, WorldEventListener};
use sideline::world::team::Team;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_target(false)
        .init();

    info!("Sideline monitor v{}", env!("CARGO_PKG_VERSION"));

    let settings = Settings::load_or_default();
    settings.validate().map_err(anyhow::Error::msg)?;

    let log_path = settings
        .console_log_path
        .clone()
        .context("CONSOLE_LOG_PATH is not set")?;
    let poll_interval = settings.poll_interval;

    let mut world = World::new(settings.clone(), parse_console_line, Utc::now());
    if let Some(key) = settings.steam_api_key.clone() {
        world = world.with_api_client(SteamApiClient::new(key));
    }
    world.add_event_listener(Box::new(EventPrinter));

    info!("Watching {}", log_path.display());

    let mut tail = LogTail::open(&log_path)?;
    let mut ticker = tokio::time::interval(poll_interval);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let chunk = tail.read_new()?;
                if !chunk.is_empty() {
                    world.set_log_timestamp(Utc::now());
                    world.add_console_chunk(&chunk);
                }
                world.update();
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    info!(
        "Session had {} player(s) on record",
        world.session().player_count()
    );
    Ok(())
}

/// Follows a log file from wherever it currently ends
struct LogTail {
    file: File,
    offset: u64,
}

impl LogTail {
    fn open(path: &Path) -> anyhow::Result<Self> {
        let mut file =
            File::open(path).with_context(|| format!("opening {}", path.display()))?;
        let offset = file.seek(SeekFrom::End(0))?;
        Ok(Self { file, offset })
    }

    fn read_new(&mut self) -> anyhow::Result<String> {
        self.file.seek(SeekFrom::Start(self.offset))?;
        let mut buffer = Vec::new();
        self.file.read_to_end(&mut buffer)?;
        self.offset += buffer.len() as u64;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

/// Prints semantic world events to the console
struct EventPrinter;

impl WorldEventListener for EventPrinter {
    fn on_local_player_spawned(&mut self, _session: &Session, class: PlayerClass) {
        info!("Spawned as {:?}", class);
    }

    fn on_local_player_initialized(&mut self, _session: &Session, initialized: bool) {
        info!("Local player initialized: {}", initialized);
    }

    fn on_chat(&mut self, _session: &Session, speaker: &PlayerRecord, message: &str) {
        info!("[chat] {} ({}): {}", speaker.name(), speaker.id(), message);
    }

    fn on_player_dropped(&mut self, _session: &Session, player: &PlayerRecord, reason: &str) {
        info!("{} left the game ({})", player.name(), reason);
    }
}

// --- minimal console-line parser ---
//
// The library treats the parser as an external collaborator; this one
// understands just enough of the client's console output to drive the
// monitor.

fn parse_console_line(line: &str, _now: DateTime<Utc>) -> Option<LineRecord> {
    let trimmed = line.trim_end_matches('\r');

    if let Some(rest) = trimmed.strip_prefix("# ") {
        return parse_status_row(rest);
    }
    if let Some(rest) = trimmed.strip_prefix("execing ") {
        return Some(LineRecord::ConfigExec {
            file_name: rest.trim().to_string(),
        });
    }
    if let Some(rest) = trimmed.strip_prefix("Connecting to ") {
        return Some(LineRecord::Connecting {
            address: rest.trim_end_matches("...").to_string(),
        });
    }
    if trimmed == "Failed to find lobby shared object" {
        return Some(LineRecord::LobbyStatusFailed);
    }
    if trimmed == "Lobby created" {
        return Some(LineRecord::LobbyChanged(LobbyChangeKind::Created));
    }
    if trimmed == "Lobby updated" {
        return Some(LineRecord::LobbyChanged(LobbyChangeKind::Updated));
    }
    if trimmed == "Lobby destroyed" {
        return Some(LineRecord::LobbyChanged(LobbyChangeKind::Destroyed));
    }
    if let Some(rest) = trimmed.strip_prefix("CTFLobbyShared:") {
        return parse_lobby_header(rest);
    }
    if let Some(rest) = trimmed.trim_start().strip_prefix("Member[") {
        return parse_lobby_member(rest, false);
    }
    if let Some(rest) = trimmed.trim_start().strip_prefix("Pending[") {
        return parse_lobby_member(rest, true);
    }
    if let Some(rest) = trimmed.strip_suffix(" suicided.") {
        return Some(LineRecord::Suicide {
            name: rest.to_string(),
        });
    }
    if let Some(kill) = parse_kill(trimmed) {
        return Some(kill);
    }
    if let Some(chat) = parse_chat(trimmed) {
        return Some(chat);
    }
    None
}

/// `67 "Cheeto" [U:1:123456] 12:34 90 0 active`
fn parse_status_row(rest: &str) -> Option<LineRecord> {
    let (userid, rest) = rest.trim_start().split_once(' ')?;
    let client_index: u32 = userid.parse().ok()?;

    let rest = rest.trim_start().strip_prefix('"')?;
    let (name, rest) = rest.split_once('"')?;

    let mut fields = rest.split_whitespace();
    let id = parse_steam3(fields.next()?)?;
    let connected = parse_clock(fields.next()?)?;
    let ping_ms: u32 = fields.next()?.parse().ok()?;
    let loss: u32 = fields.next()?.parse().ok()?;
    let state = match fields.next()? {
        "active" => PlayerLifecycle::Active,
        "spawning" => PlayerLifecycle::Spawning,
        "disconnecting" => PlayerLifecycle::Disconnecting,
        _ => PlayerLifecycle::Connecting,
    };

    Some(LineRecord::PlayerStatus(PlayerStatus {
        id,
        name: name.to_string(),
        client_index,
        connected,
        ping_ms,
        loss,
        state,
    }))
}

/// `ID:00021f0e  24 member(s), 2 pending`
fn parse_lobby_header(rest: &str) -> Option<LineRecord> {
    let (members_part, pending_part) = rest.split_once(',')?;
    let members = members_part
        .split_whitespace()
        .rev()
        .nth(1)?
        .parse()
        .ok()?;
    let pending = pending_part.split_whitespace().next()?.parse().ok()?;
    Some(LineRecord::LobbyHeader { members, pending })
}

/// `5] [U:1:123456] team = TF_GC_TEAM_DEFENDERS  type = MATCH_PLAYER`
fn parse_lobby_member(rest: &str, pending: bool) -> Option<LineRecord> {
    let (index_part, rest) = rest.split_once(']')?;
    let index: usize = index_part.parse().ok()?;

    let mut fields = rest.split_whitespace();
    let id = parse_steam3(fields.next()?)?;

    let team = if rest.contains("TF_GC_TEAM_DEFENDERS") {
        Team::Defenders
    } else if rest.contains("TF_GC_TEAM_INVADERS") {
        Team::Attackers
    } else {
        Team::Unassigned
    };

    Some(LineRecord::LobbyMember(LobbyMember {
        id,
        team,
        pending,
        index,
    }))
}

/// `Cheeto killed Bob with scattergun.` with an optional ` (crit)`
fn parse_kill(line: &str) -> Option<LineRecord> {
    let (rest, crit) = match line.strip_suffix(" (crit)") {
        Some(rest) => (rest, true),
        None => (line, false),
    };
    let rest = rest.strip_suffix('.')?;
    let (pair, weapon) = rest.rsplit_once(" with ")?;
    let (attacker, victim) = pair.split_once(" killed ")?;
    Some(LineRecord::KillNotification {
        attacker: attacker.to_string(),
        victim: victim.to_string(),
        weapon: weapon.to_string(),
        crit,
    })
}

/// `Cheeto :  hello`, with dead/team markers stripped
fn parse_chat(line: &str) -> Option<LineRecord> {
    let line = line
        .trim_start_matches("*DEAD* ")
        .trim_start_matches("(TEAM) ");
    let (name, message) = line.split_once(" :  ")?;
    if name.is_empty() {
        return None;
    }
    Some(LineRecord::Chat {
        name: name.to_string(),
        message: message.to_string(),
    })
}

/// `12:34` or `1:02:03` as a duration
fn parse_clock(token: &str) -> Option<Duration> {
    let mut total = 0u64;
    for part in token.split(':') {
        let value: u64 = part.parse().ok()?;
        total = total * 60 + value;
    }
    Some(Duration::from_secs(total))
}

/// `[U:1:123456]` -> SteamID64
fn parse_steam3(token: &str) -> Option<PlayerId> {
    const STEAM64_BASE: u64 = 76561197960265728;
    let account: u64 = token
        .strip_prefix("[U:1:")?
        .strip_suffix(']')?
        .parse()
        .ok()?;
    Some(PlayerId(STEAM64_BASE + account))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status_row() {
        let record =
            parse_console_line("# 67 \"Cheeto\" [U:1:123456] 12:34 90 0 active", Utc::now())
                .unwrap();
        let LineRecord::PlayerStatus(status) = record else {
            panic!("expected status record");
        };
        assert_eq!(status.client_index, 67);
        assert_eq!(status.name, "Cheeto");
        assert_eq!(status.id, PlayerId(76561197960265728 + 123456));
        assert_eq!(status.connected, Duration::from_secs(12 * 60 + 34));
        assert_eq!(status.ping_ms, 90);
        assert_eq!(status.state, PlayerLifecycle::Active);
    }

    #[test]
    fn test_parse_kill() {
        let record = parse_console_line("Cheeto killed Bob with scattergun. (crit)", Utc::now());
        assert_eq!(
            record,
            Some(LineRecord::KillNotification {
                attacker: "Cheeto".to_string(),
                victim: "Bob".to_string(),
                weapon: "scattergun".to_string(),
                crit: true,
            })
        );
    }

    #[test]
    fn test_parse_chat_with_dead_marker() {
        let record = parse_console_line("*DEAD* Cheeto :  gg wp", Utc::now());
        assert_eq!(
            record,
            Some(LineRecord::Chat {
                name: "Cheeto".to_string(),
                message: "gg wp".to_string(),
            })
        );
    }

    #[test]
    fn test_parse_lobby_lines() {
        let header = parse_console_line(
            "CTFLobbyShared: ID:00021f0e  24 member(s), 2 pending",
            Utc::now(),
        );
        assert_eq!(
            header,
            Some(LineRecord::LobbyHeader {
                members: 24,
                pending: 2
            })
        );

        let member = parse_console_line(
            "  Member[5] [U:1:123456]  team = TF_GC_TEAM_INVADERS  type = MATCH_PLAYER",
            Utc::now(),
        );
        let Some(LineRecord::LobbyMember(member)) = member else {
            panic!("expected lobby member");
        };
        assert_eq!(member.index, 5);
        assert!(!member.pending);
        assert_eq!(member.team, Team::Attackers);
    }

    #[test]
    fn test_unrecognized_line() {
        assert_eq!(parse_console_line("soundemitter: unknown", Utc::now()), None);
    }
}
