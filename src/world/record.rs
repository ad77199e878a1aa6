use crate::world::player::{PlayerId, PlayerStatus};
use crate::world::team::Team;

/// What kind of lobby change the client reported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LobbyChangeKind {
    Created,
    Updated,
    Destroyed,
}

/// One positional seat in the lobby, as declared by a lobby member line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LobbyMember {
    pub id: PlayerId,
    pub team: Team,
    /// Pending members sit in the pending slot sequence
    pub pending: bool,
    /// Index into the slot sequence declared by the lobby header
    pub index: usize,
}

/// The nine playable classes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerClass {
    Scout,
    Sniper,
    Soldier,
    Demoman,
    Medic,
    Heavy,
    Pyro,
    Spy,
    Engineer,
}

impl PlayerClass {
    /// Map a per-class loadout config filename to its class. Returns
    /// `None` for any other config file.
    pub fn from_config_file(file_name: &str) -> Option<Self> {
        match file_name {
            "scout.cfg" => Some(PlayerClass::Scout),
            "sniper.cfg" => Some(PlayerClass::Sniper),
            "soldier.cfg" => Some(PlayerClass::Soldier),
            "demoman.cfg" => Some(PlayerClass::Demoman),
            "medic.cfg" => Some(PlayerClass::Medic),
            "heavyweapons.cfg" => Some(PlayerClass::Heavy),
            "pyro.cfg" => Some(PlayerClass::Pyro),
            "spy.cfg" => Some(PlayerClass::Spy),
            "engineer.cfg" => Some(PlayerClass::Engineer),
            _ => None,
        }
    }
}

/// A typed console-log line, produced by the external parser.
///
/// Closed union: the reconciliation switch handles the kinds it cares
/// about and ignores the rest.
#[derive(Debug, Clone, PartialEq)]
pub enum LineRecord {
    /// Lobby debug header declaring slot counts
    LobbyHeader { members: usize, pending: usize },
    /// "Failed to find lobby shared object"
    LobbyStatusFailed,
    LobbyChanged(LobbyChangeKind),
    HostNewGame,
    Connecting { address: String },
    ClientReachedSpawn,
    Chat { name: String, message: String },
    PlayerDropped { name: String, reason: String },
    /// A config file was executed by the client
    ConfigExec { file_name: String },
    LobbyMember(LobbyMember),
    Ping { name: String, ping_ms: u32 },
    PlayerStatus(PlayerStatus),
    /// Short status variant carrying only the client index
    PlayerStatusShort { name: String, client_index: u32 },
    KillNotification {
        attacker: String,
        victim: String,
        weapon: String,
        crit: bool,
    },
    VoteStarted,
    VoteEnded,
    // Parsed but of no interest to the reconciliation engine
    Suicide { name: String },
    CvarValue { name: String, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_config_mapping() {
        assert_eq!(
            PlayerClass::from_config_file("scout.cfg"),
            Some(PlayerClass::Scout)
        );
        assert_eq!(
            PlayerClass::from_config_file("heavyweapons.cfg"),
            Some(PlayerClass::Heavy)
        );
        assert_eq!(
            PlayerClass::from_config_file("engineer.cfg"),
            Some(PlayerClass::Engineer)
        );
    }

    #[test]
    fn test_non_class_config_is_none() {
        assert_eq!(PlayerClass::from_config_file("autoexec.cfg"), None);
        assert_eq!(PlayerClass::from_config_file("scout"), None);
        assert_eq!(PlayerClass::from_config_file(""), None);
    }
}
