//! Steam Web API response payloads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

use crate::world::player::PlayerId;

/// Profile visibility as reported by the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(from = "u8")]
pub enum ProfileVisibility {
    Private,
    FriendsOnly,
    Public,
}

impl From<u8> for ProfileVisibility {
    fn from(value: u8) -> Self {
        match value {
            3 => ProfileVisibility::Public,
            2 => ProfileVisibility::FriendsOnly,
            _ => ProfileVisibility::Private,
        }
    }
}

/// Account summary from ISteamUser/GetPlayerSummaries
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PlayerSummary {
    #[serde(rename = "steamid", deserialize_with = "id_from_string")]
    pub id: PlayerId,
    #[serde(rename = "personaname")]
    pub persona_name: String,
    #[serde(rename = "profileurl")]
    pub profile_url: String,
    #[serde(rename = "avatarfull", default)]
    pub avatar_url: String,
    #[serde(rename = "communityvisibilitystate")]
    pub visibility: ProfileVisibility,
    /// Absent on private profiles
    #[serde(
        rename = "timecreated",
        default,
        with = "chrono::serde::ts_seconds_option"
    )]
    pub created_at: Option<DateTime<Utc>>,
}

/// Ban history from ISteamUser/GetPlayerBans
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PlayerBans {
    #[serde(rename = "SteamId", deserialize_with = "id_from_string")]
    pub id: PlayerId,
    #[serde(rename = "CommunityBanned")]
    pub community_banned: bool,
    #[serde(rename = "VACBanned")]
    pub vac_banned: bool,
    #[serde(rename = "NumberOfVACBans")]
    pub vac_ban_count: u32,
    #[serde(rename = "NumberOfGameBans")]
    pub game_ban_count: u32,
    #[serde(rename = "DaysSinceLastBan")]
    pub days_since_last_ban: u32,
    #[serde(rename = "EconomyBan")]
    pub economy_ban: String,
}

impl PlayerBans {
    /// Whether any kind of ban is on record
    pub fn any(&self) -> bool {
        self.community_banned
            || self.vac_ban_count > 0
            || self.game_ban_count > 0
            || self.economy_ban != "none"
    }
}

// --- wire envelopes ---

#[derive(Debug, Deserialize)]
pub(crate) struct SummariesEnvelope {
    pub response: SummariesResponse,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SummariesResponse {
    pub players: Vec<PlayerSummary>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BansEnvelope {
    pub players: Vec<PlayerBans>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OwnedGamesEnvelope {
    pub response: OwnedGamesResponse,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct OwnedGamesResponse {
    /// Absent when the profile's game details are private
    pub games: Option<Vec<OwnedGame>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OwnedGame {
    pub appid: u32,
    /// Total minutes on record
    pub playtime_forever: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FriendsEnvelope {
    pub friendslist: FriendsList,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FriendsList {
    pub friends: Vec<FriendEntry>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FriendEntry {
    #[serde(rename = "steamid", deserialize_with = "id_from_string")]
    pub id: PlayerId,
}

/// The API encodes 64-bit ids as JSON strings
fn id_from_string<'de, D>(deserializer: D) -> Result<PlayerId, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    raw.parse::<u64>()
        .map(PlayerId)
        .map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_summary() {
        let json = r#"{
            "response": {
                "players": [{
                    "steamid": "76561198012345678",
                    "personaname": "pocket medic",
                    "profileurl": "https://steamcommunity.com/id/pocketmedic/",
                    "avatarfull": "https://avatars.example/full.jpg",
                    "communityvisibilitystate": 3,
                    "timecreated": 1262304000
                }]
            }
        }"#;

        let envelope: SummariesEnvelope = serde_json::from_str(json).unwrap();
        let summary = &envelope.response.players[0];
        assert_eq!(summary.id, PlayerId(76561198012345678));
        assert_eq!(summary.persona_name, "pocket medic");
        assert_eq!(summary.visibility, ProfileVisibility::Public);
        assert!(summary.created_at.is_some());
    }

    #[test]
    fn test_decode_private_summary_without_creation_time() {
        let json = r#"{
            "response": {
                "players": [{
                    "steamid": "76561198000000001",
                    "personaname": "closed book",
                    "profileurl": "https://steamcommunity.com/profiles/76561198000000001/",
                    "communityvisibilitystate": 1
                }]
            }
        }"#;

        let envelope: SummariesEnvelope = serde_json::from_str(json).unwrap();
        let summary = &envelope.response.players[0];
        assert_eq!(summary.visibility, ProfileVisibility::Private);
        assert!(summary.created_at.is_none());
        assert!(summary.avatar_url.is_empty());
    }

    #[test]
    fn test_decode_bans() {
        let json = r#"{
            "players": [{
                "SteamId": "76561198012345678",
                "CommunityBanned": false,
                "VACBanned": true,
                "NumberOfVACBans": 2,
                "DaysSinceLastBan": 400,
                "NumberOfGameBans": 0,
                "EconomyBan": "none"
            }]
        }"#;

        let envelope: BansEnvelope = serde_json::from_str(json).unwrap();
        let bans = &envelope.players[0];
        assert!(bans.vac_banned);
        assert_eq!(bans.vac_ban_count, 2);
        assert!(bans.any());
    }

    #[test]
    fn test_bans_any_is_false_when_clean() {
        let json = r#"{
            "players": [{
                "SteamId": "1",
                "CommunityBanned": false,
                "VACBanned": false,
                "NumberOfVACBans": 0,
                "DaysSinceLastBan": 0,
                "NumberOfGameBans": 0,
                "EconomyBan": "none"
            }]
        }"#;

        let envelope: BansEnvelope = serde_json::from_str(json).unwrap();
        assert!(!envelope.players[0].any());
    }

    #[test]
    fn test_decode_owned_games_private() {
        let json = r#"{"response": {}}"#;
        let envelope: OwnedGamesEnvelope = serde_json::from_str(json).unwrap();
        assert!(envelope.response.games.is_none());
    }

    #[test]
    fn test_decode_friends() {
        let json = r#"{
            "friendslist": {
                "friends": [
                    {"steamid": "76561198000000001", "relationship": "friend", "friend_since": 1447349026},
                    {"steamid": "76561198000000002", "relationship": "friend", "friend_since": 1447349027}
                ]
            }
        }"#;

        let envelope: FriendsEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.friendslist.friends.len(), 2);
        assert_eq!(
            envelope.friendslist.friends[0].id,
            PlayerId(76561198000000001)
        );
    }

    #[test]
    fn test_bad_id_string_is_a_decode_error() {
        let json = r#"{"players": [{
            "SteamId": "not a number",
            "CommunityBanned": false,
            "VACBanned": false,
            "NumberOfVACBans": 0,
            "DaysSinceLastBan": 0,
            "NumberOfGameBans": 0,
            "EconomyBan": "none"
        }]}"#;

        assert!(serde_json::from_str::<BansEnvelope>(json).is_err());
    }
}
