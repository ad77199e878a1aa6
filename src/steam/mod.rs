//! Steam Web API client
//!
//! One client instance holds the HTTP transport and the API key. Batch
//! fetches are async; the `spawn_*` wrappers run them on the ambient
//! tokio runtime and hand back a oneshot receiver the caller polls
//! without blocking.

pub mod types;

use std::time::Duration;

use reqwest::StatusCode;
use rustc_hash::FxHashSet;
use tokio::sync::oneshot;
use tokio::task::JoinSet;
use tracing::debug;

use crate::world::enrich::BatchReceiver;
use crate::world::player::PlayerId;
use types::{
    BansEnvelope, FriendsEnvelope, OwnedGamesEnvelope, PlayerBans, PlayerSummary,
    SummariesEnvelope,
};

const API_BASE: &str = "https://api.steampowered.com";
/// App whose playtime is looked up (Team Fortress 2)
const MONITORED_APP_ID: u32 = 440;

/// Errors from the Steam Web API boundary
#[derive(Debug, thiserror::Error)]
pub enum SteamApiError {
    /// Non-success HTTP status; the code stays visible so callers can
    /// special-case responses like 401
    #[error("api returned http status {0}")]
    Status(StatusCode),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl SteamApiError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            SteamApiError::Status(code) => Some(*code),
            _ => None,
        }
    }
}

/// Steam Web API client: HTTP transport plus credential
#[derive(Clone)]
pub struct SteamApiClient {
    http: reqwest::Client,
    key: String,
}

impl SteamApiClient {
    pub fn new(key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            key,
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: String,
    ) -> Result<T, SteamApiError> {
        let response = self.http.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(SteamApiError::Status(response.status()));
        }
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    fn join_ids(ids: &[PlayerId]) -> String {
        let mut joined = String::new();
        for (position, id) in ids.iter().enumerate() {
            if position > 0 {
                joined.push(',');
            }
            joined.push_str(&id.0.to_string());
        }
        joined
    }

    /// Account summaries for up to 100 ids in one call
    pub async fn player_summaries(
        &self,
        ids: &[PlayerId],
    ) -> Result<Vec<(PlayerId, PlayerSummary)>, SteamApiError> {
        let url = format!(
            "{API_BASE}/ISteamUser/GetPlayerSummaries/v2/?key={}&steamids={}",
            self.key,
            Self::join_ids(ids)
        );
        let envelope: SummariesEnvelope = self.get_json(url).await?;
        Ok(envelope
            .response
            .players
            .into_iter()
            .map(|summary| (summary.id, summary))
            .collect())
    }

    /// Ban records for up to 100 ids in one call
    pub async fn player_bans(
        &self,
        ids: &[PlayerId],
    ) -> Result<Vec<(PlayerId, PlayerBans)>, SteamApiError> {
        let url = format!(
            "{API_BASE}/ISteamUser/GetPlayerBans/v1/?key={}&steamids={}",
            self.key,
            Self::join_ids(ids)
        );
        let envelope: BansEnvelope = self.get_json(url).await?;
        Ok(envelope
            .players
            .into_iter()
            .map(|bans| (bans.id, bans))
            .collect())
    }

    /// Playtime in the monitored app for each id. The endpoint is
    /// per-account, so the batch fans out concurrently; accounts with
    /// private game details are omitted from the result rather than
    /// failing the batch.
    pub async fn playtime(
        &self,
        ids: &[PlayerId],
    ) -> Result<Vec<(PlayerId, Duration)>, SteamApiError> {
        let mut tasks = JoinSet::new();
        for id in ids.iter().copied() {
            let client = self.clone();
            tasks.spawn(async move { (id, client.owned_playtime(id).await) });
        }

        let mut results = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            let Ok((id, fetched)) = joined else { continue };
            match fetched {
                Ok(Some(playtime)) => results.push((id, playtime)),
                Ok(None) => debug!(%id, "game details private, playtime unavailable"),
                Err(err) => debug!(%id, error = %err, "playtime fetch failed"),
            }
        }
        Ok(results)
    }

    async fn owned_playtime(&self, id: PlayerId) -> Result<Option<Duration>, SteamApiError> {
        let url = format!(
            "{API_BASE}/IPlayerService/GetOwnedGames/v1/?key={}&steamid={}&include_played_free_games=1",
            self.key, id.0
        );
        let envelope: OwnedGamesEnvelope = self.get_json(url).await?;
        let Some(games) = envelope.response.games else {
            return Ok(None);
        };
        let minutes = games
            .iter()
            .find(|game| game.appid == MONITORED_APP_ID)
            .map_or(0, |game| game.playtime_forever);
        Ok(Some(Duration::from_secs(minutes * 60)))
    }

    /// The local account's friends list. Fails with HTTP 401 when the
    /// list is private.
    pub async fn friend_list(&self, local: PlayerId) -> Result<FxHashSet<PlayerId>, SteamApiError> {
        let url = format!(
            "{API_BASE}/ISteamUser/GetFriendList/v1/?key={}&steamid={}&relationship=friend",
            self.key, local.0
        );
        let envelope: FriendsEnvelope = self.get_json(url).await?;
        Ok(envelope
            .friendslist
            .friends
            .into_iter()
            .map(|friend| friend.id)
            .collect())
    }

    // --- spawned variants for non-blocking polling ---

    pub fn spawn_summaries(&self, ids: Vec<PlayerId>) -> BatchReceiver<PlayerSummary> {
        let client = self.clone();
        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            let _ = tx.send(client.player_summaries(&ids).await);
        });
        rx
    }

    pub fn spawn_bans(&self, ids: Vec<PlayerId>) -> BatchReceiver<PlayerBans> {
        let client = self.clone();
        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            let _ = tx.send(client.player_bans(&ids).await);
        });
        rx
    }

    pub fn spawn_playtime(&self, ids: Vec<PlayerId>) -> BatchReceiver<Duration> {
        let client = self.clone();
        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            let _ = tx.send(client.playtime(&ids).await);
        });
        rx
    }

    pub fn spawn_friend_list(
        &self,
        local: PlayerId,
    ) -> oneshot::Receiver<Result<FxHashSet<PlayerId>, SteamApiError>> {
        let client = self.clone();
        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            let _ = tx.send(client.friend_list(local).await);
        });
        rx
    }
}
