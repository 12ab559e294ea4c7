//! The tracker backend as seen by the ledger core.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{sync::Arc, time::Duration};
use tracing::debug;

use crate::{
    config::ApiConfig,
    error::{FetchError, MutationError},
    metrics::{CallTracker, MetricsCollector},
    types::{MatchId, MatchRecord, Page, Player, PlayerStanding, Tournament, TournamentId},
};

/// Fields sent when a match is edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchUpdate {
    pub player1_goals: u32,
    pub player2_goals: u32,
    pub half_length: u32,
}

#[async_trait]
pub trait TrackerApi: Send + Sync {
    async fn list_tournaments(&self) -> Result<Vec<Tournament>, FetchError>;

    async fn list_tournament_players(
        &self,
        tournament_id: &TournamentId,
    ) -> Result<Vec<Player>, FetchError>;

    /// Ranked rows; the order returned is the ranking.
    async fn get_standings(
        &self,
        tournament_id: &TournamentId,
    ) -> Result<Vec<PlayerStanding>, FetchError>;

    async fn get_matches(
        &self,
        tournament_id: &TournamentId,
        page: u32,
        page_size: u32,
    ) -> Result<Page<MatchRecord>, FetchError>;

    async fn update_match(&self, match_id: &MatchId, update: &MatchUpdate)
        -> Result<(), MutationError>;

    async fn delete_match(&self, match_id: &MatchId) -> Result<(), MutationError>;
}

pub struct HttpTrackerApi {
    client: reqwest::Client,
    base_url: String,
    auth_token: Option<String>,
}

impl HttpTrackerApi {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            auth_token: config.auth_token.clone(),
        })
    }

    fn tournament_url(&self, tournament_id: &TournamentId, resource: &str) -> String {
        format!(
            "{}/tournaments/{}/{}",
            self.base_url,
            urlencoding::encode(&tournament_id.0),
            resource
        )
    }

    fn match_url(&self, match_id: &MatchId) -> String {
        format!("{}/matches/{}", self.base_url, urlencoding::encode(&match_id.0))
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.auth_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, FetchError> {
        debug!("GET {}", url);
        let response = self.request(Method::GET, url).query(query).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                message: body_text(response).await,
            });
        }
        Ok(response.json::<T>().await?)
    }

    async fn send_mutation(&self, builder: RequestBuilder) -> Result<(), MutationError> {
        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(MutationError::Rejected(format!(
                "status {}: {}",
                status.as_u16(),
                body_text(response).await
            )));
        }
        Ok(())
    }
}

async fn body_text(response: Response) -> String {
    response.text().await.unwrap_or_default()
}

#[async_trait]
impl TrackerApi for HttpTrackerApi {
    async fn list_tournaments(&self) -> Result<Vec<Tournament>, FetchError> {
        self.get_json(&format!("{}/tournaments", self.base_url), &[]).await
    }

    async fn list_tournament_players(
        &self,
        tournament_id: &TournamentId,
    ) -> Result<Vec<Player>, FetchError> {
        self.get_json(&self.tournament_url(tournament_id, "players"), &[])
            .await
    }

    async fn get_standings(
        &self,
        tournament_id: &TournamentId,
    ) -> Result<Vec<PlayerStanding>, FetchError> {
        self.get_json(&self.tournament_url(tournament_id, "standings"), &[])
            .await
    }

    async fn get_matches(
        &self,
        tournament_id: &TournamentId,
        page: u32,
        page_size: u32,
    ) -> Result<Page<MatchRecord>, FetchError> {
        self.get_json(
            &self.tournament_url(tournament_id, "matches"),
            &[("page", page.to_string()), ("page_size", page_size.to_string())],
        )
        .await
    }

    async fn update_match(
        &self,
        match_id: &MatchId,
        update: &MatchUpdate,
    ) -> Result<(), MutationError> {
        let url = self.match_url(match_id);
        debug!("PUT {}", url);
        self.send_mutation(self.request(Method::PUT, &url).json(update))
            .await
    }

    async fn delete_match(&self, match_id: &MatchId) -> Result<(), MutationError> {
        let url = self.match_url(match_id);
        debug!("DELETE {}", url);
        self.send_mutation(self.request(Method::DELETE, &url)).await
    }
}

/// Wraps another backend and records every call in a [`MetricsCollector`].
pub struct MeteredApi {
    inner: Arc<dyn TrackerApi>,
    metrics: MetricsCollector,
}

impl MeteredApi {
    pub fn new(inner: Arc<dyn TrackerApi>, metrics: MetricsCollector) -> Self {
        Self { inner, metrics }
    }

    fn observe<T, E: std::fmt::Display>(
        &self,
        tracker: CallTracker,
        result: Result<T, E>,
    ) -> Result<T, E> {
        tracker.finish(result.is_ok());
        if let Err(e) = &result {
            self.metrics.record_error(e.to_string());
        }
        result
    }
}

#[async_trait]
impl TrackerApi for MeteredApi {
    async fn list_tournaments(&self) -> Result<Vec<Tournament>, FetchError> {
        let tracker = self.metrics.record_call_start();
        let result = self.inner.list_tournaments().await;
        self.observe(tracker, result)
    }

    async fn list_tournament_players(
        &self,
        tournament_id: &TournamentId,
    ) -> Result<Vec<Player>, FetchError> {
        let tracker = self.metrics.record_call_start();
        let result = self.inner.list_tournament_players(tournament_id).await;
        self.observe(tracker, result)
    }

    async fn get_standings(
        &self,
        tournament_id: &TournamentId,
    ) -> Result<Vec<PlayerStanding>, FetchError> {
        let tracker = self.metrics.record_call_start();
        let result = self.inner.get_standings(tournament_id).await;
        self.observe(tracker, result)
    }

    async fn get_matches(
        &self,
        tournament_id: &TournamentId,
        page: u32,
        page_size: u32,
    ) -> Result<Page<MatchRecord>, FetchError> {
        let tracker = self.metrics.record_call_start();
        let result = self.inner.get_matches(tournament_id, page, page_size).await;
        self.observe(tracker, result)
    }

    async fn update_match(
        &self,
        match_id: &MatchId,
        update: &MatchUpdate,
    ) -> Result<(), MutationError> {
        let tracker = self.metrics.record_call_start();
        let result = self.inner.update_match(match_id, update).await;
        self.observe(tracker, result)
    }

    async fn delete_match(&self, match_id: &MatchId) -> Result<(), MutationError> {
        let tracker = self.metrics.record_call_start();
        let result = self.inner.delete_match(match_id).await;
        self.observe(tracker, result)
    }
}
