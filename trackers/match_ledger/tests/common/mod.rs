#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use match_ledger::{
    Confirm, Decision, FetchError, MatchId, MatchRecord, MatchUpdate, MutationError, Page, Player,
    PlayerStanding, TrackerApi, TrackerConfig, TrackerView, Tournament, TournamentId,
};

#[derive(Default)]
struct FakeState {
    tournaments: Vec<Tournament>,
    players: HashMap<TournamentId, Vec<Player>>,
    standings: HashMap<TournamentId, Vec<PlayerStanding>>,
    matches: HashMap<TournamentId, Vec<MatchRecord>>,
    delays: HashMap<String, Duration>,
    failures: HashSet<String>,
    calls: Vec<String>,
}

/// In-memory backend. Calls are keyed like "matches:a:2" or "update:a-m3" so
/// tests can delay or fail individual requests and count them afterwards.
#[derive(Default)]
pub struct FakeTrackerApi {
    state: Mutex<FakeState>,
}

impl FakeTrackerApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tournament(self, id: &str, match_count: usize) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            let tid = TournamentId::from(id);
            state.tournaments.push(Tournament {
                id: tid.clone(),
                name: format!("Tournament {}", id.to_uppercase()),
                start_date: Some("2025-07-01".to_string()),
                end_date: Some("2025-08-01".to_string()),
                completed: false,
            });
            state.players.insert(
                tid.clone(),
                vec![player(&format!("{}-u1", id)), player(&format!("{}-u2", id))],
            );
            state.standings.insert(
                tid.clone(),
                vec![standing(&format!("{}-u1", id), 9), standing(&format!("{}-u2", id), 3)],
            );
            let records = (0..match_count).map(|i| record(id, i)).collect();
            state.matches.insert(tid, records);
        }
        self
    }

    pub fn set_standings(&self, tournament: &str, rows: Vec<PlayerStanding>) {
        self.state
            .lock()
            .unwrap()
            .standings
            .insert(TournamentId::from(tournament), rows);
    }

    pub fn delay(&self, key: &str, millis: u64) {
        self.state
            .lock()
            .unwrap()
            .delays
            .insert(key.to_string(), Duration::from_millis(millis));
    }

    pub fn fail(&self, key: &str) {
        self.state.lock().unwrap().failures.insert(key.to_string());
    }

    pub fn heal(&self, key: &str) {
        self.state.lock().unwrap().failures.remove(key);
    }

    /// Number of calls whose key starts with `prefix`.
    pub fn calls(&self, prefix: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|call| call.starts_with(prefix))
            .count()
    }

    pub fn stored_match(&self, tournament: &str, match_id: &str) -> Option<MatchRecord> {
        let state = self.state.lock().unwrap();
        state
            .matches
            .get(&TournamentId::from(tournament))?
            .iter()
            .find(|r| r.id.0 == match_id)
            .cloned()
    }

    async fn enter(&self, key: String) -> bool {
        let (delay, fails) = {
            let mut state = self.state.lock().unwrap();
            state.calls.push(key.clone());
            (state.delays.get(&key).copied(), state.failures.contains(&key))
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        fails
    }
}

#[async_trait]
impl TrackerApi for FakeTrackerApi {
    async fn list_tournaments(&self) -> Result<Vec<Tournament>, FetchError> {
        if self.enter("tournaments".to_string()).await {
            return Err(FetchError::Unreachable("tournaments down".to_string()));
        }
        Ok(self.state.lock().unwrap().tournaments.clone())
    }

    async fn list_tournament_players(
        &self,
        tournament_id: &TournamentId,
    ) -> Result<Vec<Player>, FetchError> {
        if self.enter(format!("players:{}", tournament_id)).await {
            return Err(FetchError::Unreachable("players down".to_string()));
        }
        Ok(self
            .state
            .lock()
            .unwrap()
            .players
            .get(tournament_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_standings(
        &self,
        tournament_id: &TournamentId,
    ) -> Result<Vec<PlayerStanding>, FetchError> {
        if self.enter(format!("standings:{}", tournament_id)).await {
            return Err(FetchError::Unreachable("standings down".to_string()));
        }
        Ok(self
            .state
            .lock()
            .unwrap()
            .standings
            .get(tournament_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_matches(
        &self,
        tournament_id: &TournamentId,
        page: u32,
        page_size: u32,
    ) -> Result<Page<MatchRecord>, FetchError> {
        if self
            .enter(format!("matches:{}:{}", tournament_id, page))
            .await
        {
            return Err(FetchError::Unreachable("matches down".to_string()));
        }
        let state = self.state.lock().unwrap();
        let all = state.matches.get(tournament_id).cloned().unwrap_or_default();
        let size = page_size as usize;
        let total_pages = ((all.len() + size - 1) / size) as u32;
        let items = all
            .iter()
            .skip((page as usize - 1) * size)
            .take(size)
            .cloned()
            .collect();
        Ok(Page {
            items,
            page,
            page_size,
            total: all.len() as u64,
            total_pages,
        })
    }

    async fn update_match(
        &self,
        match_id: &MatchId,
        update: &MatchUpdate,
    ) -> Result<(), MutationError> {
        if self.enter(format!("update:{}", match_id)).await {
            return Err(MutationError::Rejected("update refused".to_string()));
        }
        let mut state = self.state.lock().unwrap();
        let record = state
            .matches
            .values_mut()
            .flat_map(|records| records.iter_mut())
            .find(|r| &r.id == match_id)
            .ok_or_else(|| MutationError::Rejected("no such match".to_string()))?;
        record.player1_goals = update.player1_goals;
        record.player2_goals = update.player2_goals;
        record.half_length = update.half_length;
        Ok(())
    }

    async fn delete_match(&self, match_id: &MatchId) -> Result<(), MutationError> {
        if self.enter(format!("delete:{}", match_id)).await {
            return Err(MutationError::Rejected("delete refused".to_string()));
        }
        let mut state = self.state.lock().unwrap();
        for records in state.matches.values_mut() {
            records.retain(|r| &r.id != match_id);
        }
        Ok(())
    }
}

pub fn player(id: &str) -> Player {
    Player {
        id: id.to_string(),
        username: id.to_string(),
        first_name: None,
    }
}

pub fn standing(id: &str, points: u32) -> PlayerStanding {
    PlayerStanding {
        id: id.to_string(),
        username: id.to_string(),
        first_name: None,
        total_matches: 3,
        wins: points / 3,
        draws: points % 3,
        losses: 3 - points / 3 - points % 3,
        total_goals_scored: 5,
        total_goals_conceded: 4,
        goal_difference: 1,
        points,
    }
}

/// Match `index` of tournament `tournament`: id "{tournament}-m{index}",
/// 2-1 with 4 minute halves, three hours apart going back in time.
pub fn record(tournament: &str, index: usize) -> MatchRecord {
    let latest = Utc.with_ymd_and_hms(2025, 7, 18, 21, 0, 0).unwrap();
    MatchRecord {
        id: MatchId(format!("{}-m{}", tournament, index)),
        player1_id: format!("{}-u1", tournament),
        player2_id: format!("{}-u2", tournament),
        player1_name: "Alex".to_string(),
        player2_name: "Sam".to_string(),
        player1_goals: 2,
        player2_goals: 1,
        half_length: 4,
        date: latest - ChronoDuration::hours(3 * index as i64),
    }
}

pub fn tracker(api: Arc<FakeTrackerApi>) -> TrackerView {
    let view = TrackerView::new(api, &TrackerConfig::default());
    view.set_tournament_creator(true);
    view
}

/// Answers the delete question and counts how often it was asked.
pub struct Answer {
    decision: Decision,
    asked: AtomicUsize,
}

impl Answer {
    pub fn yes() -> Self {
        Self {
            decision: Decision::Yes,
            asked: AtomicUsize::new(0),
        }
    }

    pub fn no() -> Self {
        Self {
            decision: Decision::No,
            asked: AtomicUsize::new(0),
        }
    }

    /// Behaves like a dialog closed without an answer.
    pub fn dismissed() -> Self {
        Self {
            decision: Decision::default(),
            asked: AtomicUsize::new(0),
        }
    }

    pub fn asked(&self) -> usize {
        self.asked.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Confirm for Answer {
    async fn confirm(&self, _prompt: &str) -> Decision {
        self.asked.fetch_add(1, Ordering::SeqCst);
        self.decision
    }
}
