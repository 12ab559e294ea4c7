//! Entry points for the presentation shell: tournament selection, view
//! switches, paging and the edit/delete events.

use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{error, info};

use crate::{
    api::{MeteredApi, TrackerApi},
    config::TrackerConfig,
    error::{FetchError, MutationError},
    fence::{ApplyOutcome, TaggedSlot},
    ledger::MatchLedgerStore,
    metrics::MetricsCollector,
    mutation::{Confirm, DeleteOutcome, LedgerEvent, MutationCoordinator},
    pagination::PaginationController,
    standings::StandingsProjection,
    toast::ToastQueue,
    types::{MatchId, Player, Tournament, TournamentId, View},
};

/// What happened to each of the fetches started by a tournament switch.
#[derive(Debug)]
pub struct TournamentLoad {
    pub players: Result<ApplyOutcome, FetchError>,
    pub standings: Result<ApplyOutcome, FetchError>,
    pub matches: Result<ApplyOutcome, FetchError>,
}

struct Session {
    tournaments: Vec<Tournament>,
    active: Option<TournamentId>,
    view: View,
    is_creator: bool,
}

pub struct TrackerView {
    api: Arc<dyn TrackerApi>,
    metrics: MetricsCollector,
    toasts: ToastQueue,
    ledger: MatchLedgerStore,
    pagination: PaginationController,
    standings: StandingsProjection,
    roster: TaggedSlot<Vec<Player>>,
    mutations: MutationCoordinator,
    mutation_events: Mutex<broadcast::Receiver<LedgerEvent>>,
    session: Mutex<Session>,
}

impl TrackerView {
    pub fn new(api: Arc<dyn TrackerApi>, config: &TrackerConfig) -> Self {
        let metrics = MetricsCollector::new();
        let api: Arc<dyn TrackerApi> = Arc::new(MeteredApi::new(api, metrics.clone()));
        let toasts = ToastQueue::new(Duration::from_millis(config.notifications.toast_ttl_ms));
        let mutations = MutationCoordinator::new(api.clone(), toasts.clone());
        let mutation_events = Mutex::new(mutations.subscribe());

        Self {
            pagination: PaginationController::new(api.clone(), config.ledger.page_size),
            standings: StandingsProjection::new(api.clone()),
            ledger: MatchLedgerStore::new(),
            roster: TaggedSlot::new(),
            api,
            metrics,
            toasts,
            mutations,
            mutation_events,
            session: Mutex::new(Session {
                tournaments: Vec::new(),
                active: None,
                view: View::Standings,
                is_creator: false,
            }),
        }
    }

    /// Loads the tournament list and selects the first tournament, if any.
    pub async fn initialize(&self) -> Result<Option<TournamentLoad>, FetchError> {
        let tournaments = self.api.list_tournaments().await.map_err(|e| {
            error!("Error fetching tournaments: {}", e);
            e
        })?;
        info!("Loaded {} tournaments", tournaments.len());
        let first = tournaments.first().map(|t| t.id.clone());
        self.session().tournaments = tournaments;

        match first {
            Some(id) => Ok(Some(self.select_tournament(&id).await)),
            None => Ok(None),
        }
    }

    /// Makes `tournament_id` active and loads its players, standings and the
    /// first page of matches. The three fetches are independent: one failing
    /// leaves its previous data in place and does not stop the others.
    pub async fn select_tournament(&self, tournament_id: &TournamentId) -> TournamentLoad {
        info!("Selecting tournament {}", tournament_id);
        self.session().active = Some(tournament_id.clone());
        self.pagination.reset();
        self.ledger.retarget(tournament_id);
        self.standings.retarget(tournament_id);
        self.roster.retarget(tournament_id);

        let (players, standings, matches) = tokio::join!(
            self.load_players(tournament_id),
            self.refresh_standings(tournament_id),
            self.load_ledger_page(tournament_id, 1),
        );
        TournamentLoad {
            players,
            standings,
            matches,
        }
    }

    /// Switches the visible view. Standings are refetched when the user comes
    /// back to them from another view; history refetches the current page.
    pub async fn activate_view(&self, view: View) -> Result<(), FetchError> {
        let (previous, active) = {
            let mut session = self.session();
            let previous = std::mem::replace(&mut session.view, view);
            (previous, session.active.clone())
        };
        let Some(tournament_id) = active else {
            return Ok(());
        };

        match view {
            View::Standings if previous != View::Standings => {
                self.refresh_standings(&tournament_id).await.map(|_| ())
            }
            View::History => {
                let page = self.pagination.current_page();
                self.load_ledger_page(&tournament_id, page).await.map(|_| ())
            }
            _ => Ok(()),
        }
    }

    /// Requests a page of the active tournament. The current page only moves
    /// once the page is accepted into the ledger.
    pub async fn change_page(&self, page: u32) -> Result<ApplyOutcome, FetchError> {
        let Some(tournament_id) = self.active_tournament_id() else {
            return Ok(ApplyOutcome::Stale);
        };
        self.load_ledger_page(&tournament_id, page).await
    }

    /// Loads the page after the one shown. Does nothing on the last page.
    pub async fn next_page(&self) -> Result<ApplyOutcome, FetchError> {
        match self.pagination.next_page_number() {
            Some(page) => self.change_page(page).await,
            None => Ok(ApplyOutcome::Stale),
        }
    }

    pub async fn previous_page(&self) -> Result<ApplyOutcome, FetchError> {
        match self.pagination.previous_page_number() {
            Some(page) => self.change_page(page).await,
            None => Ok(ApplyOutcome::Stale),
        }
    }

    /// Whether the signed-in user may change matches in the active tournament.
    /// Supplied by the shell; not derived here.
    pub fn set_tournament_creator(&self, is_creator: bool) {
        self.session().is_creator = is_creator;
    }

    pub fn is_tournament_creator(&self) -> bool {
        self.session().is_creator
    }

    pub fn begin_edit(&self, match_id: &MatchId) -> Result<(), MutationError> {
        self.ensure_creator()?;
        let record = self
            .ledger
            .find(match_id)
            .ok_or_else(|| MutationError::UnknownMatch(match_id.clone()))?;
        self.mutations.begin_edit(&record)
    }

    /// Commits the current edit, then refetches the ledger page and the
    /// standings if it went through.
    pub async fn commit_edit(&self) -> Result<(), MutationError> {
        let result = self.mutations.commit().await;
        self.sync_after_mutations().await;
        result
    }

    pub async fn delete_match(
        &self,
        match_id: &MatchId,
        confirm: &dyn Confirm,
    ) -> Result<DeleteOutcome, MutationError> {
        self.ensure_creator()?;
        let result = self.mutations.delete_match(match_id, confirm).await;
        self.sync_after_mutations().await;
        result
    }

    /// Drains pending mutation events and, if there were any, refetches the
    /// current ledger page and the standings once. Returns the number of
    /// events consumed.
    pub async fn sync_after_mutations(&self) -> usize {
        let mut seen = 0usize;
        {
            let mut events = self
                .mutation_events
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            loop {
                match events.try_recv() {
                    Ok(_) => seen += 1,
                    Err(TryRecvError::Lagged(missed)) => {
                        seen = seen.saturating_add(usize::try_from(missed).unwrap_or(usize::MAX))
                    }
                    Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
                }
            }
        }
        if seen == 0 {
            return 0;
        }
        let Some(tournament_id) = self.active_tournament_id() else {
            return seen;
        };

        info!("Resyncing tournament {} after {} change(s)", tournament_id, seen);
        let page = self.pagination.current_page();
        // failures are logged inside and leave the old data showing
        let _ = tokio::join!(
            self.load_ledger_page(&tournament_id, page),
            self.refresh_standings(&tournament_id),
        );
        seen
    }

    pub fn tournaments(&self) -> Vec<Tournament> {
        self.session().tournaments.clone()
    }

    pub fn active_tournament_id(&self) -> Option<TournamentId> {
        self.session().active.clone()
    }

    pub fn active_tournament(&self) -> Option<Tournament> {
        let session = self.session();
        let active = session.active.as_ref()?;
        session.tournaments.iter().find(|t| &t.id == active).cloned()
    }

    pub fn current_view(&self) -> View {
        self.session().view
    }

    pub fn players(&self) -> Vec<Player> {
        self.roster
            .snapshot()
            .map(|snapshot| snapshot.value.clone())
            .unwrap_or_default()
    }

    pub fn ledger(&self) -> &MatchLedgerStore {
        &self.ledger
    }

    pub fn standings(&self) -> &StandingsProjection {
        &self.standings
    }

    pub fn pagination(&self) -> &PaginationController {
        &self.pagination
    }

    pub fn mutations(&self) -> &MutationCoordinator {
        &self.mutations
    }

    pub fn toasts(&self) -> &ToastQueue {
        &self.toasts
    }

    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    async fn load_players(&self, tournament_id: &TournamentId) -> Result<ApplyOutcome, FetchError> {
        let tag = self.roster.tag(tournament_id);
        match self.api.list_tournament_players(tournament_id).await {
            Ok(players) => {
                let outcome = self.roster.apply(&tag, players);
                self.note_outcome(outcome);
                Ok(outcome)
            }
            Err(e) => {
                error!("Error fetching players for tournament {}: {}", tournament_id, e);
                Err(e)
            }
        }
    }

    async fn refresh_standings(
        &self,
        tournament_id: &TournamentId,
    ) -> Result<ApplyOutcome, FetchError> {
        match self.standings.refresh(tournament_id).await {
            Ok(Some(_)) => Ok(ApplyOutcome::Applied),
            Ok(None) => {
                self.metrics.record_stale_drop();
                Ok(ApplyOutcome::Stale)
            }
            Err(e) => {
                error!("Error fetching standings for tournament {}: {}", tournament_id, e);
                Err(e)
            }
        }
    }

    async fn load_ledger_page(
        &self,
        tournament_id: &TournamentId,
        page_number: u32,
    ) -> Result<ApplyOutcome, FetchError> {
        let mut page_number = page_number.max(1);
        loop {
            let tag = self.ledger.tag(tournament_id);
            let page = match self
                .pagination
                .load_page(tournament_id, page_number, self.pagination.page_size())
                .await
            {
                Ok(page) => page,
                Err(e) => {
                    error!(
                        "Error fetching matches page {} for tournament {}: {}",
                        page_number, tournament_id, e
                    );
                    return Err(e);
                }
            };

            // The page can disappear under us, e.g. after deleting the only
            // match on the last page. Step back to the last page the backend
            // reports.
            if page.items.is_empty() && page_number > 1 && page.total_pages < page_number {
                let last = page.total_pages.max(1);
                info!(
                    "Page {} of tournament {} is past the end, loading page {}",
                    page_number, tournament_id, last
                );
                page_number = last;
                continue;
            }

            let outcome = self.ledger.apply(&tag, page);
            if outcome == ApplyOutcome::Applied {
                if let Some(snapshot) = self.ledger.snapshot() {
                    self.pagination.record_loaded(&snapshot.value);
                }
            }
            self.note_outcome(outcome);
            return Ok(outcome);
        }
    }

    fn note_outcome(&self, outcome: ApplyOutcome) {
        if outcome == ApplyOutcome::Stale {
            self.metrics.record_stale_drop();
        }
    }

    fn ensure_creator(&self) -> Result<(), MutationError> {
        if self.is_tournament_creator() {
            Ok(())
        } else {
            Err(MutationError::NotPermitted)
        }
    }

    fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
