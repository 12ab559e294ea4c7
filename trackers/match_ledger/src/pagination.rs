use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

use crate::{
    api::TrackerApi,
    error::FetchError,
    types::{MatchRecord, Page, TournamentId},
};

#[derive(Debug, Clone, Copy)]
struct LoadedPage {
    page: u32,
    has_next: bool,
    has_previous: bool,
}

#[derive(Debug, Default)]
struct PagingState {
    current_page: u32,
    last_loaded: Option<LoadedPage>,
}

/// Tracks which page of the match history is wanted and fetches pages.
pub struct PaginationController {
    api: Arc<dyn TrackerApi>,
    page_size: u32,
    state: Mutex<PagingState>,
}

impl PaginationController {
    pub fn new(api: Arc<dyn TrackerApi>, page_size: u32) -> Self {
        Self {
            api,
            page_size,
            state: Mutex::new(PagingState {
                current_page: 1,
                ..PagingState::default()
            }),
        }
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Fetches one page and checks that it is the page that was asked for.
    pub async fn load_page(
        &self,
        tournament_id: &TournamentId,
        page_number: u32,
        page_size: u32,
    ) -> Result<Page<MatchRecord>, FetchError> {
        let page_number = page_number.max(1);
        debug!(
            "Loading page {} (size {}) for tournament {}",
            page_number, page_size, tournament_id
        );
        let page = self
            .api
            .get_matches(tournament_id, page_number, page_size)
            .await?;
        page.check(page_number, page_size)
            .map_err(FetchError::Malformed)?;
        Ok(page)
    }

    /// Starts over at page 1 with nothing loaded.
    pub fn reset(&self) {
        let mut state = self.lock();
        state.current_page = 1;
        state.last_loaded = None;
    }

    /// The page the ledger shows. Only moves when a page is accepted.
    pub fn current_page(&self) -> u32 {
        self.lock().current_page
    }

    /// Remembers the page that was accepted into the ledger and makes it the
    /// current one.
    pub fn record_loaded(&self, page: &Page<MatchRecord>) {
        let mut state = self.lock();
        state.current_page = page.page.max(1);
        state.last_loaded = Some(LoadedPage {
            page: page.page,
            has_next: page.has_next(),
            has_previous: page.has_previous(),
        });
    }

    /// Page after the one shown, if the backend reported one.
    pub fn next_page_number(&self) -> Option<u32> {
        self.lock()
            .last_loaded
            .filter(|loaded| loaded.has_next)
            .map(|loaded| loaded.page + 1)
    }

    pub fn previous_page_number(&self) -> Option<u32> {
        self.lock()
            .last_loaded
            .filter(|loaded| loaded.has_previous)
            .map(|loaded| loaded.page - 1)
    }

    pub fn next_page_exists(&self) -> bool {
        self.next_page_number().is_some()
    }

    pub fn previous_page_exists(&self) -> bool {
        self.previous_page_number().is_some()
    }

    fn lock(&self) -> MutexGuard<'_, PagingState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
