use std::sync::Arc;
use tracing::debug;

use crate::{
    fence::{ApplyOutcome, FetchTag, Snapshot, TaggedSlot},
    types::{MatchId, MatchRecord, Page, TournamentId},
};

pub type LedgerSnapshot = Snapshot<Page<MatchRecord>>;

/// The page of matches currently shown for the active tournament.
///
/// Records are stored as received; range checks on goals and half-length
/// belong to the edit path.
#[derive(Default)]
pub struct MatchLedgerStore {
    slot: TaggedSlot<Page<MatchRecord>>,
}

impl MatchLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn retarget(&self, tournament_id: &TournamentId) {
        self.slot.retarget(tournament_id);
    }

    pub fn tag(&self, tournament_id: &TournamentId) -> FetchTag {
        self.slot.tag(tournament_id)
    }

    pub fn apply(&self, tag: &FetchTag, page: Page<MatchRecord>) -> ApplyOutcome {
        let page_number = page.page;
        let outcome = self.slot.apply(tag, page);
        if outcome == ApplyOutcome::Stale {
            debug!(
                "Dropping stale page {} for tournament {} (request #{})",
                page_number,
                tag.tournament_id(),
                tag.seq()
            );
        }
        outcome
    }

    /// Unconditional overwrite, no merging with what was there.
    pub fn replace(&self, tournament_id: &TournamentId, page: Page<MatchRecord>) {
        self.slot.replace(tournament_id, page);
    }

    pub fn snapshot(&self) -> Option<Arc<LedgerSnapshot>> {
        self.slot.snapshot()
    }

    /// Looks a match up on the displayed page.
    pub fn find(&self, match_id: &MatchId) -> Option<MatchRecord> {
        self.snapshot()?
            .value
            .items
            .iter()
            .find(|record| &record.id == match_id)
            .cloned()
    }
}
