use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::{
    api::TrackerApi,
    error::FetchError,
    fence::{ApplyOutcome, Snapshot, TaggedSlot},
    types::{PlayerStanding, TournamentId},
};

pub type StandingsSnapshot = Snapshot<Vec<PlayerStanding>>;

/// Cached ranking for the active tournament.
///
/// Rows are kept in the order the ranking service returned them; position is
/// rank. Nothing here sorts.
pub struct StandingsProjection {
    api: Arc<dyn TrackerApi>,
    slot: TaggedSlot<Vec<PlayerStanding>>,
}

impl StandingsProjection {
    pub fn new(api: Arc<dyn TrackerApi>) -> Self {
        Self {
            api,
            slot: TaggedSlot::new(),
        }
    }

    /// Fetches the ranking for `tournament_id` and makes it the cached one.
    ///
    /// Only accepted while `tournament_id` is the one set by [`retarget`].
    /// Returns `Ok(None)` when the tournament is not (or no longer) active or
    /// a newer refresh landed first; the response is then dropped. On error
    /// the previous projection is left in place.
    ///
    /// [`retarget`]: StandingsProjection::retarget
    pub async fn refresh(
        &self,
        tournament_id: &TournamentId,
    ) -> Result<Option<Arc<StandingsSnapshot>>, FetchError> {
        let tag = self.slot.tag(tournament_id);
        let rows = self.api.get_standings(tournament_id).await?;
        let count = rows.len();
        for row in rows.iter().filter(|row| !row.is_consistent()) {
            warn!(
                "Standings row for {} in tournament {} does not add up: {} played, {}W {}D {}L, GD {}",
                row.username,
                tournament_id,
                row.total_matches,
                row.wins,
                row.draws,
                row.losses,
                row.goal_difference
            );
        }
        match self.slot.apply(&tag, rows) {
            ApplyOutcome::Applied => {
                info!("Standings for {} refreshed ({} players)", tournament_id, count);
                Ok(self.slot.snapshot())
            }
            ApplyOutcome::Stale => {
                debug!(
                    "Dropping stale standings for tournament {} (request #{})",
                    tournament_id,
                    tag.seq()
                );
                Ok(None)
            }
        }
    }

    /// Marks `tournament_id` as the one responses are accepted for.
    pub fn retarget(&self, tournament_id: &TournamentId) {
        self.slot.retarget(tournament_id);
    }

    pub fn active_tournament(&self) -> Option<TournamentId> {
        self.slot.active()
    }

    pub fn current(&self) -> Option<Arc<StandingsSnapshot>> {
        self.slot.snapshot()
    }

    /// Rows paired with their 1-based rank.
    pub fn ranked(&self) -> Vec<(usize, PlayerStanding)> {
        self.current()
            .map(|snapshot| {
                snapshot
                    .value
                    .iter()
                    .cloned()
                    .enumerate()
                    .map(|(index, row)| (index + 1, row))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn leader(&self) -> Option<PlayerStanding> {
        self.current()?.value.first().cloned()
    }
}
