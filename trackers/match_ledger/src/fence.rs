//! Tournament-scoped storage that drops responses to superseded requests.
//!
//! Every fetch takes a [`FetchTag`] before it goes out. The tag records the
//! tournament it was issued for and a sequence number. A response is applied
//! only if its tournament is still the active one and no newer response has
//! already been applied. Readers always see one complete value, never a mix.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::types::TournamentId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTag {
    tournament_id: TournamentId,
    seq: u64,
}

impl FetchTag {
    pub fn tournament_id(&self) -> &TournamentId {
        &self.tournament_id
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }
}

/// A value together with the tournament it was loaded for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot<T> {
    pub tournament_id: TournamentId,
    pub value: T,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    Stale,
}

struct SlotState<T> {
    active: Option<TournamentId>,
    issued: u64,
    applied: u64,
    current: Option<Arc<Snapshot<T>>>,
}

pub struct TaggedSlot<T> {
    state: RwLock<SlotState<T>>,
}

impl<T> Default for TaggedSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TaggedSlot<T> {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(SlotState {
                active: None,
                issued: 0,
                applied: 0,
                current: None,
            }),
        }
    }

    /// Points the slot at another tournament. The held value stays visible
    /// until a response for the new tournament is applied.
    pub fn retarget(&self, tournament_id: &TournamentId) {
        let mut state = self.write();
        state.active = Some(tournament_id.clone());
    }

    pub fn tag(&self, tournament_id: &TournamentId) -> FetchTag {
        let mut state = self.write();
        state.issued += 1;
        FetchTag {
            tournament_id: tournament_id.clone(),
            seq: state.issued,
        }
    }

    pub fn apply(&self, tag: &FetchTag, value: T) -> ApplyOutcome {
        let mut state = self.write();
        if state.active.as_ref() != Some(&tag.tournament_id) || tag.seq <= state.applied {
            return ApplyOutcome::Stale;
        }
        state.applied = tag.seq;
        state.current = Some(Arc::new(Snapshot {
            tournament_id: tag.tournament_id.clone(),
            value,
        }));
        ApplyOutcome::Applied
    }

    /// Overwrites the held value and makes `tournament_id` active. Responses
    /// to requests issued before this call are dropped when they arrive.
    pub fn replace(&self, tournament_id: &TournamentId, value: T) {
        let mut state = self.write();
        state.active = Some(tournament_id.clone());
        state.applied = state.issued;
        state.current = Some(Arc::new(Snapshot {
            tournament_id: tournament_id.clone(),
            value,
        }));
    }

    pub fn snapshot(&self) -> Option<Arc<Snapshot<T>>> {
        self.read().current.clone()
    }

    pub fn active(&self) -> Option<TournamentId> {
        self.read().active.clone()
    }

    fn read(&self) -> RwLockReadGuard<'_, SlotState<T>> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SlotState<T>> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}
