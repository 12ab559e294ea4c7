//! Edit and delete of single match records.
//!
//! One edit session at a time, and one backend write at a time across all
//! matches. Successful writes are announced as [`LedgerEvent`]s on a broadcast
//! channel; whoever owns the ledger and the standings decides how to refresh.

use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::{
    api::{MatchUpdate, TrackerApi},
    error::MutationError,
    toast::ToastQueue,
    types::{MatchId, MatchRecord, Severity, Side},
    utils::{half_length_in_range, parse_half_length, MAX_HALF_LENGTH, MIN_HALF_LENGTH},
};

pub const DELETE_PROMPT: &str =
    "Are you sure you want to delete this match? This action cannot be undone.";
pub const UPDATE_SUCCESS: &str = "Match updated successfully!";
pub const UPDATE_FAILURE: &str = "Failed to update match. Please try again.";
pub const DELETE_SUCCESS: &str = "Match deleted successfully!";
pub const DELETE_FAILURE: &str = "Failed to delete match. Please try again.";

const EVENT_CAPACITY: usize = 64;

/// An uncommitted edit of one match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationIntent {
    pub match_id: MatchId,
    pub player1_goals: u32,
    pub player2_goals: u32,
    pub half_length: u32,
}

impl MutationIntent {
    pub fn from_record(record: &MatchRecord) -> Self {
        Self {
            match_id: record.id.clone(),
            player1_goals: record.player1_goals,
            player2_goals: record.player2_goals,
            half_length: record.half_length,
        }
    }

    pub fn update(&self) -> MatchUpdate {
        MatchUpdate {
            player1_goals: self.player1_goals,
            player2_goals: self.player2_goals,
            half_length: self.half_length,
        }
    }

    fn goals_mut(&mut self, side: Side) -> &mut u32 {
        match side {
            Side::Player1 => &mut self.player1_goals,
            Side::Player2 => &mut self.player2_goals,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditPhase {
    Idle,
    Editing,
    Saving,
    Deleting,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerEvent {
    MatchUpdated { match_id: MatchId, update: MatchUpdate },
    MatchDeleted { match_id: MatchId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Decision {
    Yes,
    #[default]
    No,
}

/// The yes/no question asked before a delete goes out.
#[async_trait]
pub trait Confirm: Send + Sync {
    async fn confirm(&self, prompt: &str) -> Decision;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    Declined,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum InFlight {
    Saving(MatchId),
    Deleting(MatchId),
}

#[derive(Debug, Default)]
struct CoordinatorState {
    edit: Option<MutationIntent>,
    in_flight: Option<InFlight>,
    last_error: Option<MutationError>,
}

pub struct MutationCoordinator {
    api: Arc<dyn TrackerApi>,
    toasts: ToastQueue,
    events: broadcast::Sender<LedgerEvent>,
    state: Mutex<CoordinatorState>,
}

/// Releases the write lock even if the awaiting future is dropped.
struct InFlightGuard<'a> {
    state: &'a Mutex<CoordinatorState>,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .in_flight = None;
    }
}

impl MutationCoordinator {
    pub fn new(api: Arc<dyn TrackerApi>, toasts: ToastQueue) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            api,
            toasts,
            events,
            state: Mutex::new(CoordinatorState::default()),
        }
    }

    /// Receives an event for every successful write. Dropping the receiver
    /// unsubscribes.
    pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.events.subscribe()
    }

    pub fn phase(&self) -> EditPhase {
        let state = self.lock();
        match (&state.in_flight, &state.edit) {
            (Some(InFlight::Saving(_)), _) => EditPhase::Saving,
            (Some(InFlight::Deleting(_)), _) => EditPhase::Deleting,
            (None, Some(_)) => EditPhase::Editing,
            (None, None) => EditPhase::Idle,
        }
    }

    pub fn intent(&self) -> Option<MutationIntent> {
        self.lock().edit.clone()
    }

    pub fn last_error(&self) -> Option<MutationError> {
        self.lock().last_error.clone()
    }

    /// Starts editing `record`, silently dropping any other unsaved edit.
    pub fn begin_edit(&self, record: &MatchRecord) -> Result<(), MutationError> {
        let mut state = self.lock();
        if state.in_flight.is_some() {
            return Err(MutationError::Busy);
        }
        if let Some(previous) = &state.edit {
            if previous.match_id != record.id {
                info!("Dropping unsaved edit of match {}", previous.match_id);
            }
        }
        state.edit = Some(MutationIntent::from_record(record));
        state.last_error = None;
        Ok(())
    }

    pub fn cancel_edit(&self) {
        self.lock().edit = None;
    }

    /// Moves one side's goals by `delta`, never below zero. Returns the new
    /// count, or `None` when nothing is being edited.
    pub fn adjust_goals(&self, side: Side, delta: i32) -> Option<u32> {
        let mut state = self.lock();
        let intent = state.edit.as_mut()?;
        let goals = intent.goals_mut(side);
        let next = (i64::from(*goals) + i64::from(delta)).max(0);
        *goals = u32::try_from(next).unwrap_or(u32::MAX);
        Some(*goals)
    }

    /// Stores the half-length as given. Values outside 3-6 are logged but
    /// kept; the backend decides.
    pub fn set_half_length(&self, minutes: u32) -> bool {
        match self.lock().edit.as_mut() {
            Some(intent) => {
                if !half_length_in_range(minutes) {
                    warn!(
                        "Half length of {} minutes for match {} is outside {}-{}",
                        minutes, intent.match_id, MIN_HALF_LENGTH, MAX_HALF_LENGTH
                    );
                }
                intent.half_length = minutes;
                true
            }
            None => false,
        }
    }

    /// Sets one side's goals outright. Returns the new count, or `None` when
    /// nothing is being edited.
    pub fn set_goals(&self, side: Side, goals: u32) -> Option<u32> {
        let mut state = self.lock();
        let intent = state.edit.as_mut()?;
        *intent.goals_mut(side) = goals;
        Some(goals)
    }

    /// Half-length from raw text input; unparsable text becomes the default.
    pub fn set_half_length_input(&self, input: &str) -> bool {
        self.set_half_length(parse_half_length(input))
    }

    /// Sends the current edit to the backend.
    ///
    /// Refused with `Busy` while another write is out and with `NotEditing`
    /// when there is no edit; neither contacts the backend or shows a toast.
    /// The intent is consumed either way once sent.
    pub async fn commit(&self) -> Result<(), MutationError> {
        let intent = {
            let mut state = self.lock();
            if state.in_flight.is_some() {
                warn!("Commit ignored: another change is in flight");
                return Err(MutationError::Busy);
            }
            let intent = state.edit.take().ok_or(MutationError::NotEditing)?;
            state.in_flight = Some(InFlight::Saving(intent.match_id.clone()));
            intent
        };
        let guard = InFlightGuard { state: &self.state };

        let update = intent.update();
        let result = self.api.update_match(&intent.match_id, &update).await;
        drop(guard);

        match result {
            Ok(()) => {
                info!(
                    "Match {} updated to {}-{} ({} min halves)",
                    intent.match_id, update.player1_goals, update.player2_goals, update.half_length
                );
                self.lock().last_error = None;
                self.toasts.push(UPDATE_SUCCESS, Severity::Success);
                self.publish(LedgerEvent::MatchUpdated {
                    match_id: intent.match_id,
                    update,
                });
                Ok(())
            }
            Err(e) => {
                error!("Error updating match {}: {}", intent.match_id, e);
                self.lock().last_error = Some(e.clone());
                self.toasts.push(UPDATE_FAILURE, Severity::Error);
                Err(e)
            }
        }
    }

    /// Deletes a match after `confirm` answers yes. Anything but a yes leaves
    /// the backend untouched.
    pub async fn delete_match(
        &self,
        match_id: &MatchId,
        confirm: &dyn Confirm,
    ) -> Result<DeleteOutcome, MutationError> {
        if self.lock().in_flight.is_some() {
            warn!("Delete of {} ignored: another change is in flight", match_id);
            return Err(MutationError::Busy);
        }
        if confirm.confirm(DELETE_PROMPT).await != Decision::Yes {
            info!("Delete of match {} declined", match_id);
            return Ok(DeleteOutcome::Declined);
        }

        {
            // re-check, the question may have taken a while
            let mut state = self.lock();
            if state.in_flight.is_some() {
                return Err(MutationError::Busy);
            }
            state.in_flight = Some(InFlight::Deleting(match_id.clone()));
        }
        let guard = InFlightGuard { state: &self.state };

        let result = self.api.delete_match(match_id).await;
        drop(guard);

        match result {
            Ok(()) => {
                info!("Match {} deleted", match_id);
                {
                    let mut state = self.lock();
                    state.last_error = None;
                    if state.edit.as_ref().map(|e| &e.match_id) == Some(match_id) {
                        state.edit = None;
                    }
                }
                self.toasts.push(DELETE_SUCCESS, Severity::Success);
                self.publish(LedgerEvent::MatchDeleted {
                    match_id: match_id.clone(),
                });
                Ok(DeleteOutcome::Deleted)
            }
            Err(e) => {
                error!("Error deleting match {}: {}", match_id, e);
                self.lock().last_error = Some(e.clone());
                self.toasts.push(DELETE_FAILURE, Severity::Error);
                Err(e)
            }
        }
    }

    fn publish(&self, event: LedgerEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }

    fn lock(&self) -> MutexGuard<'_, CoordinatorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
