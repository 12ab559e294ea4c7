pub mod api;
pub mod config;
pub mod date_grouping;
pub mod error;
pub mod fence;
pub mod ledger;
pub mod metrics;
pub mod mutation;
pub mod pagination;
pub mod standings;
pub mod toast;
pub mod types;
pub mod utils;
pub mod view;

pub use api::{HttpTrackerApi, MatchUpdate, TrackerApi};
pub use config::TrackerConfig;
pub use error::{FetchError, MutationError};
pub use mutation::{Confirm, Decision, DeleteOutcome, EditPhase, LedgerEvent, MutationCoordinator};
pub use types::{MatchId, MatchRecord, Page, Player, PlayerStanding, Severity, Side, Tournament, TournamentId, View};
pub use view::TrackerView;
