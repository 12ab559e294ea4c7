use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TournamentId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatchId(pub String);

impl fmt::Display for TournamentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TournamentId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for MatchId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tournament {
    pub id: TournamentId,
    pub name: String,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub completed: bool,
}

impl Tournament {
    pub fn status_label(&self) -> &'static str {
        if self.completed {
            "Completed"
        } else {
            "In Progress"
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub first_name: Option<String>,
}

impl Player {
    pub fn display_name(&self) -> &str {
        display_name(self.first_name.as_deref(), &self.username)
    }
}

/// A single head-to-head result as stored by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub id: MatchId,
    pub player1_id: String,
    pub player2_id: String,
    pub player1_name: String,
    pub player2_name: String,
    pub player1_goals: u32,
    pub player2_goals: u32,
    /// Minutes per half.
    pub half_length: u32,
    pub date: DateTime<Utc>,
}

impl MatchRecord {
    pub fn score_line(&self) -> String {
        format!("{} - {}", self.player1_goals, self.player2_goals)
    }
}

/// One row of the ranking as delivered by the ranking service. Order is rank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerStanding {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub first_name: Option<String>,
    pub total_matches: u32,
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
    pub total_goals_scored: u32,
    pub total_goals_conceded: u32,
    pub goal_difference: i64,
    pub points: u32,
}

impl PlayerStanding {
    pub fn display_name(&self) -> &str {
        display_name(self.first_name.as_deref(), &self.username)
    }

    /// Rendered with an explicit sign for non-negative values, e.g. "+3", "+0", "-2".
    pub fn goal_difference_label(&self) -> String {
        if self.goal_difference >= 0 {
            format!("+{}", self.goal_difference)
        } else {
            self.goal_difference.to_string()
        }
    }

    /// Checks played = W+D+L and GD = scored - conceded.
    pub fn is_consistent(&self) -> bool {
        self.total_matches == self.wins + self.draws + self.losses
            && self.goal_difference
                == i64::from(self.total_goals_scored) - i64::from(self.total_goals_conceded)
    }
}

fn display_name<'a>(first_name: Option<&'a str>, username: &'a str) -> &'a str {
    match first_name {
        Some(name) if !name.is_empty() => name,
        _ => username,
    }
}

/// One page of a paginated listing. `page` is 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub page_size: u32,
    #[serde(default)]
    pub total: u64,
    pub total_pages: u32,
}

impl<T> Page<T> {
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    /// Checks the shape of a page returned for `requested` with `page_size`.
    /// An empty page may lie past the last page, e.g. an empty listing with
    /// zero total pages or a page whose last match was just deleted.
    pub fn check(&self, requested: u32, page_size: u32) -> Result<(), String> {
        if self.page != requested {
            return Err(format!("asked for page {} but got page {}", requested, self.page));
        }
        if self.items.len() > page_size as usize {
            return Err(format!(
                "page holds {} items, more than the page size {}",
                self.items.len(),
                page_size
            ));
        }
        if self.items.is_empty() && self.page >= 1 {
            return Ok(());
        }
        if self.page < 1 || self.page > self.total_pages {
            return Err(format!(
                "page {} outside of 1..={}",
                self.page, self.total_pages
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Player1,
    Player2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Success,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Standings,
    History,
    LogMatch,
    Settings,
}
