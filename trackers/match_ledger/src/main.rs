use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use std::{io::Write, sync::Arc};
use tracing::info;

use match_ledger::{
    date_grouping::{format_day, group_by_day},
    utils::parse_score,
    Confirm, Decision, DeleteOutcome, HttpTrackerApi, MatchId, Side, TournamentId, TrackerConfig,
    TrackerView, View,
};

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Tournament to work on, defaults to the first one the backend lists
    #[arg(short, long, global = true)]
    tournament: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List tournaments
    Tournaments,
    /// Show the standings table
    Standings,
    /// Show one page of match history grouped by day
    History {
        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },
    /// Change the score or half length of a match
    Edit {
        #[arg(short, long = "match")]
        match_id: String,
        /// New score, e.g. 3-1
        #[arg(short, long)]
        score: Option<String>,
        /// Minutes per half (3-6)
        #[arg(long)]
        half_length: Option<String>,
    },
    /// Delete a match
    Delete {
        #[arg(short, long = "match")]
        match_id: String,
        /// Skip the confirmation question
        #[arg(short, long)]
        yes: bool,
    },
}

struct StdinConfirm;

#[async_trait]
impl Confirm for StdinConfirm {
    async fn confirm(&self, prompt: &str) -> Decision {
        let prompt = prompt.to_string();
        let answer = tokio::task::spawn_blocking(move || {
            print!("{} [y/N] ", prompt);
            std::io::stdout().flush().ok()?;
            let mut line = String::new();
            std::io::stdin().read_line(&mut line).ok()?;
            Some(line)
        })
        .await
        .ok()
        .flatten();

        match answer.as_deref().map(str::trim) {
            Some("y") | Some("Y") | Some("yes") => Decision::Yes,
            _ => Decision::No,
        }
    }
}

struct AssumeYes;

#[async_trait]
impl Confirm for AssumeYes {
    async fn confirm(&self, _prompt: &str) -> Decision {
        Decision::Yes
    }
}

fn print_toasts(view: &TrackerView) {
    for toast in view.toasts().visible() {
        println!("[{:?}] {}", toast.severity, toast.message);
    }
}

fn print_standings(view: &TrackerView) {
    println!(
        "{:>3}  {:<20} {:>3} {:>3} {:>3} {:>3} {:>4} {:>4} {:>5} {:>4}",
        "Pos", "Player", "P", "W", "D", "L", "GF", "GA", "GD", "Pts"
    );
    for (rank, row) in view.standings().ranked() {
        println!(
            "{:>3}  {:<20} {:>3} {:>3} {:>3} {:>3} {:>4} {:>4} {:>5} {:>4}",
            rank,
            row.display_name(),
            row.total_matches,
            row.wins,
            row.draws,
            row.losses,
            row.total_goals_scored,
            row.total_goals_conceded,
            row.goal_difference_label(),
            row.points
        );
    }
}

fn print_history(view: &TrackerView) {
    let Some(snapshot) = view.ledger().snapshot() else {
        println!("No matches loaded");
        return;
    };
    let page = &snapshot.value;
    for (day, matches) in group_by_day(&page.items).iter() {
        println!("\n{}", format_day(day));
        for record in matches {
            println!(
                "  [{}] {} {} {}  ({} min halves)",
                record.id,
                record.player1_name,
                record.score_line(),
                record.player2_name,
                record.half_length
            );
        }
    }
    println!("\nPage {}/{}", page.page, page.total_pages.max(1));
}

/// Pages through the history until `match_id` is on the loaded page.
async fn seek_match(view: &TrackerView, match_id: &MatchId) -> Result<()> {
    view.activate_view(View::History).await?;
    view.change_page(1).await?;
    loop {
        if view.ledger().find(match_id).is_some() {
            return Ok(());
        }
        if !view.pagination().next_page_exists() {
            return Err(anyhow!("Match {} not found in this tournament", match_id));
        }
        view.next_page().await?;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = TrackerConfig::from_env();
    let api = Arc::new(HttpTrackerApi::new(&config.api)?);
    let view = TrackerView::new(api, &config);
    // The backend enforces who may change matches.
    view.set_tournament_creator(true);

    view.initialize()
        .await
        .context("Failed to load tournaments")?;
    if let Some(id) = &cli.tournament {
        let id = TournamentId(id.clone());
        if view.active_tournament_id().as_ref() != Some(&id) {
            view.select_tournament(&id).await;
        }
    }
    let Some(tournament_id) = view.active_tournament_id() else {
        println!("No tournaments found");
        return Ok(());
    };
    info!("Active tournament: {}", tournament_id);

    match cli.command {
        Commands::Tournaments => {
            for tournament in view.tournaments() {
                let marker = if tournament.id == tournament_id { "*" } else { " " };
                println!(
                    "{} {:<12} {:<30} {} - {}  {}",
                    marker,
                    tournament.id,
                    tournament.name,
                    tournament.start_date.as_deref().unwrap_or("?"),
                    tournament.end_date.as_deref().unwrap_or("?"),
                    tournament.status_label()
                );
            }
        }
        Commands::Standings => print_standings(&view),
        Commands::History { page } => {
            view.activate_view(View::History).await?;
            view.change_page(page).await?;
            print_history(&view);
        }
        Commands::Edit {
            match_id,
            score,
            half_length,
        } => {
            let match_id = MatchId(match_id);
            seek_match(&view, &match_id).await?;
            view.begin_edit(&match_id)?;

            let mutations = view.mutations();
            if let Some(score) = score {
                let (goals1, goals2) = parse_score(&score)?;
                mutations
                    .set_goals(Side::Player1, goals1)
                    .and(mutations.set_goals(Side::Player2, goals2))
                    .ok_or_else(|| anyhow!("Edit did not start"))?;
            }
            if let Some(minutes) = half_length {
                mutations.set_half_length_input(&minutes);
            }

            let result = view.commit_edit().await;
            print_toasts(&view);
            result?;
            print_history(&view);
        }
        Commands::Delete { match_id, yes } => {
            let match_id = MatchId(match_id);
            seek_match(&view, &match_id).await?;
            let outcome = if yes {
                view.delete_match(&match_id, &AssumeYes).await
            } else {
                view.delete_match(&match_id, &StdinConfirm).await
            };
            print_toasts(&view);
            if outcome? == DeleteOutcome::Declined {
                println!("Nothing deleted");
            }
        }
    }

    Ok(())
}
