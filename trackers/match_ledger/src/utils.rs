use anyhow::{Context, Result};

pub const DEFAULT_HALF_LENGTH: u32 = 4;
pub const MIN_HALF_LENGTH: u32 = 3;
pub const MAX_HALF_LENGTH: u32 = 6;

pub fn ordinal_suffix(day: u32) -> &'static str {
    if (11..=13).contains(&(day % 100)) {
        return "th";
    }
    match day % 10 {
        1 => "st",
        2 => "nd",
        3 => "rd",
        _ => "th",
    }
}

/// Parses a "3-1" style score into (player1, player2) goals.
pub fn parse_score(score: &str) -> Result<(u32, u32)> {
    let parts: Vec<&str> = score.split('-').collect();
    if parts.len() != 2 {
        anyhow::bail!("Invalid score format: {}", score);
    }

    let player1_goals = parts[0]
        .trim()
        .parse::<u32>()
        .with_context(|| format!("Invalid player 1 goals: {}", parts[0]))?;
    let player2_goals = parts[1]
        .trim()
        .parse::<u32>()
        .with_context(|| format!("Invalid player 2 goals: {}", parts[1]))?;

    Ok((player1_goals, player2_goals))
}

/// Half-length input as typed by the user. The leading digits are used, so
/// "5.5" and "5min" give 5; no digits, zero or a negative number give the
/// default. Range is not checked here.
pub fn parse_half_length(input: &str) -> u32 {
    let input = input.trim_start();
    let unsigned = input.strip_prefix('+').unwrap_or(input);
    let digits_end = unsigned
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(unsigned.len());
    match unsigned[..digits_end].parse::<u32>() {
        Ok(0) | Err(_) => DEFAULT_HALF_LENGTH,
        Ok(minutes) => minutes,
    }
}

pub fn half_length_in_range(minutes: u32) -> bool {
    (MIN_HALF_LENGTH..=MAX_HALF_LENGTH).contains(&minutes)
}
