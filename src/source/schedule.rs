//! Event selection over a club schedule document.
//!
//! All functions take `now` in the timezone whose calendar defines "today";
//! the server passes `Local::now()`, tests pass fixed UTC instants.

use chrono::{DateTime, NaiveDate, TimeDelta, TimeZone, Utc};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    pub id: i64,
    #[serde(default)]
    pub game_state: String,
    #[serde(default)]
    pub game_date: Option<String>,
    #[serde(default, rename = "startTimeUTC")]
    pub start_time_utc: Option<String>,
}

impl Game {
    pub fn is_live(&self) -> bool {
        matches!(self.game_state.as_str(), "LIVE" | "CRIT")
    }

    fn has_state(&self, states: &[&str]) -> bool {
        states.contains(&self.game_state.as_str())
    }

    /// Calendar day the game is played on, in the timezone of `tz`.
    pub fn day<Tz: TimeZone>(&self, tz: &Tz) -> Option<NaiveDate> {
        if let Some(date) = self.game_date.as_deref() {
            if let Some(day) = parse_ymd(date) {
                return Some(day);
            }
            if let Ok(parsed) = DateTime::parse_from_rfc3339(date) {
                return Some(parsed.with_timezone(tz).date_naive());
            }
        }

        self.start_time_utc
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|start| start.with_timezone(tz).date_naive())
    }

    /// Scheduled start. A bare `gameDate` counts as midnight in `tz`.
    pub fn start<Tz: TimeZone>(&self, tz: &Tz) -> Option<DateTime<Utc>> {
        if let Some(start) = self
            .start_time_utc
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        {
            return Some(start.with_timezone(&Utc));
        }

        let date = self.game_date.as_deref()?;
        if let Some(day) = parse_ymd(date) {
            let midnight = day.and_hms_opt(0, 0, 0)?;
            return tz
                .from_local_datetime(&midnight)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc));
        }

        DateTime::parse_from_rfc3339(date)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

fn parse_ymd(s: &str) -> Option<NaiveDate> {
    let bytes = s.as_bytes();
    if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
        return None;
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

/// Games listed in a schedule document. Entries that do not look like a game
/// are skipped.
pub fn games(schedule: &Value) -> Vec<Game> {
    schedule
        .get("games")
        .and_then(Value::as_array)
        .map(|games| {
            games
                .iter()
                .filter_map(|g| serde_json::from_value(g.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}

/// Picks the game a tracker should show right now.
///
/// In order: a live game; a game today that has started or finished; the next
/// scheduled game if its start is within `lookahead` either side of now; the
/// most recent finished game.
pub fn select_game<Tz: TimeZone>(
    games: &[Game],
    now: &DateTime<Tz>,
    lookahead: TimeDelta,
) -> Option<i64> {
    if let Some(live) = games.iter().find(|g| g.is_live()) {
        return Some(live.id);
    }

    let tz = now.timezone();
    let today = now.date_naive();
    let now = now.with_timezone(&Utc);

    if let Some(todays) = games.iter().find(|g| {
        g.day(&tz) == Some(today) && g.has_state(&["LIVE", "CRIT", "OFF", "FINAL"])
    }) {
        return Some(todays.id);
    }

    if let Some((next, start)) = earliest_upcoming(games, &tz, &["FUT"]) {
        let until = start - now;
        if until <= lookahead && until >= -lookahead {
            return Some(next.id);
        }
    }

    games
        .iter()
        .filter(|g| g.game_state == "OFF")
        .filter_map(|g| g.start(&tz).map(|start| (g, start)))
        .filter(|(_, start)| *start < now)
        .max_by_key(|(_, start)| *start)
        .map(|(g, _)| g.id)
}

/// Whether the next scheduled game starts within `lookahead` from now.
pub fn is_pregame<Tz: TimeZone>(games: &[Game], now: &DateTime<Tz>, lookahead: TimeDelta) -> bool {
    let tz = now.timezone();
    let now = now.with_timezone(&Utc);

    earliest_upcoming(games, &tz, &["FUT", "PRE"])
        .map(|(_, start)| {
            let until = start - now;
            until >= TimeDelta::zero() && until <= lookahead
        })
        .unwrap_or(false)
}

fn earliest_upcoming<'a, Tz: TimeZone>(
    games: &'a [Game],
    tz: &Tz,
    states: &[&str],
) -> Option<(&'a Game, DateTime<Utc>)> {
    games
        .iter()
        .filter(|g| g.has_state(states))
        .filter_map(|g| g.start(tz).map(|start| (g, start)))
        .min_by_key(|(_, start)| *start)
}
