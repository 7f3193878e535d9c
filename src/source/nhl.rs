//! Snapshot source for NHL team trackers.
//!
//! A topic key is a team abbreviation (`TOR`, `MTL`, ...). Each fetch pulls the
//! club schedule, picks the game worth showing, and merges schedule, game,
//! league and standings documents into one snapshot. Only the schedule is
//! required; any other document that fails to load is recorded as `null`.

use async_trait::async_trait;
use chrono::{Local, TimeDelta, Utc};
use reqwest::header::CONTENT_TYPE;
use serde_json::{Map, Value, json};
use tracing::{debug, info, warn};

use crate::broker::topic::TopicKey;
use crate::config::SourceSettings;
use crate::source::schedule;
use crate::source::{Phase, Snapshot, SnapshotSource};
use crate::utils::error::SourceError;

pub struct NhlSource {
    client: reqwest::Client,
    base_url: String,
    lookahead: TimeDelta,
}

impl NhlSource {
    pub fn new(settings: &SourceSettings) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout())
            .user_agent(settings.user_agent.as_str())
            .build()?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            lookahead: TimeDelta::from_std(settings.lookahead()).unwrap_or(TimeDelta::MAX),
        })
    }

    async fn get_json(&self, endpoint: &str) -> Result<Value, SourceError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        let resp = self.client.get(&url).send().await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            });
        }

        let is_json = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("application/json"));
        if !is_json {
            return Err(SourceError::NotJson {
                endpoint: endpoint.to_string(),
            });
        }

        Ok(resp.json::<Value>().await?)
    }

    async fn optional(&self, endpoint: &str) -> Option<Value> {
        match self.get_json(endpoint).await {
            Ok(doc) => Some(doc),
            Err(e) => {
                debug!(endpoint, error = %e, "optional document unavailable");
                None
            }
        }
    }

    /// Game story, enriched from the gamecenter endpoints. Falls back to a
    /// document built from boxscore and landing when the story is missing.
    async fn fetch_game(&self, game_id: i64) -> Option<Value> {
        let boxscore_path = format!("v1/gamecenter/{game_id}/boxscore");
        let landing_path = format!("v1/gamecenter/{game_id}/landing");

        let mut game = match self.optional(&format!("v1/wsc/game-story/{game_id}")).await {
            Some(mut story) => {
                let has_players = story
                    .pointer("/players/skaters")
                    .and_then(Value::as_array)
                    .is_some_and(|skaters| !skaters.is_empty());

                if !has_players {
                    if let Some(boxscore) = self.optional(&boxscore_path).await {
                        fill_from_boxscore(&mut story, &boxscore);
                    }
                }
                Some(story)
            }
            None => {
                let boxscore = self.optional(&boxscore_path).await;
                let landing = self.optional(&landing_path).await;
                boxscore.map(|b| game_from_boxscore(game_id, &b, landing.as_ref()))
            }
        };

        if let Some(game) = game.as_mut() {
            if let Some(landing) = self.optional(&landing_path).await {
                apply_landing(game, &landing);
            }
            if let Some(pbp) = self
                .optional(&format!("v1/gamecenter/{game_id}/play-by-play"))
                .await
            {
                insert(game, "playByPlay", pbp);
            }
        }

        game
    }
}

#[async_trait]
impl SnapshotSource for NhlSource {
    async fn fetch_snapshot(
        &self,
        topic: &TopicKey,
        aux_id: Option<&str>,
    ) -> Result<Snapshot, SourceError> {
        let team = topic.as_str();
        debug!(topic = team, "fetching game data");

        let schedule_data = self
            .get_json(&format!("v1/club-schedule-season/{team}/now"))
            .await?;
        let games = schedule::games(&schedule_data);

        let now = Local::now();
        let game_id = schedule::select_game(&games, &now, self.lookahead);
        let is_pregame = schedule::is_pregame(&games, &now, self.lookahead);

        let (scores, standings) = tokio::join!(
            self.optional("v1/score/now"),
            self.optional("v1/standings/now"),
        );

        let mut parts = Parts {
            schedule: schedule_data,
            scores,
            standings,
            is_pregame,
            ..Parts::default()
        };

        if let Some(game_id) = game_id {
            debug!(topic = team, game_id, "fetching selected game");
            parts.game = self.fetch_game(game_id).await;
            parts.right_rail = self
                .optional(&format!("v1/gamecenter/{game_id}/right-rail"))
                .await;
            parts.content = self
                .optional(&format!("v1/gamecenter/{game_id}/content"))
                .await;
        } else if games.is_empty() {
            warn!(topic = team, "schedule lists no games");
        }

        let snapshot = assemble(team, aux_id, parts);
        info!(
            topic = team,
            game_state = snapshot["gameState"].as_str().unwrap_or("NONE"),
            "game data fetch complete"
        );
        Ok(snapshot)
    }

    fn classify(&self, snapshot: &Snapshot) -> Phase {
        classify_snapshot(snapshot)
    }
}

/// Documents gathered during one fetch, before merging.
#[derive(Debug, Default)]
pub(crate) struct Parts {
    pub schedule: Value,
    pub scores: Option<Value>,
    pub game: Option<Value>,
    pub right_rail: Option<Value>,
    pub content: Option<Value>,
    pub standings: Option<Value>,
    pub is_pregame: bool,
}

pub(crate) fn assemble(team: &str, aux_id: Option<&str>, parts: Parts) -> Value {
    let game_state = parts.game.as_ref().and_then(|g| {
        g.get("gameState")
            .or_else(|| g.pointer("/game/gameState"))
            .and_then(Value::as_str)
            .map(str::to_string)
    });

    json!({
        "team": team,
        "teamId": aux_id,
        "timestamp": Utc::now().timestamp_millis(),
        "scheduleData": parts.schedule,
        "nhlGamesToday": parts.scores,
        "gameData": parts.game,
        "rightRailData": parts.right_rail,
        "contentData": parts.content,
        "standingsData": parts.standings,
        "gameState": game_state,
        "isPreGame": parts.is_pregame,
    })
}

pub fn classify_snapshot(snapshot: &Value) -> Phase {
    let live = snapshot
        .get("gameState")
        .and_then(Value::as_str)
        .is_some_and(|state| matches!(state, "LIVE" | "CRIT"));

    if live {
        Phase::Live
    } else if snapshot.get("isPreGame").and_then(Value::as_bool) == Some(true) {
        Phase::Imminent
    } else {
        Phase::Idle
    }
}

fn insert(doc: &mut Value, key: &str, value: Value) {
    if let Some(obj) = doc.as_object_mut() {
        obj.insert(key.to_string(), value);
    }
}

fn with_empty_stats(team: &Value) -> Value {
    let mut team = team.clone();
    insert(&mut team, "stats", Value::Object(Map::new()));
    team
}

fn boxscore_teams(boxscore: &Value) -> Option<Value> {
    let home = boxscore.get("homeTeam")?;
    let away = boxscore.get("awayTeam")?;
    Some(json!({
        "home": with_empty_stats(home),
        "away": with_empty_stats(away),
    }))
}

fn fill_from_boxscore(story: &mut Value, boxscore: &Value) {
    if let Some(stats) = boxscore.get("playerByGameStats") {
        insert(story, "playerByGameStats", stats.clone());
    }
    if story.get("teams").is_none() {
        if let Some(teams) = boxscore_teams(boxscore) {
            insert(story, "teams", teams);
        }
    }
}

pub(crate) fn game_from_boxscore(game_id: i64, boxscore: &Value, landing: Option<&Value>) -> Value {
    let game_state = landing
        .and_then(|l| l.get("gameState"))
        .or_else(|| boxscore.get("gameState"))
        .cloned()
        .unwrap_or(Value::Null);

    json!({
        "game": { "gameId": game_id, "gameState": game_state },
        "teams": boxscore_teams(boxscore),
        "playerByGameStats": boxscore.get("playerByGameStats"),
    })
}

pub(crate) fn apply_landing(game: &mut Value, landing: &Value) {
    insert(
        game,
        "landingSummary",
        landing.get("summary").cloned().unwrap_or(Value::Null),
    );
    insert(
        game,
        "situation",
        landing.get("situation").cloned().unwrap_or(Value::Null),
    );
    if let Some(clock) = landing.get("clock") {
        insert(game, "clock", clock.clone());
    }
}

