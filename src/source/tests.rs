use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use super::nhl::{self, NhlSource, Parts};
use super::schedule::{self, Game};
use super::{Phase, SnapshotSource};
use crate::broker::topic::TopicKey;
use crate::config::Settings;
use crate::utils::error::SourceError;

fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}

fn game(id: i64, state: &str, start: DateTime<Utc>) -> Game {
    Game {
        id,
        game_state: state.to_string(),
        game_date: Some(start.format("%Y-%m-%d").to_string()),
        start_time_utc: Some(start.to_rfc3339()),
    }
}

fn six_hours() -> TimeDelta {
    TimeDelta::hours(6)
}

#[test]
fn test_live_game_wins() {
    let now = at(2025, 1, 10, 20, 0);
    let games = vec![
        game(1, "OFF", at(2025, 1, 10, 0, 0)),
        game(2, "CRIT", at(2025, 1, 9, 23, 0)),
        game(3, "FUT", at(2025, 1, 10, 22, 0)),
    ];
    assert_eq!(schedule::select_game(&games, &now, six_hours()), Some(2));
}

#[test]
fn test_todays_finished_game_beats_upcoming() {
    let now = at(2025, 1, 10, 20, 0);
    let games = vec![
        game(1, "FUT", at(2025, 1, 10, 23, 0)),
        game(2, "FINAL", at(2025, 1, 10, 1, 0)),
    ];
    assert_eq!(schedule::select_game(&games, &now, six_hours()), Some(2));
}

#[test]
fn test_upcoming_game_inside_lookahead() {
    let now = at(2025, 1, 10, 12, 0);
    let games = vec![
        game(1, "OFF", at(2025, 1, 8, 0, 0)),
        game(2, "FUT", at(2025, 1, 11, 2, 0)),
        game(3, "FUT", at(2025, 1, 10, 17, 0)),
    ];
    assert_eq!(schedule::select_game(&games, &now, six_hours()), Some(3));
}

#[test]
fn test_scheduled_game_past_its_start_is_still_selected() {
    // puck has dropped but the schedule has not flipped to LIVE yet
    let now = at(2025, 1, 11, 1, 0);
    let games = vec![
        game(1, "OFF", at(2025, 1, 8, 0, 0)),
        game(2, "FUT", at(2025, 1, 11, 0, 30)),
    ];
    assert_eq!(schedule::select_game(&games, &now, six_hours()), Some(2));
}

#[test]
fn test_falls_back_to_most_recent_finished_game() {
    let now = at(2025, 1, 10, 8, 0);
    let games = vec![
        game(1, "OFF", at(2025, 1, 4, 0, 0)),
        game(2, "OFF", at(2025, 1, 8, 0, 0)),
        game(3, "FUT", at(2025, 1, 12, 0, 0)),
    ];
    assert_eq!(schedule::select_game(&games, &now, six_hours()), Some(2));
}

#[test]
fn test_no_candidate_yields_none() {
    let now = at(2025, 1, 10, 8, 0);
    let games = vec![game(3, "FUT", at(2025, 2, 12, 0, 0))];
    assert_eq!(schedule::select_game(&games, &now, six_hours()), None);
    assert_eq!(schedule::select_game(&[], &now, six_hours()), None);
}

#[test]
fn test_pregame_window() {
    let now = at(2025, 1, 10, 12, 0);

    let soon = vec![game(1, "FUT", at(2025, 1, 10, 15, 0))];
    assert!(schedule::is_pregame(&soon, &now, six_hours()));

    let pre = vec![game(1, "PRE", at(2025, 1, 10, 12, 30))];
    assert!(schedule::is_pregame(&pre, &now, six_hours()));

    let later = vec![game(1, "FUT", at(2025, 1, 10, 19, 0))];
    assert!(!schedule::is_pregame(&later, &now, six_hours()));

    let started = vec![game(1, "FUT", at(2025, 1, 10, 11, 0))];
    assert!(!schedule::is_pregame(&started, &now, six_hours()));
}

#[test]
fn test_bare_game_date_is_local_midnight() {
    let game = Game {
        id: 7,
        game_state: "FUT".to_string(),
        game_date: Some("2025-03-01".to_string()),
        start_time_utc: None,
    };
    assert_eq!(game.start(&Utc), Some(at(2025, 3, 1, 0, 0)));
    assert_eq!(
        game.day(&Utc),
        Some(chrono::NaiveDate::from_ymd_opt(2025, 3, 1).unwrap())
    );
}

#[test]
fn test_games_skips_malformed_entries() {
    let doc = json!({
        "games": [
            { "id": 1, "gameState": "OFF", "startTimeUTC": "2025-01-01T00:00:00Z" },
            { "gameState": "FUT" },
            "junk"
        ]
    });
    let games = schedule::games(&doc);
    assert_eq!(games.len(), 1);
    assert_eq!(games[0].id, 1);
    assert!(schedule::games(&json!({})).is_empty());
}

#[test]
fn test_classify_snapshot() {
    assert_eq!(
        nhl::classify_snapshot(&json!({ "gameState": "LIVE", "isPreGame": true })),
        Phase::Live
    );
    assert_eq!(
        nhl::classify_snapshot(&json!({ "gameState": "CRIT" })),
        Phase::Live
    );
    assert_eq!(
        nhl::classify_snapshot(&json!({ "gameState": "FUT", "isPreGame": true })),
        Phase::Imminent
    );
    assert_eq!(
        nhl::classify_snapshot(&json!({ "gameState": null, "isPreGame": false })),
        Phase::Idle
    );
}

#[test]
fn test_assemble_reads_nested_game_state() {
    let parts = Parts {
        schedule: json!({ "games": [] }),
        game: Some(json!({ "game": { "gameId": 5, "gameState": "OFF" } })),
        ..Parts::default()
    };
    let doc = nhl::assemble("TOR", Some("10"), parts);
    assert_eq!(doc["team"], "TOR");
    assert_eq!(doc["teamId"], "10");
    assert_eq!(doc["gameState"], "OFF");
    assert_eq!(doc["isPreGame"], false);
    assert!(doc["standingsData"].is_null());
}

#[test]
fn test_game_from_boxscore_prefers_landing_state() {
    let boxscore = json!({
        "gameState": "FUT",
        "homeTeam": { "abbrev": "TOR" },
        "awayTeam": { "abbrev": "MTL" },
        "playerByGameStats": { "home": [] }
    });
    let landing = json!({ "gameState": "LIVE" });
    let mut game = nhl::game_from_boxscore(42, &boxscore, Some(&landing));

    assert_eq!(game["game"]["gameId"], 42);
    assert_eq!(game["game"]["gameState"], "LIVE");
    assert_eq!(game["teams"]["home"]["abbrev"], "TOR");
    assert_eq!(game["teams"]["away"]["stats"], json!({}));

    nhl::apply_landing(&mut game, &json!({ "summary": { "scoring": [] } }));
    assert_eq!(game["landingSummary"], json!({ "scoring": [] }));
    assert!(game["situation"].is_null());
}

type Routes = HashMap<String, (u16, &'static str, String)>;

/// Minimal HTTP/1.1 responder: one response per connection, looked up by path.
async fn serve_routes(routes: Routes) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let routes = Arc::new(routes);

    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            let routes = routes.clone();
            tokio::spawn(async move {
                let mut buf = vec![0u8; 16 * 1024];
                let mut read = 0;
                loop {
                    let n = stream.read(&mut buf[read..]).await.unwrap_or(0);
                    if n == 0 {
                        break;
                    }
                    read += n;
                    if buf[..read].windows(4).any(|w| w == b"\r\n\r\n") || read == buf.len() {
                        break;
                    }
                }

                let request = String::from_utf8_lossy(&buf[..read]);
                let path = request.split_whitespace().nth(1).unwrap_or("/").to_string();
                let (status, content_type, body) = routes
                    .get(&path)
                    .cloned()
                    .unwrap_or((404, "text/plain", "not found".to_string()));

                let response = format!(
                    "HTTP/1.1 {status} X\r\ncontent-type: {content_type}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            });
        }
    });

    format!("http://{addr}")
}

fn json_route(routes: &mut Routes, path: &str, body: Value) {
    routes.insert(path.to_string(), (200, "application/json", body.to_string()));
}

fn source_for(base_url: String) -> NhlSource {
    let mut settings = Settings::default().source;
    settings.base_url = base_url;
    settings.timeout_secs = 5;
    NhlSource::new(&settings).unwrap()
}

#[tokio::test]
async fn test_fetch_merges_fallback_game_documents() {
    let mut routes = Routes::new();
    json_route(
        &mut routes,
        "/v1/club-schedule-season/TOR/now",
        json!({ "games": [
            { "id": 2020020001, "gameState": "OFF", "startTimeUTC": "2020-01-05T00:00:00Z" }
        ]}),
    );
    json_route(&mut routes, "/v1/score/now", json!({ "games": [] }));
    json_route(
        &mut routes,
        "/v1/gamecenter/2020020001/boxscore",
        json!({
            "gameState": "OFF",
            "homeTeam": { "abbrev": "TOR", "score": 3 },
            "awayTeam": { "abbrev": "BOS", "score": 2 }
        }),
    );
    json_route(
        &mut routes,
        "/v1/gamecenter/2020020001/landing",
        json!({ "summary": { "scoring": [] }, "clock": { "timeRemaining": "00:00" } }),
    );
    let source = source_for(serve_routes(routes).await);

    let topic = TopicKey::parse("tor").unwrap();
    let snapshot = source.fetch_snapshot(&topic, Some("10")).await.unwrap();

    assert_eq!(snapshot["team"], "TOR");
    assert_eq!(snapshot["teamId"], "10");
    assert_eq!(snapshot["gameState"], "OFF");
    assert_eq!(snapshot["gameData"]["game"]["gameId"], 2020020001);
    assert_eq!(snapshot["gameData"]["game"]["gameState"], "OFF");
    assert_eq!(snapshot["gameData"]["teams"]["home"]["score"], 3);
    assert_eq!(snapshot["gameData"]["clock"]["timeRemaining"], "00:00");
    assert_eq!(snapshot["nhlGamesToday"], json!({ "games": [] }));
    assert!(snapshot["standingsData"].is_null());
    assert!(snapshot["rightRailData"].is_null());
    assert_eq!(source.classify(&snapshot), Phase::Idle);
}

#[tokio::test]
async fn test_fetch_live_game_story() {
    let mut routes = Routes::new();
    json_route(
        &mut routes,
        "/v1/club-schedule-season/MTL/now",
        json!({ "games": [
            { "id": 99, "gameState": "LIVE", "startTimeUTC": "2020-01-05T00:00:00Z" }
        ]}),
    );
    json_route(
        &mut routes,
        "/v1/wsc/game-story/99",
        json!({ "gameState": "LIVE", "players": { "skaters": [ { "id": 1 } ] } }),
    );
    json_route(
        &mut routes,
        "/v1/gamecenter/99/play-by-play",
        json!({ "plays": [ { "typeDescKey": "goal" } ] }),
    );
    let source = source_for(serve_routes(routes).await);

    let topic = TopicKey::parse("mtl").unwrap();
    let snapshot = source.fetch_snapshot(&topic, None).await.unwrap();

    assert_eq!(snapshot["gameState"], "LIVE");
    assert_eq!(snapshot["gameData"]["playByPlay"]["plays"][0]["typeDescKey"], "goal");
    assert!(snapshot["gameData"].get("playerByGameStats").is_none());
    assert_eq!(source.classify(&snapshot), Phase::Live);
}

#[tokio::test]
async fn test_schedule_failure_is_a_fetch_failure() {
    let mut routes = Routes::new();
    routes.insert(
        "/v1/club-schedule-season/EDM/now".to_string(),
        (503, "application/json", "{}".to_string()),
    );
    let source = source_for(serve_routes(routes).await);

    let topic = TopicKey::parse("EDM").unwrap();
    let err = source.fetch_snapshot(&topic, None).await.unwrap_err();
    assert!(matches!(err, SourceError::Status { status: 503, .. }));
}

#[tokio::test]
async fn test_non_json_schedule_is_rejected() {
    let mut routes = Routes::new();
    routes.insert(
        "/v1/club-schedule-season/VAN/now".to_string(),
        (200, "text/html", "<html></html>".to_string()),
    );
    let source = source_for(serve_routes(routes).await);

    let topic = TopicKey::parse("VAN").unwrap();
    let err = source.fetch_snapshot(&topic, None).await.unwrap_err();
    assert!(matches!(err, SourceError::NotJson { .. }));
}
