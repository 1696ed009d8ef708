//! Relay server: a trusting fan-out hub plus a small HTTP API.
//!
//! The relay keeps a last-known snapshot of units and regions so late
//! joiners can catch up, but it does not simulate and it does not
//! validate. Whatever a client reports is recorded and rebroadcast;
//! clients are the authority over their own units.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

use frontline::geometry::WorldMap;
use frontline::ownership::UNCLAIMABLE_REGIONS;
use frontline::protocol::{GameMessage, PlayerRecord, RegionRecord, UnitRecord};

struct PlayerAccount {
    record: PlayerRecord,
    password: String,
}

struct GameState {
    players: Vec<PlayerAccount>,
    units: HashMap<String, UnitRecord>,
    regions: HashMap<String, RegionRecord>,
}

impl GameState {
    fn new() -> GameState {
        GameState {
            players: Vec::new(),
            units: HashMap::new(),
            regions: HashMap::new(),
        }
    }

    fn with_demo_players(mut self) -> GameState {
        let demo = [
            ("Player1", "pass1", "red"),
            ("Player2", "pass2", "blue"),
            ("Player3", "pass3", "green"),
        ];
        for (name, password, color) in demo {
            self.players.push(PlayerAccount {
                record: PlayerRecord {
                    id: name.to_string(),
                    username: name.to_string(),
                    color: color.to_string(),
                    gold: 1000,
                    steel: 500,
                    ammo: 300,
                },
                password: password.to_string(),
            });
        }
        self
    }

    fn seed_regions(&mut self, map: &WorldMap) {
        for id in map.region_ids() {
            let owner = if UNCLAIMABLE_REGIONS.contains(&id) {
                "Unclaimable"
            } else {
                "Unclaimed"
            };
            self.regions.insert(
                id.to_string(),
                RegionRecord {
                    id: id.to_string(),
                    owner: owner.to_string(),
                    has_mine: map.has_mine(id),
                },
            );
        }
    }

    fn login(&self, username: &str, password: &str) -> Option<&PlayerRecord> {
        self.players
            .iter()
            .find(|p| p.record.username == username && p.password == password)
            .map(|p| &p.record)
    }

    /// Records an inbound message and returns what to rebroadcast.
    /// Nothing is validated here: a `moveUnit` for a unit we have
    /// never seen still goes out so the clients that do know it stay
    /// in sync, we just log that our snapshot is behind.
    fn apply(&mut self, message: &GameMessage) -> Option<GameMessage> {
        match message {
            GameMessage::NewUnitCreated {
                server_id,
                position,
                owner,
            } => {
                let id = server_id
                    .clone()
                    .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
                self.units.insert(
                    id.clone(),
                    UnitRecord {
                        id: id.clone(),
                        location: *position,
                        owner: owner.clone(),
                    },
                );
                Some(GameMessage::NewUnitCreated {
                    server_id: Some(id),
                    position: *position,
                    owner: owner.clone(),
                })
            }
            GameMessage::MoveUnit {
                unit_id,
                current_position,
                ..
            } => {
                match self.units.get_mut(unit_id) {
                    Some(record) => record.location = *current_position,
                    None => warn!(unit_id = %unit_id, "moveUnit for a unit not in the snapshot"),
                }
                Some(message.clone())
            }
            GameMessage::RegionCaptured {
                region_id,
                new_owner,
            } => {
                let entry = self
                    .regions
                    .entry(region_id.clone())
                    .or_insert_with(|| RegionRecord {
                        id: region_id.clone(),
                        owner: new_owner.clone(),
                        has_mine: false,
                    });
                entry.owner = new_owner.clone();
                Some(message.clone())
            }
            // Snapshots only flow server to client.
            GameMessage::BulkUnitsData { .. } | GameMessage::BulkRegionsData { .. } => None,
        }
    }

    fn unit_snapshot(&self) -> GameMessage {
        let units = self
            .units
            .values()
            .map(|u| serde_json::to_value(u).unwrap_or(Value::Null))
            .collect();
        GameMessage::BulkUnitsData { units }
    }

    fn region_snapshot(&self) -> GameMessage {
        let regions = self
            .regions
            .values()
            .map(|r| serde_json::to_value(r).unwrap_or(Value::Null))
            .collect();
        GameMessage::BulkRegionsData { regions }
    }
}

type SharedState = Arc<Mutex<GameState>>;

#[derive(Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

async fn login_handler(
    State(state): State<SharedState>,
    Json(req): Json<LoginRequest>,
) -> Json<Value> {
    let state = state.lock().unwrap();
    match state.login(&req.username, &req.password) {
        Some(player) => Json(json!({ "success": true, "player": player })),
        None => Json(json!({ "success": false, "message": "Invalid credentials" })),
    }
}

async fn game_state_handler(State(state): State<SharedState>) -> Json<Value> {
    let state = state.lock().unwrap();
    let players: Vec<&PlayerRecord> = state.players.iter().map(|p| &p.record).collect();
    let units: Vec<&UnitRecord> = state.units.values().collect();
    let regions: Vec<&RegionRecord> = state.regions.values().collect();
    Json(json!({ "players": players, "units": units, "regions": regions }))
}

fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/api/login", post(login_handler))
        .route("/api/game-state", get(game_state_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn handle_connection(stream: TcpStream, tx: broadcast::Sender<String>, state: SharedState) {
    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!("websocket handshake failed: {}", e);
            return;
        }
    };

    let (mut write, mut read) = ws_stream.split();
    let mut rx = tx.subscribe();

    // Catch-up snapshots before any live traffic.
    let (units_msg, regions_msg) = {
        let gs = state.lock().unwrap();
        (gs.unit_snapshot(), gs.region_snapshot())
    };
    for msg in [units_msg, regions_msg] {
        let json = match serde_json::to_string(&msg) {
            Ok(json) => json,
            Err(e) => {
                error!("snapshot serialization failed: {}", e);
                return;
            }
        };
        if write.send(Message::Text(json)).await.is_err() {
            return;
        }
    }
    info!("client connected");

    let mut interval = tokio::time::interval(std::time::Duration::from_secs(10));
    let mut send_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                Ok(msg) = rx.recv() => {
                    if write.send(Message::Text(msg)).await.is_err() {
                        break;
                    }
                }
                _ = interval.tick() => {
                    if write.send(Message::Ping(vec![])).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    let recv_state = state.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = read.next().await {
            if !msg.is_text() {
                continue;
            }
            let text = match msg.to_text() {
                Ok(text) => text,
                Err(_) => continue,
            };
            match serde_json::from_str::<GameMessage>(text) {
                Ok(parsed) => {
                    let outbound = {
                        let mut gs = recv_state.lock().unwrap();
                        gs.apply(&parsed)
                    };
                    if let Some(outbound) = outbound {
                        if let Ok(json) = serde_json::to_string(&outbound) {
                            let _ = tx.send(json);
                        }
                    }
                }
                Err(e) => warn!("unreadable client message: {}", e),
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }
    info!("client disconnected");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let mut state = GameState::new().with_demo_players();
    let map_path = std::env::var("MAP_PATH").unwrap_or_else(|_| "map.json".to_string());
    match std::fs::read_to_string(&map_path) {
        Ok(json) => {
            let map = WorldMap::from_json(&json)?;
            state.seed_regions(&map);
            info!(regions = state.regions.len(), "seeded regions from {}", map_path);
        }
        Err(e) => warn!("no map at {} ({}); starting with no regions", map_path, e),
    }
    let state: SharedState = Arc::new(Mutex::new(state));

    let http_port: u16 = std::env::var("HTTP_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3000);
    let http_addr = SocketAddr::from(([0, 0, 0, 0], http_port));
    let router = build_router(state.clone());
    tokio::spawn(async move {
        match tokio::net::TcpListener::bind(http_addr).await {
            Ok(listener) => {
                info!("http api on {}", http_addr);
                if let Err(e) = axum::serve(listener, router).await {
                    error!("http server failed: {}", e);
                }
            }
            Err(e) => error!("failed to bind {}: {}", http_addr, e),
        }
    });

    let ws_port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(9001);
    let addr = format!("0.0.0.0:{}", ws_port);
    let (tx, _rx) = broadcast::channel(100);

    let listener = TcpListener::bind(&addr).await?;
    info!("relay listening on {}", addr);

    while let Ok((stream, _)) = listener.accept().await {
        let tx = tx.clone();
        let state = state.clone();
        tokio::spawn(handle_connection(stream, tx, state));
    }
    Ok(())
}
