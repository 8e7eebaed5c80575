use crate::engine::Difficulty;
use crate::game::{Game, Mode};
use futures_util::{Sink, SinkExt, StreamExt};
use log::{error, info};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Deserialize;
use serde_json::{json, Value};
use std::io::{Error, ErrorKind};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::{self, protocol::Message};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Pause before each computer move.
    pub think: Duration,
    /// Seeds every connection's RNG when set; otherwise each connection draws from entropy.
    pub seed: Option<u64>,
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Deserialize)]
struct StartRequest {
    mode: Mode,
    #[serde(default)]
    difficulty: Option<Difficulty>,
}

pub async fn run(config: ServerConfig) -> Result<(), Error> {
    let address = config.address();
    let listener = TcpListener::bind(&address).await?;
    info!("Listening on: {}", address);
    serve(listener, &config).await
}

/// Accepts connections until the listener fails. Each connection gets its own game and RNG.
pub async fn serve(listener: TcpListener, config: &ServerConfig) -> Result<(), Error> {
    let mut connections: u64 = 0;
    while let Ok((stream, _)) = listener.accept().await {
        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed.wrapping_add(connections)),
            None => ChaCha8Rng::from_entropy(),
        };
        connections += 1;
        let think = config.think;
        tokio::spawn(async move {
            if let Err(e) = accept_connection(stream, rng, think).await {
                error!("Connection failed: {:?}", e);
            }
        });
    }

    Ok(())
}

async fn accept_connection(stream: TcpStream, mut rng: ChaCha8Rng, think: Duration) -> Result<(), Error> {
    let addr = stream.peer_addr()?;
    info!("Peer address: {}", addr);

    let ws_stream = tokio_tungstenite::accept_async(stream)
        .await
        .map_err(|e| Error::new(ErrorKind::ConnectionAborted, e))?;
    info!("New WebSocket connection: {}", addr);

    let (mut write, mut read) = ws_stream.split();
    let mut game = Game::new();

    while let Some(raw_message) = read.next().await {
        match raw_message {
            Ok(text_message) => {
                if !text_message.is_text() && !text_message.is_binary() { continue; }
                let response = match serde_json::from_slice::<Value>(&text_message.into_data()) {
                    Ok(data) => {
                        info!("Received: {}", data);
                        respond(handle_message(&mut game, data))
                    },
                    Err(e) => {
                        error!("Error parsing JSON: {:?}", e);
                        json!({"error": format!("Invalid JSON: {}", e)})
                    }
                };
                send(&mut write, response).await?;

                if game.awaiting_engine() {
                    tokio::time::sleep(think).await;
                    let response = respond(make_engine_move(&mut game, &mut rng));
                    send(&mut write, response).await?;
                }
            }
            Err(e) => {
                error!("Error reading websocket message: {:?}", e);
                break;
            }
        }
    }

    info!("Connection closed: {}", addr);
    Ok(())
}

async fn send<S>(write: &mut S, response: Value) -> Result<(), Error>
where
    S: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    let response_str = response.to_string();
    write.send(Message::text(response_str.clone()))
        .await
        .map_err(|e| Error::new(ErrorKind::BrokenPipe, e))?;
    info!("Sent: {}", response_str);
    Ok(())
}

fn respond(result: Result<Value, Error>) -> Value {
    result.unwrap_or_else(|e| {
        error!("Error handling message: {:?}", e);
        json!({"error": e.to_string()})
    })
}

/// Applies one client message to the game and returns the reply.
///
/// Client messages carry exactly one of the keys `start`, `move`, `hint` or `reset`.
/// Computer moves are not played here; see [`make_engine_move`].
pub fn handle_message(game: &mut Game, data: Value) -> Result<Value, Error> {
    let map = data.as_object()
        .ok_or_else(|| Error::new(ErrorKind::InvalidInput, "Expected a dict"))?;

    if let Some(start) = map.get("start") {
        let request: StartRequest = serde_json::from_value(start.clone())?;
        game.start(request.mode, request.difficulty);
        Ok(snapshot(game))
    } else if let Some(cell) = map.get("move") {
        let idx = cell.as_u64().ok_or_else(
            || Error::new(ErrorKind::InvalidInput, "Expected a cell index: move")
        )?;
        game.play(idx as usize)?;
        Ok(snapshot(game))
    } else if map.contains_key("hint") {
        Ok(json!({ "hint": game.hint()? }))
    } else if map.contains_key("reset") {
        game.reset();
        Ok(snapshot(game))
    } else {
        Err(Error::new(ErrorKind::InvalidInput, format!("Invalid message: {}", data)))
    }
}

pub fn make_engine_move<R: Rng + ?Sized>(game: &mut Game, rng: &mut R) -> Result<Value, Error> {
    let selected = game.play_engine(rng)?;
    let mut response = snapshot(game);
    response["move"] = json!(selected);
    Ok(response)
}

pub fn snapshot(game: &Game) -> Value {
    let outcome = game.outcome();
    json!({
        "board": game.board(),
        "status": game.status(),
        "outcome": outcome,
        "next": game.next_mark(),
        "mode": game.mode(),
        "difficulty": game.difficulty(),
        "game_over": outcome.is_over(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start_single(game: &mut Game, difficulty: &str) -> Value {
        handle_message(game, json!({"start": {"mode": "single", "difficulty": difficulty}})).unwrap()
    }

    #[test]
    fn start_reports_fresh_board() {
        let mut game = Game::new();
        let response = start_single(&mut game, "hard");
        assert_eq!(response["mode"], "single");
        assert_eq!(response["difficulty"], "hard");
        assert_eq!(response["status"], "Next player: X");
        assert_eq!(response["outcome"], "in_progress");
        assert_eq!(response["game_over"], false);
        assert_eq!(response["board"], json!([null, null, null, null, null, null, null, null, null]));
    }

    #[test]
    fn multi_start_ignores_difficulty() {
        let mut game = Game::new();
        let response = handle_message(&mut game, json!({"start": {"mode": "multi"}})).unwrap();
        assert_eq!(response["mode"], "multi");
        assert_eq!(response["difficulty"], Value::Null);
    }

    #[test]
    fn move_then_engine_reply() {
        let mut game = Game::new();
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        start_single(&mut game, "hard");
        let response = handle_message(&mut game, json!({"move": 0})).unwrap();
        assert_eq!(response["board"][0], "X");
        assert_eq!(response["next"], "O");
        assert!(game.awaiting_engine());

        let response = make_engine_move(&mut game, &mut rng).unwrap();
        assert_eq!(response["move"], 4);
        assert_eq!(response["board"][4], "O");
        assert_eq!(response["status"], "Next player: X");
    }

    #[test]
    fn hint_suggests_winning_cell() {
        let mut game = Game::new();
        handle_message(&mut game, json!({"start": {"mode": "multi"}})).unwrap();
        for idx in [0, 3, 1, 4] {
            handle_message(&mut game, json!({"move": idx})).unwrap();
        }
        assert_eq!(handle_message(&mut game, json!({"hint": true})).unwrap(), json!({"hint": 2}));
    }

    #[test]
    fn win_is_reported_as_game_over() {
        let mut game = Game::new();
        handle_message(&mut game, json!({"start": {"mode": "multi"}})).unwrap();
        let mut response = Value::Null;
        for idx in [0, 3, 1, 4, 2] {
            response = handle_message(&mut game, json!({"move": idx})).unwrap();
        }
        assert_eq!(response["outcome"], json!({"win": "X"}));
        assert_eq!(response["status"], "Winner: X");
        assert_eq!(response["game_over"], true);
    }

    #[test]
    fn reset_clears_mode() {
        let mut game = Game::new();
        start_single(&mut game, "easy");
        let response = handle_message(&mut game, json!({"reset": true})).unwrap();
        assert_eq!(response["mode"], Value::Null);
        assert!(!game.is_started());
    }

    #[test]
    fn rejects_malformed_messages() {
        let mut game = Game::new();
        assert!(handle_message(&mut game, json!([1, 2])).is_err());
        assert!(handle_message(&mut game, json!({"jump": 1})).is_err());
        assert!(handle_message(&mut game, json!({"move": 0})).is_err());
        assert!(handle_message(&mut game, json!({"start": {"mode": "solo"}})).is_err());
        start_single(&mut game, "medium");
        assert!(handle_message(&mut game, json!({"move": "a1"})).is_err());
        assert!(handle_message(&mut game, json!({"move": 12})).is_err());
    }

    #[test]
    fn engine_move_refused_on_human_turn() {
        let mut game = Game::new();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        start_single(&mut game, "easy");
        let err = make_engine_move(&mut game, &mut rng).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert_eq!(respond(Err(err))["error"], "Not the computer's turn");
    }
}
