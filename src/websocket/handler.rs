use actix::{Actor, ActorContext, AsyncContext, Handler, Running, StreamHandler};
use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use log::{debug, info, warn};
use std::sync::PoisonError;
use uuid::Uuid;

use crate::game::clock::spawn_clock;
use crate::game::session::{lock, CommandOutcome, SharedSession};
use crate::game::ConnectionId;
use crate::models::*;

/// WebSocket handler for one client connected to a chess session
pub struct ChessWebSocket {
    pub id: ConnectionId,
    pub key: String,
    pub session: SharedSession,
    pub app_state: web::Data<AppState>,
}

impl Actor for ChessWebSocket {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        let total_sessions = self.app_state.register(self.id, ctx.address().recipient());
        info!("WebSocket connection started: {} on {}", self.id, self.key);
        info!("Total active connections: {}", total_sessions);

        let drain_interval = self.app_state.config.drain_interval;
        ctx.run_interval(drain_interval, |act, _ctx| act.deliver_outbound());
    }

    fn stopping(&mut self, _: &mut Self::Context) -> Running {
        let total_sessions = self.app_state.deregister(self.id);

        // lookup only: a closing socket must not bring a session into being
        match self.app_state.registry.get(&self.key) {
            Ok(session) => {
                lock(&session).disconnect(self.id);
            }
            Err(e) => warn!("Disconnect for {}: {}", self.id, e),
        }

        info!("WebSocket connection closed: {}", self.id);
        info!("Total active connections: {}", total_sessions);
        Running::Stop
    }
}

impl Handler<ChessWebSocketMessage> for ChessWebSocket {
    type Result = ();

    fn handle(&mut self, msg: ChessWebSocketMessage, ctx: &mut Self::Context) {
        debug!("Forwarding message to client {}: {}", self.id, msg.0);
        ctx.text(msg.0);
    }
}

// WebSocket message handler
impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for ChessWebSocket {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => {
                ctx.pong(&msg);
            }
            Ok(ws::Message::Pong(_)) => {}
            Ok(ws::Message::Text(text)) => {
                info!("Received text message from {}: {}", self.id, text);
                self.handle_text(&text);
            }
            Ok(ws::Message::Binary(_)) => {
                warn!("Binary messages are not supported");
            }
            Ok(ws::Message::Close(reason)) => {
                info!("Connection closed: {:?}", reason);
                ctx.close(reason);
                ctx.stop();
            }
            Ok(ws::Message::Continuation(_)) | Ok(ws::Message::Nop) => {}
            Err(e) => {
                warn!("WebSocket protocol error on {}: {}", self.id, e);
                ctx.stop();
            }
        }
    }
}

/// Connections a queued message goes to: its recipient, or every bound
/// player connection for a broadcast.
pub fn recipients(message: &Outbound, bound: &[ConnectionId]) -> Vec<ConnectionId> {
    match message.recipient {
        Some(connection) => vec![connection],
        None => bound.to_vec(),
    }
}

impl ChessWebSocket {
    fn handle_text(&mut self, text: &str) {
        let command = match ClientCommand::parse(text) {
            Ok(command) => command,
            Err(e) => {
                warn!("Error parsing client message: {}", e);
                return;
            }
        };

        let outcome = lock(&self.session).handle(self.id, command);
        match outcome {
            Ok(CommandOutcome::StartClock) => {
                if spawn_clock(self.session.clone(), self.app_state.config.tick_interval) {
                    info!("Clock started for session {}", self.key);
                }
            }
            Ok(CommandOutcome::Done) => {}
            Err(e) => warn!("Dropping command from {}: {}", self.id, e),
        }
    }

    /// Send everything queued on the session. The queue is swapped out under
    /// the session lock, so each message leaves through exactly one drain.
    pub fn deliver_outbound(&self) {
        let (messages, bound) = {
            let mut session = lock(&self.session);
            (session.drain_outbound(), session.bound_connections())
        };
        if messages.is_empty() {
            return;
        }

        let connections = self
            .app_state
            .connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        for message in &messages {
            for connection in recipients(message, &bound) {
                match connections.get(&connection) {
                    Some(addr) => addr.do_send(ChessWebSocketMessage(message.payload.clone())),
                    None => debug!("Connection {} is gone, dropping message", connection),
                }
            }
        }
    }
}

/// WebSocket connection handler
pub async fn ws_index(
    req: HttpRequest,
    stream: web::Payload,
    path: web::Path<String>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let key = path.into_inner();
    let id = Uuid::new_v4();
    info!("New WebSocket connection {} for session {}", id, key);

    let session = app_state.registry.get_or_create(&key);
    let ws = ChessWebSocket {
        id,
        key,
        session,
        app_state: app_state.clone(),
    };

    ws::start(ws, &req, stream)
}

#[cfg(test)]
mod tests {
    use super::{recipients, ChessWebSocket};
    use crate::config::ServerConfig;
    use crate::game::session::{lock, GameSession, SessionSettings, SharedSession};
    use crate::models::{AppState, ChessWebSocketMessage, Outbound};
    use actix::{Actor, Context, Handler};
    use actix_web::web;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use uuid::Uuid;

    /// Stands in for a client socket and keeps every frame it is sent.
    struct Recorder(Arc<Mutex<Vec<String>>>);

    impl Actor for Recorder {
        type Context = Context<Self>;
    }

    impl Handler<ChessWebSocketMessage> for Recorder {
        type Result = ();

        fn handle(&mut self, msg: ChessWebSocketMessage, _: &mut Self::Context) {
            self.0.lock().unwrap().push(msg.0);
        }
    }

    #[test]
    fn targeted_messages_go_to_one_connection() {
        let target = Uuid::new_v4();
        let bound = vec![Uuid::new_v4(), Uuid::new_v4()];
        let message = Outbound {
            recipient: Some(target),
            payload: "[]".into(),
        };
        assert_eq!(recipients(&message, &bound), vec![target]);
    }

    #[test]
    fn broadcasts_go_to_every_bound_connection() {
        let bound = vec![Uuid::new_v4(), Uuid::new_v4()];
        let message = Outbound {
            recipient: None,
            payload: "[]".into(),
        };
        assert_eq!(recipients(&message, &bound), bound);
        assert!(recipients(&message, &[]).is_empty());
    }

    #[actix_rt::test]
    async fn drain_delivers_each_message_exactly_once() {
        let app_state = web::Data::new(AppState::new(ServerConfig::default()));
        let session: SharedSession = Arc::new(Mutex::new(GameSession::new(SessionSettings::default())));
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let seen_a = Arc::new(Mutex::new(Vec::new()));
        let seen_b = Arc::new(Mutex::new(Vec::new()));
        app_state.register(a, Recorder(seen_a.clone()).start().recipient());
        app_state.register(b, Recorder(seen_b.clone()).start().recipient());

        {
            let mut game = lock(&session);
            game.connect(a, "a");
            game.connect(b, "b");
            game.drain_outbound();
            game.send_state(None);
            game.send_state(Some(a));
        }

        let socket = ChessWebSocket {
            id: a,
            key: "room".to_string(),
            session: session.clone(),
            app_state: app_state.clone(),
        };
        socket.deliver_outbound();
        socket.deliver_outbound();
        actix_rt::time::sleep(Duration::from_millis(50)).await;

        let seen_a = seen_a.lock().unwrap();
        let seen_b = seen_b.lock().unwrap();
        assert_eq!(seen_a.len(), 2);
        assert_eq!(seen_b.len(), 1);
        assert_eq!(seen_a[0], seen_b[0]);
        assert!(seen_b[0].starts_with("[\"GAME_STATE\""));
        assert!(lock(&session).drain_outbound().is_empty());
    }

    #[actix_rt::test]
    async fn messages_for_closed_connections_are_dropped() {
        let app_state = web::Data::new(AppState::new(ServerConfig::default()));
        let session: SharedSession = Arc::new(Mutex::new(GameSession::new(SessionSettings::default())));
        let (a, gone) = (Uuid::new_v4(), Uuid::new_v4());
        let seen_a = Arc::new(Mutex::new(Vec::new()));
        app_state.register(a, Recorder(seen_a.clone()).start().recipient());

        {
            let mut game = lock(&session);
            game.connect(a, "a");
            game.connect(gone, "b");
            game.drain_outbound();
            game.send_state(Some(gone));
        }

        let socket = ChessWebSocket {
            id: a,
            key: "room".to_string(),
            session: session.clone(),
            app_state,
        };
        socket.deliver_outbound();
        actix_rt::time::sleep(Duration::from_millis(50)).await;

        assert!(seen_a.lock().unwrap().is_empty());
        assert!(lock(&session).drain_outbound().is_empty());
    }
}
