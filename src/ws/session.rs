//! Per-connection websocket actor.
//!
//! The connection id is the player identity: there is no account layer
//! and no reconnection, so a dropped socket is a departed player.

use std::sync::Arc;
use std::time::{Duration, Instant};

use actix::prelude::*;
use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::protocol::ClientCommand;
use crate::services::GameFlowService;
use crate::ws::hub::{ConnectionHub, Deliver};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(20);
const CLIENT_TIMEOUT: Duration = Duration::from_secs(40);

pub async fn upgrade(
    req: HttpRequest,
    stream: web::Payload,
    service: web::Data<Arc<GameFlowService>>,
    hub: web::Data<Arc<ConnectionHub>>,
) -> Result<HttpResponse, Error> {
    let session = WsSession::new(service.get_ref().clone(), hub.get_ref().clone());
    ws::start(session, &req, stream)
}

pub struct WsSession {
    player_id: String,
    service: Arc<GameFlowService>,
    hub: Arc<ConnectionHub>,
    last_heartbeat: Instant,
}

impl WsSession {
    fn new(service: Arc<GameFlowService>, hub: Arc<ConnectionHub>) -> Self {
        Self {
            player_id: Uuid::new_v4().to_string(),
            service,
            hub,
            last_heartbeat: Instant::now(),
        }
    }

    fn start_heartbeat(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(HEARTBEAT_INTERVAL, |actor, ctx| {
            if Instant::now().duration_since(actor.last_heartbeat) > CLIENT_TIMEOUT {
                warn!(player_id = %actor.player_id, "heartbeat timed out");
                ctx.close(Some(ws::CloseReason::from(ws::CloseCode::Normal)));
                ctx.stop();
                return;
            }
            ctx.ping(b"keepalive");
        });
    }
}

impl Actor for WsSession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        info!(player_id = %self.player_id, "session started");
        self.hub
            .register(&self.player_id, ctx.address().recipient::<Deliver>());
        self.start_heartbeat(ctx);
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        self.hub.unregister(&self.player_id);
        // A dropped connection is treated as having left the room.
        self.service.handle_disconnect(&self.player_id);
        info!(player_id = %self.player_id, "session stopped");
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for WsSession {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(payload)) => {
                self.last_heartbeat = Instant::now();
                ctx.pong(&payload);
            }
            Ok(ws::Message::Pong(_)) => {
                self.last_heartbeat = Instant::now();
            }
            Ok(ws::Message::Text(text)) => {
                self.last_heartbeat = Instant::now();
                match serde_json::from_str::<ClientCommand>(&text) {
                    Ok(command) => self.service.dispatch(&self.player_id, command),
                    // Malformed messages are dropped; the session lives on.
                    Err(err) => {
                        debug!(player_id = %self.player_id, error = %err, "malformed command")
                    }
                }
            }
            Ok(ws::Message::Binary(_)) => {
                self.last_heartbeat = Instant::now();
                debug!(player_id = %self.player_id, "binary frames not supported");
            }
            Ok(ws::Message::Close(reason)) => {
                ctx.close(reason);
                ctx.stop();
            }
            Ok(ws::Message::Continuation(_)) | Ok(ws::Message::Nop) => {
                self.last_heartbeat = Instant::now();
            }
            Err(err) => {
                warn!(player_id = %self.player_id, error = %err, "protocol error");
                ctx.close(Some(ws::CloseReason::from(ws::CloseCode::Error)));
                ctx.stop();
            }
        }
    }
}

impl Handler<Deliver> for WsSession {
    type Result = ();

    fn handle(&mut self, msg: Deliver, ctx: &mut Self::Context) -> Self::Result {
        match serde_json::to_string(&msg.event) {
            Ok(payload) => ctx.text(payload),
            Err(err) => warn!(player_id = %self.player_id, error = %err, "failed to serialize outbound event"),
        }
    }
}
