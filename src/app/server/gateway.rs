use std::sync::Arc;

use tokio::sync::{mpsc, Notify};

pub mod connections;
pub mod functions;
pub mod protocol;

use crate::app::{
    server::{errors::ApiError, game::Dice, registry::SessionRegistry},
    utils,
};

use connections::Connections;
use protocol::{ClientEvent, ServerEvent};

/// A freshly registered connection
pub struct Connected {
    pub connection_id: String,
    /// Events to write to the client, in order
    pub events: mpsc::Receiver<ServerEvent>,
    /// Fires when the client stopped reading and was cut off
    pub evicted: Arc<Notify>,
}

/// Routes player actions into sessions and session changes back out to players
pub struct Gateway {
    pub registry: SessionRegistry,
    pub connections: Connections,
    pub dice: Arc<dyn Dice>,
    channel_capacity: usize,
}

impl Gateway {
    pub fn new(registry: SessionRegistry, dice: Arc<dyn Dice>, channel_capacity: usize) -> Self {
        Self {
            registry,
            connections: Connections::default(),
            dice,
            channel_capacity: channel_capacity.max(1),
        }
    }

    /// Register a new connection, returning its identity and the events meant for it
    pub fn connect(&self) -> Connected {
        let connection_id = utils::generate_time_ordered_id("conn");
        let (sender, events) = mpsc::channel(self.channel_capacity);
        let evicted = self.connections.insert_channel(&connection_id, sender);

        tracing::info!(
            %connection_id,
            open_connections = self.connections.connection_count(),
            "connection opened"
        );
        self.connections.send_to(
            &connection_id,
            ServerEvent::Welcome {
                player_id: connection_id.clone(),
            },
        );

        Connected {
            connection_id,
            events,
            evicted,
        }
    }

    /// Run one inbound action, reporting any failure to the sender alone
    pub async fn handle(&self, connection_id: &str, event: ClientEvent) {
        let event_name = event.name();
        tracing::info!(
            connection_id,
            event = event_name,
            room_code = event.room_code().unwrap_or_default(),
            "inbound event"
        );

        let result = match event {
            ClientEvent::CreateRoom { name, game } => {
                functions::room::create_room(self, connection_id, name, game).await
            }
            ClientEvent::JoinRoom { code, name } => {
                functions::room::join_room(self, connection_id, &code, name).await
            }
            ClientEvent::SetSecret { room, secret } => {
                functions::room::set_secret(self, connection_id, &room, secret).await
            }
            ClientEvent::LeaveRoom { room } => {
                functions::room::leave_room(self, connection_id, &room).await
            }
            ClientEvent::StartGame { room } => {
                functions::game::start_game(self, connection_id, &room).await
            }
            ClientEvent::RollDice { room } => {
                functions::game::roll_dice(self, connection_id, &room).await
            }
            ClientEvent::MoveToken { room, token_index } => {
                functions::game::move_token(self, connection_id, &room, token_index).await
            }
            ClientEvent::ChessMove { room, from, to } => {
                functions::game::chess_move(self, connection_id, &room, from, to).await
            }
            ClientEvent::Resign { room } => {
                functions::game::resign(self, connection_id, &room).await
            }
        };

        if let Err(error) = result {
            tracing::warn!(connection_id, event = event_name, %error, "action rejected");
            self.reject(connection_id, error);
        }
    }

    pub fn reject(&self, connection_id: &str, error: ApiError) {
        self.connections.send_to(connection_id, ServerEvent::from(error));
    }

    /// An abrupt disconnect counts as leaving every room the connection was in
    pub async fn disconnect(&self, connection_id: &str) {
        for room_code in self.connections.groups_of(connection_id) {
            if let Err(error) = functions::room::depart(self, connection_id, &room_code).await {
                tracing::debug!(connection_id, %room_code, %error, "nothing to leave");
            }
        }

        self.connections.remove_channel(connection_id);
        tracing::info!(
            connection_id,
            open_connections = self.connections.connection_count(),
            "connection closed"
        );
    }
}
