use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use tokio::sync::OwnedMutexGuard;

use crate::app::{
    server::{
        errors::ApiError,
        game::GameVariant,
        models::{Player, PlayerView},
        session::{Departure, Session},
    },
    types::RoomsConfig,
    utils,
};

/// A session behind its own lock, the single serialization point of a room
pub type SharedSession = Arc<tokio::sync::Mutex<Session>>;

type CodeGenerator = Box<dyn Fn() -> String + Send + Sync>;

/// The player list of a room right after a membership change
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoomSnapshot {
    pub room_code: String,
    pub variant: GameVariant,
    pub players: Vec<PlayerView>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LeaveOutcome {
    pub departure: Departure,
    pub players: Vec<PlayerView>,
    pub room_closed: bool,
}

/// Maps room codes to live sessions
///
/// The map lock is only ever held for plain map operations and never across an
/// await, rooms are locked individually so they run independently.
pub struct SessionRegistry {
    rooms: Mutex<HashMap<String, SharedSession>>,
    generate_code: CodeGenerator,
    max_code_attempts: u32,
}

impl SessionRegistry {
    pub fn new(config: &RoomsConfig) -> Self {
        let code_length = config.code_length;
        Self::with_code_generator(
            move || utils::generate_room_code(code_length),
            config.max_code_attempts,
        )
    }

    pub fn with_code_generator<F>(generate_code: F, max_code_attempts: u32) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        Self {
            rooms: Mutex::new(HashMap::new()),
            generate_code: Box::new(generate_code),
            max_code_attempts,
        }
    }

    fn rooms(&self) -> MutexGuard<'_, HashMap<String, SharedSession>> {
        self.rooms.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Open a new room with the creator seated as host
    pub fn create_room(
        &self,
        creator_id: &str,
        name: String,
        variant: GameVariant,
    ) -> Result<RoomSnapshot, ApiError> {
        let mut rooms = self.rooms();

        for _ in 0..self.max_code_attempts {
            let room_code = (self.generate_code)();
            if rooms.contains_key(&room_code) {
                tracing::debug!(%room_code, "room code already taken, retrying");
                continue;
            }

            let creator = Player::new(creator_id.to_string(), name);
            let session = Session::new(room_code.clone(), creator, variant);
            let players = session.players_view();
            rooms.insert(
                room_code.clone(),
                Arc::new(tokio::sync::Mutex::new(session)),
            );

            tracing::info!(
                %room_code,
                %variant,
                creator_id,
                open_rooms = rooms.len(),
                "room created"
            );
            return Ok(RoomSnapshot {
                room_code,
                variant,
                players,
            });
        }

        Err(ApiError::CollisionExhausted {
            attempts: self.max_code_attempts,
        })
    }

    pub fn lookup(&self, room_code: &str) -> Option<SharedSession> {
        self.rooms().get(room_code).cloned()
    }

    /// Lock the session of `room_code`, waiting for any handler already in it
    pub async fn session(&self, room_code: &str) -> Result<OwnedMutexGuard<Session>, ApiError> {
        let not_found = || ApiError::RoomNotFound {
            room_code: room_code.to_string(),
        };

        let session = self.lookup(room_code).ok_or_else(not_found)?;
        let guard = session.lock_owned().await;

        // The last player may have left while we were waiting for the lock
        if guard.is_empty() {
            return Err(not_found());
        }
        Ok(guard)
    }

    pub async fn join_room(
        &self,
        room_code: &str,
        joiner_id: &str,
        name: String,
    ) -> Result<RoomSnapshot, ApiError> {
        let mut session = self.session(room_code).await?;
        session.add_player(Player::new(joiner_id.to_string(), name))?;

        tracing::info!(room_code, joiner_id, "player joined room");
        Ok(RoomSnapshot {
            room_code: room_code.to_string(),
            variant: session.variant(),
            players: session.players_view(),
        })
    }

    /// Remove a player, tearing the room down once nobody is left
    pub async fn leave(&self, room_code: &str, player_id: &str) -> Result<LeaveOutcome, ApiError> {
        let mut session = self.session(room_code).await?;
        let departure = session.remove_player(player_id)?;
        let room_closed = session.is_empty();

        if room_closed {
            self.rooms().remove(room_code);
            tracing::info!(room_code, open_rooms = self.room_count(), "room closed");
        } else if let Some(new_host) = &departure.new_host {
            tracing::info!(room_code, %new_host, "host reassigned");
        }

        Ok(LeaveOutcome {
            departure,
            players: session.players_view(),
            room_closed,
        })
    }

    pub fn room_count(&self) -> usize {
        self.rooms().len()
    }
}
