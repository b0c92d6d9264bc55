pub const DEFAULT_PLAYER_NAME: &str = "Player";

/// A connection seated in a room
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Player {
    pub player_id: String,
    pub name: String,
    pub secret: Option<String>,
}

impl Player {
    pub fn new(player_id: String, name: String) -> Self {
        let name = match name.trim() {
            "" => DEFAULT_PLAYER_NAME.to_string(),
            trimmed => trimmed.to_string(),
        };

        Self {
            player_id,
            name,
            secret: None,
        }
    }

    pub fn secret_set(&self) -> bool {
        self.secret.is_some()
    }

    pub fn assign_secret(&mut self, secret: String) {
        self.secret = Some(secret)
    }
}

/// What other players get to see about a player
///
/// The secret itself is only ever sent to the winner.
#[derive(serde::Deserialize, serde::Serialize, Clone, Debug, PartialEq, Eq)]
pub struct PlayerView {
    pub player_id: String,
    pub name: String,
    pub secret_set: bool,
    pub is_host: bool,
}

impl PlayerView {
    pub fn new(player: &Player, host_id: &str) -> Self {
        Self {
            player_id: player.player_id.clone(),
            name: player.name.clone(),
            secret_set: player.secret_set(),
            is_host: player.player_id == host_id,
        }
    }
}
