#[derive(serde::Deserialize, Debug, Default)]
pub struct ServerConfig {
    pub server: Option<Server>,
    pub rooms: Option<RoomsConfig>,
}

#[derive(serde::Deserialize, Clone, Debug)]
pub struct Server {
    pub host: String,
    pub port: u16,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
        }
    }
}

/// Limits applied to every room hosted by this instance
#[derive(serde::Deserialize, Clone, Debug)]
pub struct RoomsConfig {
    /// Number of characters in a generated room code
    pub code_length: usize,
    /// How many codes are tried before giving up on room creation
    pub max_code_attempts: u32,
    /// Outbound events buffered per connection
    pub channel_capacity: usize,
}

impl Default for RoomsConfig {
    fn default() -> Self {
        Self {
            code_length: 6,
            max_code_attempts: 64,
            channel_capacity: 128,
        }
    }
}
