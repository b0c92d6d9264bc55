use config::{Config, ConfigError, Environment, File, FileFormat};
use rand::Rng;
use serde::Deserialize;

const ROOM_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

pub fn read_config<'a, T>(file_name: &str, env_prefix: Option<&str>) -> Result<T, ConfigError>
where
    T: Deserialize<'a>,
{
    let mut config_builder = Config::builder()
        .add_source(File::new(file_name, FileFormat::Toml).required(false));

    if let Some(env_prefix) = env_prefix {
        // PARLOR_SERVER_SERVER__PORT maps onto server.port
        config_builder = config_builder.add_source(
            Environment::with_prefix(env_prefix)
                .prefix_separator("_")
                .separator("__"),
        );
    }

    config_builder.build()?.try_deserialize()
}

/// Generate an id whose lexical order follows creation time
///
/// The prefix makes the ids readable in logs, `conn_0190...`
pub fn generate_time_ordered_id(prefix: &str) -> String {
    let uuid = uuid::Uuid::now_v7().as_simple().to_string();
    format!("{prefix}_{uuid}")
}

/// Generate a human friendly room code of `length` uppercase letters and digits
pub fn generate_room_code(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| {
            let index = rng.gen_range(0..ROOM_CODE_ALPHABET.len());
            char::from(ROOM_CODE_ALPHABET[index])
        })
        .collect()
}
