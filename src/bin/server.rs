use clap::Parser;

use parlor::app::{server, types, utils};

#[derive(Parser, Debug)]
#[command(about = "Two player Ludo and Chess room host")]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long, default_value = "config/server.toml")]
    config: String,
}

#[tokio::main]
pub async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    server::init_tracing();

    let config = utils::read_config::<types::ServerConfig>(&args.config, Some("PARLOR_SERVER"))?;
    let tcp_listener = server::bind(&config).await?;

    server::start_server(config, tcp_listener).await?;
    Ok(())
}
