use duty_roster::config::ServerConfig;
use duty_roster::server;
use log::error;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = server::run_server(&config).await {
        error!("Server stopped: {e}");
        std::process::exit(1);
    }
}
