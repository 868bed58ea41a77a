use dotenvy::dotenv;
use env_logger::Env;
use log::{error, info};
use order_server::{cli::handle_command_line_args, config::ServerConfig, server::run_server};

#[actix_web::main]
async fn main() {
    dotenv().ok();
    if handle_command_line_args() {
        return;
    }
    let config = ServerConfig::from_env_or_default();
    // RUST_LOG takes precedence over OMS_LOG_LEVEL
    env_logger::Builder::from_env(Env::default().default_filter_or(config.log_level.as_str())).init();

    info!("🚀️ Starting order management server on {}:{} ({})", config.host, config.port, config.hostname);
    match run_server(config).await {
        Ok(_) => println!("Bye!"),
        Err(e) => {
            error!("🚀️ Server failed: {e}");
            eprintln!("{e}");
            std::process::exit(1);
        },
    }
}
