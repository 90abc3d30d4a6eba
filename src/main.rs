use tracing::info;
use tracing_subscriber::prelude::*;

use campusbot::config::Config;
use campusbot::server;

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "campusbot.json".to_string());
    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    // Setup logging: stdout always, plus a file layer when log_dir is set.
    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        );
    let registry = tracing_subscriber::registry().with(stdout_layer);

    // The appender guard must outlive the server loop.
    let _guard = if let Some(ref log_dir) = config.log_dir {
        std::fs::create_dir_all(log_dir).ok();
        let log_file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_dir.join("campusbot.log"))
            .expect("Failed to open log file");
        let (non_blocking, guard) = tracing_appender::non_blocking(log_file);

        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(non_blocking)
                    .with_ansi(false)
                    .with_filter(
                        tracing_subscriber::EnvFilter::from_default_env()
                            .add_directive(tracing::Level::INFO.into()),
                    ),
            )
            .init();
        Some(guard)
    } else {
        registry.init();
        None
    };

    info!("🚀 Starting campusbot...");
    info!("Loaded config from {config_path}");
    info!("Info store: {}", config.data_path.display());
    if config.gemini_api_key.is_none() {
        info!("No Gemini API key - free-form answers disabled");
    }
    if config.telegram_bot_token.is_none() {
        info!("No Telegram bot token - Telegram replies disabled");
    }

    let state = server::build_state(config);
    if let Err(e) = server::serve(state).await {
        eprintln!("Server error: {e}");
        std::process::exit(1);
    }
}
