use std::process;
use std::sync::Arc;

use clap::{CommandFactory, Parser};
use tracing::info;

use weaver::config::{Config, ConfigError};
use weaver::{Dispatcher, Server, ServerConfig, Weaver};

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = Config::parse();

    let path = match config.config.clone() {
        Some(path) if !config.help => path,
        _ => {
            Config::command().print_help()?;
            process::exit(1);
        }
    };

    weaver::logging::init(&config.logging);
    info!("Starting weaver {}...", weaver::VERSION);
    config.log_summary();

    let mut weaver = Weaver::default();
    match weaver.load_file(&path) {
        Ok(_) => {}
        Err(e @ ConfigError::NotFound { .. }) => {
            eprintln!("{}", e);
            process::exit(2);
        }
        Err(e) => return Err(e.into()),
    }

    let dispatcher = Arc::new(weaver.start(config.threads, config.shuffle)?);

    // Dispatch threads do the blocking work; one async thread serves I/O.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async_main(config, dispatcher))
}

async fn async_main(
    config: Config,
    dispatcher: Arc<Dispatcher>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let addr = config.listen_addr()?;
    let server = Server::bind(ServerConfig::from_config(&config, addr), Arc::clone(&dispatcher)).await?;

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                eprintln!("Server error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down...");
        }
    }

    server.trigger_shutdown();
    server.wait_for_drain(server.drain_timeout()).await;
    server.shutdown();

    let stats = dispatcher.stats();
    info!(
        submitted = stats.submitted,
        completed = stats.completed,
        failed = stats.failed,
        "Dispatcher stopped"
    );

    Ok(())
}
