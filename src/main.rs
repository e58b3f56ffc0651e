//! `mafiasim` — ten-player mafia match simulator

use std::sync::Arc;

use clap::Parser;

use mafiasim::cli::Cli;
use mafiasim::config::load_config;
use mafiasim::error::{MafiasimError, exit_code};
use mafiasim::game::{Game, Outcome};
use mafiasim::observability::{EventEmitter, LogFormat, init_logging};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if !cli.quiet {
        let format = if cli.log_json {
            LogFormat::Json
        } else {
            LogFormat::Human
        };
        init_logging(format, cli.verbose, cli.color);
    }

    // Spawn signal handler for graceful shutdown
    tokio::spawn(async {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to register SIGTERM handler");

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                std::process::exit(i32::from(exit_code::INTERRUPTED));
            }
            _ = sigterm.recv() => {
                std::process::exit(i32::from(exit_code::TERMINATED));
            }
        }
    });

    match run(cli).await {
        Ok(code) => std::process::exit(i32::from(code)),
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(i32::from(e.exit_code()));
        }
    }
}

async fn run(cli: Cli) -> Result<u8, MafiasimError> {
    let mut config = load_config(cli.config.as_deref())?;
    cli.apply_overrides(&mut config);

    let emitter = if cli.no_events {
        EventEmitter::noop()
    } else if let Some(path) = &cli.events_file {
        EventEmitter::from_file(path)?
    } else {
        EventEmitter::stderr()
    };

    let mut game = Game::new(&config, Arc::new(emitter));
    match game.run().await {
        Outcome::Winner { team, reason } => {
            println!(
                "{team} wins ({reason}) on day {} after {} nights [seed {}]",
                game.state().day(),
                game.state().night(),
                game.state().seed()
            );
            Ok(exit_code::SUCCESS)
        }
        Outcome::Failed { error } => {
            eprintln!("game failed: {error}");
            Ok(exit_code::GAME_FAILED)
        }
    }
}
