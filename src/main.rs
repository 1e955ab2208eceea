mod app;
mod error;
mod logging;

use std::{io::stdout, path::PathBuf};

use app::{Menu, RoundLog, Session};
use clap::Parser;
use ratatui::crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode},
};
use tracing::info;

/// Swipe to the right page before the countdown runs out.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Seed for the target sequence; random when omitted
    #[arg(long)]
    seed: Option<u64>,
    /// Append the log of every finished round to this file, one JSON object per line
    #[arg(long)]
    record: Option<PathBuf>,
    /// Replay every round recorded in this file without opening the game, then exit
    #[arg(long, conflicts_with = "record")]
    replay: Option<PathBuf>,
    /// Where to write the application log
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn main() -> error::Result<()> {
    let args = Args::parse();

    if let Some(path) = args.log_file.clone().or_else(logging::default_log_file) {
        logging::init(&path)?;
    }

    if let Some(path) = args.replay {
        let logs = RoundLog::load_all(&path)?;
        for (i, log) in logs.iter().enumerate() {
            let verdict = app::replay(log)?;
            info!(path = %path.display(), round = i + 1, ?verdict, "replay matched");
            println!(
                "#{} {verdict} (cible: {}, {} swipes)",
                i + 1,
                log.target,
                log.swipes.len()
            );
        }
        return Ok(());
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnableMouseCapture)?;

    let mut terminal = ratatui::init();

    let app_result = Menu::new(Session::new(args.seed, args.record)).run(&mut terminal);

    // Restore terminal settings
    execute!(stdout, DisableMouseCapture)?;
    disable_raw_mode()?;
    ratatui::restore();

    Ok(app_result?)
}
