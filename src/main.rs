use std::fs::File;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;

use clap::Parser;
use ratatui::DefaultTerminal;
use tracing::info;
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use tq::controller::Controller;
use tq::domain::{DEFAULT_PAGE_SIZE, TVError, TableConfig};
use tq::loader::load_people;
use tq::model::{Model, Status};
use tq::ui::TableUI;

/// Browse a people dataset with search, sorting and paging.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Dataset file (json, csv, parquet or arrow)
    file: String,

    /// Rows per page
    #[arg(short = 'n', long, default_value_t = NonZeroUsize::new(DEFAULT_PAGE_SIZE).unwrap_or(NonZeroUsize::MIN))]
    page_size: NonZeroUsize,

    /// Move back to the last page when a search or sort leaves the current page empty
    #[arg(long)]
    clamp_pages: bool,

    /// Where to write the log
    #[arg(long, default_value = "tq.log")]
    log_file: String,

    /// Event poll time in milliseconds
    #[arg(long, default_value_t = 100)]
    poll_ms: u64,
}

fn main() -> ExitCode {
    match run() {
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

fn run() -> Result<(), TVError> {
    let args = Args::parse();
    let cfg = TableConfig::default()
        .with_page_size(args.page_size.get())
        .with_clamp_pages(args.clamp_pages)
        .with_event_poll_time(args.poll_ms)
        .with_log_file(expand_path(&args.log_file)?);
    init_logging(&cfg.log_file)?;
    info!("Starting tq with {:?}", cfg);

    let people = load_people(&expand_path(&args.file)?)?;
    let mut model = Model::init(&cfg, people)?;
    let mut ui = TableUI::new();
    let controller = Controller::new(&cfg);

    let mut terminal = ratatui::init();
    let result = event_loop(&mut terminal, &mut model, &mut ui, &controller);
    ratatui::restore();
    info!("Exiting tq");
    result
}

fn event_loop(
    terminal: &mut DefaultTerminal,
    model: &mut Model,
    ui: &mut TableUI,
    controller: &Controller,
) -> Result<(), TVError> {
    while model.status != Status::QUITTING {
        // Render the current view
        terminal.draw(|f| ui.draw(model, f))?;

        // Handle events and map to a Message
        let message = controller.handle_event(model)?;
        model.update(message)?;
    }
    Ok(())
}

fn expand_path(path: &str) -> Result<PathBuf, TVError> {
    shellexpand::full(path)
        .map(|p| PathBuf::from(p.into_owned()))
        .map_err(|e| TVError::InvalidConfig(e.to_string()))
}

fn init_logging(path: &Path) -> Result<(), TVError> {
    let file = File::create(path)?;
    let filter = EnvFilter::try_from_env("TQ_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
        .with(ErrorLayer::default())
        .init();
    Ok(())
}
