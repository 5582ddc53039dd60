use std::fs::File;
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;

use clap::Parser;
use tracing::{debug, error, info};
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use trainview::loader::expand_path;
use trainview::{ColumnRef, ReportConfig, TRError};

mod controller;
mod inputter;
mod message;
mod model;
mod ui;

use controller::Controller;
use model::{Model, Status};

/// Interactive report over an employee training spreadsheet.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Spreadsheet to open (first sheet is used). `-` reads it from stdin.
    file: Option<String>,

    /// Terminal event poll interval in milliseconds
    #[arg(long, default_value_t = 100)]
    poll_ms: u64,

    /// Upper bound for the rendered width of a table column
    #[arg(long, default_value_t = 30)]
    max_column_width: usize,

    /// Header label of the column holding the average score
    #[arg(long, default_value = trainview::domain::DEFAULT_SCORE_COLUMN)]
    score_column: String,

    /// Write logs to this file (filter with RUST_LOG)
    #[arg(long)]
    log_file: Option<PathBuf>,
}

impl Cli {
    fn config(&self) -> ReportConfig {
        let defaults = ReportConfig::default();
        let layout = defaults
            .layout
            .clone()
            .average_score(ColumnRef::Label(self.score_column.clone()));
        defaults
            .event_poll_time(self.poll_ms)
            .max_column_width(self.max_column_width)
            .layout(layout)
    }
}

/// The terminal belongs to the UI, so logs only go to a file.
fn init_logging(log_file: Option<&PathBuf>) -> Result<(), TRError> {
    let Some(path) = log_file else {
        return Ok(());
    };
    let file = File::create(path)?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
        .with(ErrorLayer::default())
        .init();
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = init_logging(cli.log_file.as_ref()) {
        eprintln!("Error: cannot open log file: {e}");
        return ExitCode::FAILURE;
    }

    // Piped input has to be read before the terminal switches to raw mode
    let stdin_bytes = if cli.file.as_deref() == Some("-") {
        let mut bytes = Vec::new();
        if let Err(e) = std::io::stdin().read_to_end(&mut bytes) {
            eprintln!("Error: cannot read stdin: {e}");
            return ExitCode::FAILURE;
        }
        Some(bytes)
    } else {
        None
    };

    let mut terminal = ratatui::init();
    let result = run(&cli, stdin_bytes, &mut terminal);
    ratatui::restore();

    match result {
        Err(e) => {
            error!("Exiting with error: {e:?}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

fn run(
    cli: &Cli,
    stdin_bytes: Option<Vec<u8>>,
    terminal: &mut ratatui::DefaultTerminal,
) -> Result<(), TRError> {
    info!("Starting trainview!");
    let cfg = cli.config();

    let size = terminal.size()?;
    let mut model = Model::init(&cfg, size.width as usize, size.height as usize);

    let loaded = match (stdin_bytes, cli.file.as_deref()) {
        (Some(bytes), _) => model.load_data_bytes("stdin", &bytes),
        (None, Some(path)) => model.load_data_file(expand_path(path)),
        (None, None) => Ok(()),
    };
    // The UI starts anyway and shows the failure in the status line
    if let Err(e) = loaded {
        debug!("Initial load failed: {e}");
    }

    let controller = Controller::new(&cfg);

    while model.status != Status::QUITTING {
        // Render the current view
        terminal.draw(|f| ui::draw(model.get_uidata(), f))?;

        // Handle events and map to a Message
        let message = controller.handle_event(&model)?;
        model.update(message)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_arguments_override_the_config() {
        let cli = Cli::parse_from([
            "trainview",
            "--poll-ms",
            "40",
            "--score-column",
            "Средний балл",
            "report.xlsx",
        ]);
        let cfg = cli.config();
        assert_eq!(cli.file.as_deref(), Some("report.xlsx"));
        assert_eq!(cfg.event_poll_time, 40);
        assert_eq!(cfg.max_column_width, 30);
        assert_eq!(cfg.layout.average_score, ColumnRef::Label("Средний балл".into()));
        assert_eq!(cfg.layout.identity, ColumnRef::Index(1));
    }

    #[test]
    fn defaults_match_the_training_sheet() {
        let cfg = Cli::parse_from(["trainview"]).config();
        assert_eq!(cfg.layout, trainview::ColumnLayout::default());
    }
}
