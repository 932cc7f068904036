use std::fs;
use std::io::stdout;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::mpsc;
use std::thread;

use clap::Parser;
use ratatui::DefaultTerminal;
use ratatui::crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use ratatui::crossterm::execute;
use tracing::{error, info};

mod controller;
mod dataset;
mod domain;
mod filter;
mod inputter;
mod labels;
mod logging;
mod model;
mod prefs;
mod render;
mod sort;
mod store;
mod ui;

use controller::Controller;
use dataset::Dataset;
use domain::{Config, Message, TableError};
use filter::FilterState;
use labels::{Labels, Lang};
use model::{Model, Status};
use render::{bind_headers, to_html};
use sort::SortState;
use store::TableStore;
use ui::TableUI;

/// Browse a JSON list of records with search, filters and sorting.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// JSON file holding an array of records
    data: String,

    /// Language of labels and messages
    #[arg(long, value_enum, default_value_t = Lang::En)]
    lang: Lang,

    /// Widest a column is drawn
    #[arg(long, default_value_t = 40)]
    max_column_width: usize,

    /// Event poll interval in milliseconds
    #[arg(long, default_value_t = 100)]
    poll_ms: u64,

    /// Where the theme preference is kept
    #[arg(long, default_value = "~/.config/rtable/prefs.json")]
    prefs: String,

    /// Log file, defaults to rtable.log in the temp directory
    #[arg(long)]
    log_file: Option<String>,

    /// Write the table as HTML to this file and exit
    #[arg(long)]
    export_html: Option<String>,

    /// Search query applied before export
    #[arg(long, requires = "export_html")]
    query: Option<String>,

    /// Type filter applied before export
    #[arg(long = "type", requires = "export_html")]
    kind: Option<String>,

    /// Country filter applied before export
    #[arg(long, requires = "export_html")]
    country: Option<String>,

    /// Sort applied before export, as COLUMN or COLUMN:desc
    #[arg(long, requires = "export_html")]
    sort: Option<SortState>,
}

fn expand(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).into_owned())
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

fn run(args: Args) -> Result<(), TableError> {
    let log_file = args
        .log_file
        .as_deref()
        .map(expand)
        .unwrap_or_else(|| std::env::temp_dir().join("rtable.log"));
    logging::init(&log_file)?;

    let config = Config::default()
        .data_path(expand(&args.data))
        .prefs_path(expand(&args.prefs))
        .event_poll_time(args.poll_ms)
        .max_column_width(args.max_column_width)
        .lang(args.lang);
    info!("Starting rtable with {:?}", config);

    match args.export_html.as_deref() {
        Some(target) => {
            let filter = FilterState {
                query: args.query.unwrap_or_default(),
                kind: args.kind,
                country: args.country,
            };
            export(&config, filter, args.sort.unwrap_or_default(), &expand(target))
        }
        None => interactive(&config),
    }
}

fn export(
    config: &Config,
    filter: FilterState,
    sort: SortState,
    target: &Path,
) -> Result<(), TableError> {
    let labels = Labels::for_lang(config.lang);
    let mut store = TableStore::new(config.lang);
    store.begin_load();
    let result = Dataset::load(&config.data_path);
    let failure = result.as_ref().err().map(|e| e.to_string());
    store.finish_load(result);
    store.set_filter(filter);
    store.set_sort(sort);

    let headers = bind_headers(labels);
    let html = to_html(&store.presentation(&headers, 0..usize::MAX), labels);
    fs::write(target, html)?;
    info!("Exported {} rows to {}", store.view().len(), target.display());

    match failure {
        Some(reason) => Err(TableError::LoadingFailed(reason)),
        None => Ok(()),
    }
}

fn interactive(config: &Config) -> Result<(), TableError> {
    let (tx, rx) = mpsc::channel();
    let data_path = config.data_path.clone();
    thread::spawn(move || {
        if tx.send(Dataset::load(&data_path)).is_err() {
            error!("Viewer exited before the data was loaded");
        }
    });

    let mut terminal = ratatui::init();
    let result = execute!(stdout(), EnableMouseCapture)
        .map_err(TableError::from)
        .and_then(|_| event_loop(&mut terminal, config, rx));
    if let Err(e) = execute!(stdout(), DisableMouseCapture) {
        error!("Could not disable mouse capture: {e}");
    }
    ratatui::restore();
    result
}

fn event_loop(
    terminal: &mut DefaultTerminal,
    config: &Config,
    rx: mpsc::Receiver<Result<Dataset, TableError>>,
) -> Result<(), TableError> {
    let size = terminal.size()?;
    let mut model = Model::init(config, size.width as usize, size.height as usize);
    let ui = TableUI::new();
    let controller = Controller::new(config);

    while model.status != Status::QUITTING {
        // Render the current view
        terminal.draw(|f| ui.draw(&model, f))?;

        if let Ok(loaded) = rx.try_recv() {
            model.update(Some(Message::Loaded(loaded)))?;
            continue;
        }

        // Handle events and map to a Message
        let message = controller.handle_event(&model)?;
        model.update(message)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dataset::Column;
    use sort::Direction;

    fn fixture(name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests/fixtures")
            .join(name)
    }

    #[test]
    fn export_writes_filtered_and_sorted_table() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("table.html");
        let config = Config::default().data_path(fixture("vpn_01.json"));
        let filter = FilterState {
            kind: Some("Paid".into()),
            ..FilterState::default()
        };
        let sort = SortState::new(Column::Price, Direction::Descending);

        export(&config, filter, sort, &target).unwrap();

        let html = fs::read_to_string(&target).unwrap();
        assert!(html.contains("<th data-col=\"price\" class=\"sort-desc\">Price</th>"));
        assert_eq!(html.matches("<tr>").count(), 4);
        assert!(!html.contains("Proton VPN"));
        let ivpn = html.find("IVPN").unwrap();
        let mullvad = html.find("Mullvad").unwrap();
        let surfshark = html.find("Surfshark").unwrap();
        assert!(ivpn < mullvad && mullvad < surfshark);
    }

    #[test]
    fn export_of_missing_data_writes_error_and_fails() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("table.html");
        let config = Config::default()
            .data_path(dir.path().join("missing.json"))
            .lang(Lang::Uk);

        let result = export(&config, FilterState::default(), SortState::default(), &target);
        assert!(matches!(result, Err(TableError::LoadingFailed(_))));

        let html = fs::read_to_string(&target).unwrap();
        assert_eq!(html, "<div class=\"no-data\">Помилка завантаження даних</div>\n");
    }
}
