mod app;
mod calendar;
mod help;
mod jumpto;
mod theme;
mod tickets;
mod window;
use crate::app::App;
use crate::tickets::{Aggregator, Bucketing, CompletionPolicy, SqliteSource, TicketAggregator};
use crate::window::CalendarWindow;
use anyhow::Context;
use lexopt::{Arg, Parser, ValueExt};
use ratatui::DefaultTerminal;
use std::fs::File;
use std::path::{Path, PathBuf};
use time::{format_description::FormatItem, macros::format_description, Date, OffsetDateTime};

static YMD_FMT: &[FormatItem<'_>] = format_description!("[year]-[month]-[day]");

static DEFAULT_DB: &str = "tickets.db";

#[derive(Clone, Debug, Eq, PartialEq)]
enum Command {
    Run(Options),
    Help,
    Version,
}

#[derive(Clone, Debug, Eq, PartialEq)]
struct Options {
    date: Option<Date>,
    db: PathBuf,
    month: bool,
    bucketing: Bucketing,
    completion: CompletionPolicy,
    log_file: Option<PathBuf>,
}

impl Default for Options {
    fn default() -> Options {
        Options {
            date: None,
            db: PathBuf::from(DEFAULT_DB),
            month: false,
            bucketing: Bucketing::default(),
            completion: CompletionPolicy::default(),
            log_file: None,
        }
    }
}

impl Command {
    fn from_parser(mut parser: Parser) -> Result<Command, lexopt::Error> {
        let mut opts = Options::default();
        while let Some(arg) = parser.next()? {
            match arg {
                Arg::Short('h') | Arg::Long("help") => return Ok(Command::Help),
                Arg::Short('V') | Arg::Long("version") => return Ok(Command::Version),
                Arg::Long("db") => opts.db = PathBuf::from(parser.value()?),
                Arg::Short('m') | Arg::Long("month") => opts.month = true,
                Arg::Long("bucket") => opts.bucketing = parser.value()?.parse()?,
                Arg::Long("complete") => opts.completion = parser.value()?.parse()?,
                Arg::Long("log-file") => opts.log_file = Some(PathBuf::from(parser.value()?)),
                Arg::Value(value) if opts.date.is_none() => {
                    let value = value.string()?;
                    match Date::parse(&value, &YMD_FMT) {
                        Ok(d) => opts.date = Some(d),
                        Err(e) => {
                            return Err(lexopt::Error::ParsingFailed {
                                value,
                                error: Box::new(e),
                            })
                        }
                    }
                }
                _ => return Err(arg.unexpected()),
            }
        }
        Ok(Command::Run(opts))
    }

    fn run(self) -> anyhow::Result<()> {
        match self {
            Command::Run(opts) => {
                if let Some(ref path) = opts.log_file {
                    init_logging(path)?;
                }
                let today = OffsetDateTime::now_local()
                    .context("failed to determine local date")?
                    .date();
                let source = SqliteSource::open(&opts.db).with_context(|| {
                    format!("failed to open ticket database {}", opts.db.display())
                })?;
                let aggregator = Aggregator::new(opts.bucketing, opts.completion, today);
                let mut window = CalendarWindow::new(opts.date.unwrap_or(today));
                if opts.month {
                    window = window.toggle_mode();
                }
                log::info!(
                    "showing tickets from {} in {:?} view ({:?}, {:?})",
                    opts.db.display(),
                    window.mode(),
                    opts.bucketing,
                    opts.completion
                );
                let app = App::new(today, window, TicketAggregator::new(source, aggregator));
                with_terminal(|mut terminal| {
                    terminal.hide_cursor().context("failed to hide cursor")?;
                    app.run(terminal)?;
                    Ok(())
                })
            }
            Command::Help => {
                println!("Usage: ticketcal [OPTIONS] [YYYY-MM-DD]");
                println!();
                println!("Terminal calendar of daily ticket check-ins");
                println!();
                println!("Options:");
                println!("  --db <PATH>          SQLite ticket database [default: {DEFAULT_DB}]");
                println!("  -m, --month          Start in month view");
                println!("  --bucket <POLICY>    Day a ticket is counted on: open, close, or both");
                println!("                       [default: open]");
                println!("  --complete <POLICY>  When a day counts as complete: all-checked-in,");
                println!("                       any-closed, or all-closed [default: all-checked-in]");
                println!("  --log-file <PATH>    Append log messages to the given file; the level");
                println!("                       is read from $TICKETCAL_LOG [default: info]");
                println!("  -h, --help           Display this help message and exit");
                println!("  -V, --version        Show the program version and exit");
                Ok(())
            }
            Command::Version => {
                println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
                Ok(())
            }
        }
    }
}

fn main() -> anyhow::Result<()> {
    Command::from_parser(Parser::from_env())?.run()
}

// Log messages cannot go to stderr while the calendar occupies the terminal,
// so they are only written when a log file is given.
fn init_logging(path: &Path) -> anyhow::Result<()> {
    let file = File::options()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;
    env_logger::Builder::from_env(env_logger::Env::new().filter_or("TICKETCAL_LOG", "info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}

fn with_terminal<F, T>(func: F) -> anyhow::Result<T>
where
    F: FnOnce(DefaultTerminal) -> anyhow::Result<T>,
{
    let terminal = ratatui::init();
    let r = func(terminal);
    ratatui::restore();
    r
}
