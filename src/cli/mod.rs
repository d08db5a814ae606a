//! Command-line host: loads a result set and renders it through a pager.

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::Value;
use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};
use tracing::{debug, warn};

use crate::error::PagerError;
use crate::pager::{FieldAccessor, TablePager};
use crate::render::json::frame_json;
use crate::render::{
    BoundTable, JsonBinding, RenderBinding, RenderFrame, TableView, TemplateBinding, ViewFormat,
};
use crate::sources::{RecordSource, load_records};
use crate::utils::debounce::{SearchDebouncer, debounce_from_env};
use crate::utils::json::{leaf_text, top_level_keys};

pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const PAGE_SIZE_ENV: &str = "TABLE_PAGER_PAGE_SIZE";

#[derive(Parser, Debug)]
#[command(
    name = "table-pager",
    version,
    about = "Page and search JSON result sets loaded from a file or REST endpoint"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Render one page of a result set (or every page with --all)
    Show {
        #[command(flatten)]
        table: TableArgs,

        /// Page to show, starting at 1 (out-of-range values are clamped)
        #[arg(long, default_value = "1", allow_hyphen_values = true)]
        page: i64,

        /// Case-insensitive substring filter applied before paging
        #[arg(long)]
        search: Option<String>,

        /// Render every page in order
        #[arg(long)]
        all: bool,
    },

    /// Page through a result set interactively, one command per stdin line
    Browse {
        #[command(flatten)]
        table: TableArgs,
    },
}

#[derive(Args, Debug, Clone)]
pub struct TableArgs {
    /// JSON file holding the records
    #[arg(long, conflicts_with = "url", required_unless_present = "url")]
    pub file: Option<PathBuf>,

    /// REST endpoint returning the records as JSON
    #[arg(long)]
    pub url: Option<String>,

    /// Field of a JSON object response that holds the records (default: data/results/items/records)
    #[arg(long)]
    pub records_key: Option<String>,

    /// Records per page (default: $TABLE_PAGER_PAGE_SIZE or 10)
    #[arg(long)]
    pub page_size: Option<usize>,

    /// Dotted path searched by --search; repeatable (default: every value of the record)
    #[arg(long = "field")]
    pub fields: Vec<String>,

    /// Dotted path rendered as a column; repeatable (default: top-level keys of the first record)
    #[arg(long = "column")]
    pub columns: Vec<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Markdown)]
    pub format: OutputFormat,

    /// Heading rendered above the table
    #[arg(long)]
    pub title: Option<String>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Markdown,
    Html,
    Json,
}

impl TableArgs {
    fn source(&self) -> anyhow::Result<RecordSource> {
        match (&self.file, &self.url) {
            (Some(path), None) => Ok(RecordSource::File(path.clone())),
            (None, Some(url)) => Ok(RecordSource::Url(url.trim().to_string())),
            _ => Err(PagerError::InvalidArgument(
                "exactly one of --file or --url is required".into(),
            )
            .into()),
        }
    }

    fn page_size(&self) -> usize {
        self.page_size
            .unwrap_or_else(|| page_size_from(std::env::var(PAGE_SIZE_ENV).ok().as_deref()))
    }

    fn pager(&self) -> Result<TablePager<Value>, PagerError> {
        let fields = self
            .fields
            .iter()
            .map(|path| FieldAccessor::path(path))
            .collect();
        TablePager::configure(self.page_size(), fields)
    }

    fn view(&self, records: &[Value]) -> TableView<Value> {
        let view = TableView::new(self.columns(records), self.view_format());
        match &self.title {
            Some(title) => view.with_title(title.clone()),
            None => view,
        }
    }

    fn view_format(&self) -> ViewFormat {
        match self.format {
            OutputFormat::Html => ViewFormat::Html,
            OutputFormat::Markdown | OutputFormat::Json => ViewFormat::Markdown,
        }
    }

    fn columns(&self, records: &[Value]) -> Vec<FieldAccessor<Value>> {
        if !self.columns.is_empty() {
            return self
                .columns
                .iter()
                .map(|path| FieldAccessor::path(path))
                .collect();
        }
        match records.first() {
            Some(first @ Value::Object(_)) => top_level_keys(first)
                .iter()
                .map(|key| FieldAccessor::path(key))
                .collect(),
            Some(_) => vec![FieldAccessor::new("value", leaf_text)],
            None => Vec::new(),
        }
    }

    async fn load(&self) -> anyhow::Result<Vec<Value>> {
        let source = self.source()?;
        load_records(&source, self.records_key.as_deref())
            .await
            .with_context(|| format!("failed to load records from {}", source.label()))
    }
}

fn page_size_from(raw: Option<&str>) -> usize {
    let Some(raw) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
        return DEFAULT_PAGE_SIZE;
    };
    match raw.parse::<usize>() {
        Ok(size) if size > 0 => size,
        _ => {
            warn!(value = raw, "{PAGE_SIZE_ENV} is not a positive integer; using default");
            DEFAULT_PAGE_SIZE
        }
    }
}

/// Runs a non-interactive command and returns its rendered output.
///
/// # Errors
///
/// Returns an error when records cannot be loaded, the pager is misconfigured,
/// or rendering fails.
pub async fn run(cli: Cli) -> anyhow::Result<String> {
    match cli.command {
        Commands::Show {
            table,
            page,
            search,
            all,
        } => show(&table, page, search.as_deref(), all).await,
        Commands::Browse { .. } => Err(PagerError::InvalidArgument(
            "browse is interactive; use run_browse".into(),
        )
        .into()),
    }
}

async fn show(
    args: &TableArgs,
    page: i64,
    search: Option<&str>,
    all: bool,
) -> anyhow::Result<String> {
    let mut pager = args.pager()?;
    let records = args.load().await?;
    let view = args.view(&records);
    pager.set_data(records);
    if let Some(term) = search {
        pager.search(term);
    }

    let pages: Vec<i64> = if all {
        (0..pager.total_pages())
            .map(|index| i64::try_from(index).unwrap_or(i64::MAX))
            .collect()
    } else {
        vec![page.saturating_sub(1)]
    };

    let mut rendered = Vec::with_capacity(pages.len());
    for index in pages {
        pager.go_to_page(index);
        debug!(page_index = pager.page_index(), "rendering page");
        rendered.push(render_frame(args.format, &view, &pager.frame())?);
    }
    Ok(rendered.join("\n").trim_end().to_string())
}

fn render_frame(
    format: OutputFormat,
    view: &TableView<Value>,
    frame: &RenderFrame<'_, Value>,
) -> Result<String, PagerError> {
    match format {
        OutputFormat::Json => frame_json(frame),
        OutputFormat::Markdown | OutputFormat::Html => view.render(frame),
    }
}

/// The browse loop's surface: renders into a buffer the loop flushes after
/// each command.
enum BrowseBinding {
    Template(TemplateBinding<Value, Vec<u8>>),
    Json(JsonBinding<Vec<u8>>),
}

impl BrowseBinding {
    fn new(format: OutputFormat, view: TableView<Value>) -> Self {
        match format {
            OutputFormat::Json => Self::Json(JsonBinding::new(Vec::new())),
            OutputFormat::Markdown | OutputFormat::Html => {
                Self::Template(TemplateBinding::new(view, Vec::new()))
            }
        }
    }

    fn take_output(&mut self) -> Vec<u8> {
        match self {
            Self::Template(binding) => std::mem::take(binding.writer_mut()),
            Self::Json(binding) => std::mem::take(binding.writer_mut()),
        }
    }
}

impl RenderBinding<Value> for BrowseBinding {
    fn render(&mut self, frame: &RenderFrame<'_, Value>) -> Result<(), PagerError> {
        match self {
            Self::Template(binding) => binding.render(frame),
            Self::Json(binding) => binding.render(frame),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum BrowseCommand {
    Search(String),
    Next,
    Prev,
    Page(i64),
    Help,
    Quit,
}

const BROWSE_HELP: &str = "Commands: search <term>, clear, next (n), prev (p), page <N>, help, quit (q)";

const SEARCH_WORDS: [&str; 3] = ["search", "s", "/"];

/// Parses one browse line. A search term is the raw remainder of the line
/// after the command word; every other command is split with shell quoting.
fn parse_browse_command(line: &str) -> Result<Option<BrowseCommand>, String> {
    let line = line.trim_start();
    let (head, tail) = line
        .split_once(char::is_whitespace)
        .unwrap_or((line, ""));
    if SEARCH_WORDS.contains(&head.to_ascii_lowercase().as_str()) {
        return Ok(Some(BrowseCommand::Search(tail.to_string())));
    }

    let Some(words) = shlex::split(line) else {
        return Err(format!("Invalid command syntax: {}", line.trim()));
    };
    let Some((cmd, rest)) = words.split_first() else {
        return Ok(None);
    };

    let command = match cmd.to_ascii_lowercase().as_str() {
        "clear" => BrowseCommand::Search(String::new()),
        "next" | "n" => BrowseCommand::Next,
        "prev" | "p" => BrowseCommand::Prev,
        "page" | "g" => {
            let raw = rest.first().ok_or("page expects a page number")?;
            let number = raw
                .parse::<i64>()
                .map_err(|_| format!("page expects a page number, got '{raw}'"))?;
            BrowseCommand::Page(number)
        }
        "help" | "?" => BrowseCommand::Help,
        "quit" | "q" | "exit" => BrowseCommand::Quit,
        other => return Err(format!("Unknown command '{other}'. {BROWSE_HELP}")),
    };
    Ok(Some(command))
}

/// Forwards input lines from a reader thread so the browse loop can wait on
/// keyboard input and the search debouncer at the same time.
fn spawn_line_reader<R>(input: R) -> UnboundedReceiver<std::io::Result<String>>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = unbounded_channel();
    std::thread::spawn(move || {
        for line in input.lines() {
            let failed = line.is_err();
            if tx.send(line).is_err() || failed {
                break;
            }
        }
    });
    rx
}

fn redraw<W: Write>(
    table: &mut BoundTable<Value, BrowseBinding>,
    output: &mut W,
) -> anyhow::Result<()> {
    output.write_all(&table.binding_mut().take_output())?;
    output.flush()?;
    Ok(())
}

/// Applies a search still waiting out the debounce delay so commands take
/// effect in the order they were typed.
fn apply_pending_search<W: Write>(
    debouncer: &mut SearchDebouncer,
    searches: &mut UnboundedReceiver<String>,
    table: &mut BoundTable<Value, BrowseBinding>,
    output: &mut W,
) -> anyhow::Result<()> {
    let mut terms: Vec<String> = debouncer.flush().into_iter().collect();
    while let Ok(term) = searches.try_recv() {
        terms.push(term);
    }
    if let Some(term) = terms.pop() {
        debug!(term = %term, "applying pending search");
        table.search(&term)?;
        redraw(table, output)?;
    }
    Ok(())
}

/// Interactive paging: reads one command per line from `input` and redraws
/// the table on `output` after every state change. Search commands are
/// debounced by `TABLE_PAGER_DEBOUNCE_MS` (300 ms by default), so a burst of
/// searches only filters once.
///
/// # Errors
///
/// Returns an error when records cannot be loaded, the pager is misconfigured,
/// or reading/writing the terminal fails. Bad commands are reported inline.
pub async fn run_browse<R, W>(args: &TableArgs, input: R, output: W) -> anyhow::Result<()>
where
    R: BufRead + Send + 'static,
    W: Write,
{
    browse(args, input, output, debounce_from_env()).await
}

async fn browse<R, W>(
    args: &TableArgs,
    input: R,
    mut output: W,
    delay: Duration,
) -> anyhow::Result<()>
where
    R: BufRead + Send + 'static,
    W: Write,
{
    let pager = args.pager()?;
    let records = args.load().await?;
    let binding = BrowseBinding::new(args.format, args.view(&records));
    let mut table = BoundTable::new(pager, binding);

    writeln!(output, "{BROWSE_HELP}")?;
    table.set_data(records)?;
    redraw(&mut table, &mut output)?;

    let mut lines = spawn_line_reader(input);
    let (mut debouncer, mut searches) = SearchDebouncer::new(delay);
    loop {
        let line = tokio::select! {
            Some(term) = searches.recv() => {
                table.search(&term)?;
                redraw(&mut table, &mut output)?;
                continue;
            }
            line = lines.recv() => line,
        };
        let Some(line) = line else {
            break;
        };

        let command = match parse_browse_command(&line?) {
            Ok(None) => continue,
            Ok(Some(BrowseCommand::Search(term))) => {
                debouncer.push(term);
                continue;
            }
            Ok(Some(command)) => command,
            Err(message) => {
                apply_pending_search(&mut debouncer, &mut searches, &mut table, &mut output)?;
                writeln!(output, "Error: {message}")?;
                continue;
            }
        };

        apply_pending_search(&mut debouncer, &mut searches, &mut table, &mut output)?;
        match command {
            BrowseCommand::Quit => break,
            BrowseCommand::Help => writeln!(output, "{BROWSE_HELP}")?,
            BrowseCommand::Next => table.next_page()?,
            BrowseCommand::Prev => table.prev_page()?,
            BrowseCommand::Page(number) => table.go_to_page(number.saturating_sub(1))?,
            BrowseCommand::Search(_) => {}
        }
        redraw(&mut table, &mut output)?;
    }

    apply_pending_search(&mut debouncer, &mut searches, &mut table, &mut output)
}
