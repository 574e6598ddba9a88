//! Query the book library from the command line.
//!
//! ```text
//! demo authors --select '["name", {"books": ["title"]}]'
//! demo book --title "animal farm" --select '[{"author": ["name"]}]'
//! demo add-book --title "Burmese Days" --author-id 1
//! ```
//!
//! Results are printed as JSON wrapped in `{"data": ...}`.

use clap::{Parser, Subcommand};
use resolver::{
    EntityType, Resolver, ResultNode, Selection, Settings, Value,
    errors::{CreateError, LookupError, SelectionError, SettingsError},
    library::{AUTHOR, BOOK},
};
use serde::Serialize;
use std::{io, path::PathBuf, process::ExitCode};
use thiserror::Error;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Query the book library.
#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    /// Path to a TOML settings file.
    #[arg(long, short, env = "RESOLVER_CONFIG")]
    config: Option<PathBuf>,
    /// The fields to include, as JSON, e.g. `["name", {"books": ["title"]}]`. Defaults to every
    /// scalar field.
    #[arg(long, short, global = true)]
    select: Option<String>,
    /// What to do.
    #[command(subcommand)]
    command: Command,
}

/// A query or mutation.
#[derive(Debug, Subcommand)]
enum Command {
    /// List every author.
    Authors,
    /// Look up an author by id.
    Author {
        /// The author's id.
        #[arg(long)]
        id: i64,
    },
    /// List every book.
    Books,
    /// Look up a book by title, ignoring case.
    Book {
        /// The title.
        #[arg(long)]
        title: String,
    },
    /// Add a book.
    AddBook {
        /// The title.
        #[arg(long)]
        title: String,
        /// The id of the author.
        #[arg(long)]
        author_id: i64,
    },
}

/// Errors reported to the user.
#[derive(Debug, Error)]
enum RunError {
    /// Settings could not be loaded.
    #[error(transparent)]
    Settings(#[from] Box<SettingsError>),
    /// The `--select` argument is not a selection.
    #[error("invalid selection: {0}")]
    SelectionSyntax(#[source] serde_json::Error),
    /// The selection does not fit the entity type.
    #[error(transparent)]
    Selection(#[from] SelectionError),
    /// A point lookup found nothing.
    #[error(transparent)]
    Lookup(#[from] LookupError),
    /// No book has the requested title.
    #[error("no `{BOOK}` titled {0:?}")]
    NoSuchTitle(String),
    /// A book was rejected.
    #[error(transparent)]
    Create(#[from] CreateError),
    /// The result could not be printed.
    #[error("failed to write output: {0}")]
    Output(#[source] serde_json::Error),
}

/// The output envelope.
#[derive(Debug, Serialize)]
struct Response<T> {
    /// The result.
    data: T,
}

/// Install a formatting subscriber writing to stderr. `RUST_LOG` takes precedence over the
/// configured filter.
fn setup_tracing(filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    if let Err(err) = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init()
    {
        eprintln!("failed to install logger: {err}");
    }
}

/// Parse `--select`, defaulting to every scalar field of `entity`.
fn selection(
    resolver: &Resolver,
    entity: &str,
    select: Option<&str>,
) -> Result<Selection, RunError> {
    match select {
        Some(json) => serde_json::from_str(json).map_err(RunError::SelectionSyntax),
        None => resolver
            .schema()
            .entity(entity)
            .map(EntityType::scalar_selection)
            .ok_or_else(|| SelectionError::UnknownEntity(entity.into()).into()),
    }
}

/// Print a result.
fn print<T: Serialize>(data: T) -> Result<(), RunError> {
    let output = serde_json::to_string_pretty(&Response { data }).map_err(RunError::Output)?;
    println!("{output}");
    Ok(())
}

/// Run one command.
fn run(args: Args) -> Result<(), RunError> {
    let settings = Settings::load(args.config.as_deref()).map_err(Box::new)?;
    setup_tracing(&settings.log.filter);
    debug!(?settings, command = ?args.command, "starting");

    let resolver = settings.resolver().map_err(Box::new)?;
    let select = args.select.as_deref();

    match args.command {
        Command::Authors => {
            let selection = selection(&resolver, AUTHOR, select)?;
            print(resolver.resolve_collection(AUTHOR, &selection)?)
        },
        Command::Author { id } => {
            let selection = selection(&resolver, AUTHOR, select)?;
            print(resolver.require_by_key(AUTHOR, id, &selection)?)
        },
        Command::Books => {
            let selection = selection(&resolver, BOOK, select)?;
            print(resolver.resolve_collection(BOOK, &selection)?)
        },
        Command::Book { title } => {
            let selection = selection(&resolver, BOOK, select)?;
            let book: ResultNode = resolver
                .find_by_text(BOOK, "title", &title, &selection)?
                .ok_or(RunError::NoSuchTitle(title))?;
            print(book)
        },
        Command::AddBook { title, author_id } => {
            let created = resolver.create_instance(
                BOOK,
                [
                    ("title", Value::from(title)),
                    ("author_id", Value::Int(author_id)),
                ],
            )?;
            print(created)
        },
    }
}

/// Run the command and report failures on stderr.
fn main() -> ExitCode {
    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        },
    }
}
