//! `places` command-line adapter over the listing store.
//!
//! # Responsibility
//! - Translate subcommands into repository calls against one database file.
//! - Print results as JSON on stdout and failures as one line on stderr.
//!
//! Exit codes: `0` success, `2` not found, `1` anything else.

mod config;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use config::Config;
use log::{error, warn};
use places_core::db::{open_db, DbError};
use places_core::{
    core_version, init_logging, ping, Counter, Listing, ListingId, ListingRepository, RepoError,
    ResultResponse, SqliteCounterRepository, SqliteListingRepository, DEFAULT_PAGE_SIZE,
    LISTING_KIND,
};
use serde::Serialize;
use std::fmt::{Display, Formatter};
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "places", version, about = "Store and page through property listings")]
struct Cli {
    #[command(flatten)]
    config: Config,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Store a listing given as JSON and print it with its new id
    Create {
        /// Read the listing from this file instead of stdin
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Print one listing
    Get { id: ListingId },
    /// Remove one listing
    Delete { id: ListingId },
    /// Print one page of listings and the cursor for the next one
    List {
        #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
        page_size: usize,
        /// `next` value from the previous page
        #[arg(long, default_value = "")]
        cursor: String,
    },
    /// Print how many records of a kind were ever created
    Count {
        #[arg(long, default_value = LISTING_KIND)]
        name: String,
    },
    /// Print service name, version and the current time
    Echo,
}

#[derive(Debug)]
enum CliError {
    Db(DbError),
    Repo(RepoError),
    Input(String),
}

impl CliError {
    fn exit_code(&self) -> u8 {
        match self {
            Self::Repo(err) if err.is_not_found() => 2,
            _ => 1,
        }
    }
}

impl Display for CliError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "database unavailable: {err}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::Input(message) => write!(f, "invalid input: {message}"),
        }
    }
}

impl From<DbError> for CliError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<RepoError> for CliError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EchoResponse {
    name: &'static str,
    description: &'static str,
    current_date: DateTime<Utc>,
    status: &'static str,
    version: &'static str,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = init_logging(cli.config.log_level(), cli.config.log_dir.as_deref()) {
        eprintln!("places: logging disabled: {err}");
    }

    match run(&cli) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("event=cli_command module=cli status=error error={err}");
            eprintln!("places: {err}");
            ExitCode::from(err.exit_code())
        }
    }
}

fn run(cli: &Cli) -> Result<String, CliError> {
    match &cli.command {
        Command::Echo => echo(Utc::now()),
        Command::Create { file } => {
            let listing = read_listing(file.as_ref())?;
            if listing.is_persisted() {
                warn!(
                    "event=cli_create module=cli status=ignored_id supplied_id={}",
                    listing.id
                );
            }
            with_listings(&cli.config, |repo| {
                let id = repo.create_listing(&listing)?;
                render(&listing.with_id(id))
            })
        }
        Command::Get { id } => with_listings(&cli.config, |repo| render(&repo.get_listing(*id)?)),
        Command::Delete { id } => with_listings(&cli.config, |repo| {
            repo.delete_listing(*id)?;
            render(&ResultResponse {
                is_successful: true,
            })
        }),
        Command::List { page_size, cursor } => with_listings(&cli.config, |repo| {
            render(&repo.list_listings(*page_size, cursor)?)
        }),
        Command::Count { name } => {
            let conn = open_db(cli.config.db_path())?;
            let counters = SqliteCounterRepository::try_new(&conn)?;
            let counter = match counters.load(name) {
                Ok(counter) => counter,
                Err(RepoError::CounterNotFound(_)) => Counter {
                    name: name.clone(),
                    count: 0,
                },
                Err(err) => return Err(err.into()),
            };
            render(&counter)
        }
    }
}

fn with_listings<F>(config: &Config, command: F) -> Result<String, CliError>
where
    F: FnOnce(&SqliteListingRepository<'_>) -> Result<String, CliError>,
{
    let conn = open_db(config.db_path())?;
    let repo = SqliteListingRepository::try_new(&conn)?;
    command(&repo)
}

fn echo(now: DateTime<Utc>) -> Result<String, CliError> {
    render(&EchoResponse {
        name: "Our Places",
        description: "Our Places API - echo",
        current_date: now,
        status: ping(),
        version: core_version(),
    })
}

fn read_listing(file: Option<&PathBuf>) -> Result<Listing, CliError> {
    let body = match file {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|err| CliError::Input(format!("cannot read `{}`: {err}", path.display())))?,
        None => {
            let mut body = String::new();
            std::io::stdin()
                .read_to_string(&mut body)
                .map_err(|err| CliError::Input(format!("cannot read stdin: {err}")))?;
            body
        }
    };

    serde_json::from_str(&body).map_err(|err| CliError::Input(err.to_string()))
}

fn render(value: &impl Serialize) -> Result<String, CliError> {
    serde_json::to_string_pretty(value).map_err(|err| CliError::Input(err.to_string()))
}
