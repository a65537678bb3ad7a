//! Command-line host for the to-do sync core.
//!
//! Loads configuration from the environment, runs one action against the
//! remote table and prints the resulting list.

use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use todo_sync_core::{
    AppState, Config, RemoteTable, SortDirection, SortField, TableClient, TodoController, UreqTransport, ViewQuery,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "todo-sync")]
#[command(about = "Manage a to-do list stored in a remote table")]
struct Args {
    /// Field to sort the printed list by
    #[arg(long, value_enum, default_value_t = SortArg::CreatedTime, global = true)]
    sort: SortArg,

    /// Sort direction
    #[arg(long, value_enum, default_value_t = DirectionArg::Desc, global = true)]
    direction: DirectionArg,

    /// Only show todos whose title contains this text
    #[arg(long, default_value = "", global = true)]
    search: String,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the list (default)
    List,
    /// Add a todo
    Add { title: String },
    /// Mark a todo as completed
    Complete { id: String },
    /// Change a todo's title
    Edit { id: String, title: String },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SortArg {
    Title,
    CreatedTime,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum DirectionArg {
    Asc,
    Desc,
}

impl Args {
    fn query(&self) -> ViewQuery {
        ViewQuery {
            sort_field: match self.sort {
                SortArg::Title => SortField::Title,
                SortArg::CreatedTime => SortField::CreatedTime,
            },
            sort_direction: match self.direction {
                DirectionArg::Asc => SortDirection::Asc,
                DirectionArg::Desc => SortDirection::Desc,
            },
            search_text: self.search.clone(),
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_writer(std::io::stderr)
        .init();

    let config = match Config::global() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("configuration error: {err}");
            return ExitCode::FAILURE;
        }
    };
    tracing::debug!(resource = %config.resource_url(), "configured");

    let remote = RemoteTable::new(TableClient::from_config(config), UreqTransport::new());
    let controller = TodoController::new(remote);
    let query = args.query();

    // complete/edit need the current item in the store.
    controller.fetch_all(&query).await;
    if let Some(message) = controller.snapshot().error_message {
        eprintln!("{message}");
        return ExitCode::FAILURE;
    }

    match args.command.unwrap_or(Command::List) {
        Command::List => {}
        Command::Add { title } => controller.add(title).await,
        Command::Complete { id } => controller.complete(&id).await,
        Command::Edit { id, title } => match controller.snapshot().item(&id).cloned() {
            Some(mut edited) => {
                edited.title = title;
                controller.edit(&edited).await;
            }
            None => {
                eprintln!("no todo with id {id}");
                return ExitCode::FAILURE;
            }
        },
    }

    let state = controller.snapshot();
    print_list(&state);
    match state.error_message {
        Some(message) => {
            eprintln!("{message}");
            ExitCode::FAILURE
        }
        None => ExitCode::SUCCESS,
    }
}

fn print_list(state: &AppState) {
    if state.items.is_empty() {
        println!("(no todos)");
        return;
    }
    for item in &state.items {
        let mark = if item.is_completed { "x" } else { " " };
        println!("[{mark}] {}  {}", item.id, item.title);
    }
}
