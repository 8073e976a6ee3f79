pub mod clients;
pub mod output;
pub mod projects;
pub mod timer;

use std::path::PathBuf;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clients::{process_clients_command, ClientsCommand};
use projects::{process_projects_command, ProjectsCommand};
use timer::{process_timer_command, TimerCommand};
use tracing::level_filters::LevelFilter;

use crate::{
    config::AppConfig,
    query::{Pagination, DEFAULT_PAGE_SIZE},
    store::seed::Seed,
    utils::{
        dir::ensure_dir,
        logging::{enable_logging, CLI_PREFIX, TIMER_PREFIX},
    },
};

#[derive(Parser, Debug)]
#[command(name = "Timeflow", version, long_about = None)]
#[command(about = "Track time spent on projects for your clients", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(
        long,
        global = true,
        help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
    )]
    dir: Option<PathBuf>,
    #[arg(
        long,
        global = true,
        env = "TIMEFLOW_LATENCY_MS",
        default_value_t = 0,
        help = "Delay every store call by this many milliseconds"
    )]
    latency_ms: u64,
    #[arg(
        long,
        global = true,
        help = "Start with an empty store instead of demo data when nothing was saved yet"
    )]
    no_seed: bool,
    #[arg(long, global = true, help = "Enable trace logging")]
    log: bool,
    #[arg(long, global = true, help = "Also print logs to the console")]
    log_console: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Manage clients")]
    Clients {
        #[command(subcommand)]
        command: ClientsCommand,
    },
    #[command(about = "Manage projects")]
    Projects {
        #[command(subcommand)]
        command: ProjectsCommand,
    },
    #[command(about = "Run an interactive stopwatch")]
    Timer {
        #[command(flatten)]
        command: TimerCommand,
    },
}

#[derive(Debug, Clone, Copy, clap::Args)]
pub struct PageArgs {
    #[arg(long, default_value_t = 1, help = "Page to show, starting at 1")]
    page: u32,
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE, help = "Items per page")]
    page_size: u32,
}

impl PageArgs {
    pub fn pagination(&self) -> Result<Pagination> {
        Pagination::new(self.page, self.page_size).map_err(|e| {
            Args::command()
                .error(clap::error::ErrorKind::ValueValidation, e.to_string())
                .into()
        })
    }
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let seed = if args.no_seed { Seed::Empty } else { Seed::Demo };
    let config = AppConfig::resolve(args.dir, args.latency_ms, seed)?;

    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };
    let prefix = match args.commands {
        Commands::Timer { .. } => TIMER_PREFIX,
        _ => CLI_PREFIX,
    };
    enable_logging(
        prefix,
        &ensure_dir(config.logs_dir())?,
        logging_level,
        args.log_console,
    )?;

    match args.commands {
        Commands::Clients { command } => process_clients_command(command, &config).await,
        Commands::Projects { command } => process_projects_command(command, &config).await,
        Commands::Timer { command } => process_timer_command(command, &config).await,
    }
}
