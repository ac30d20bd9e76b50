use std::borrow::Cow;
use std::path::PathBuf;

use anyhow::Context as AnyhowContext;
use clap::{Parser, Subcommand};
use flexi_logger::{FileSpec, LevelFilter, LogSpecification, Logger, LoggerHandle, WriteMode};

use gab::{Context, DefaultContext};

mod printer;
mod utils;

mod backup;
use backup::Backup;

mod restore;
use restore::Restore;

mod list;
use list::List;

mod show;
use show::Show;

mod edit;
use edit::Edit;

mod delete;
use delete::Delete;

mod export;
use export::Export;

#[derive(Parser)]
#[command(name = "gab")]
#[command(version)]
#[command(about = "Back up and restore per-account game state with device identity")]
struct Cli {
    /// Log to stderr instead of a file
    #[arg(short = 'e', long, action = clap::ArgAction::SetTrue, default_value_t = false)]
    log_stderr: bool,

    /// Send log output to the given file
    #[arg(short = 'f', long)]
    log_file: Option<PathBuf>,

    /// Set the log level, 0 = warn, 1 = info, 2 = debug, 3 = trace
    #[arg(short = 'l', long, default_value_t = 0)]
    log_level: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Capture the target app's current account into a new backup
    #[command()]
    Backup(Backup),

    /// Put a captured account back onto the device
    #[command()]
    Restore(Restore),

    /// List captured accounts
    #[command(alias = "ls")]
    List(List),

    /// Show one account record in full
    #[command()]
    Show(Show),

    /// Edit a record's label or credentials
    #[command()]
    Edit(Edit),

    /// Delete a record and its backup files
    #[command(alias = "rm")]
    Delete(Delete),

    /// Dump a record as json
    #[command()]
    Export(Export),
}

impl Cli {
    fn configure_loggers(&self, ctx: &DefaultContext) -> anyhow::Result<LoggerHandle> {
        let log_spec = if self.log_level > 0 {
            let lvl = match self.log_level {
                1 => LevelFilter::Info,
                2 => LevelFilter::Debug,
                _ => LevelFilter::Trace,
            };
            LogSpecification::builder().module("gab", lvl).build()
        } else {
            LogSpecification::env().with_context(|| "getting log spec from env")?
        };

        let mut logger = Logger::with(log_spec);

        if !self.log_stderr {
            let path = match &self.log_file {
                Some(v) => {
                    if v.is_absolute() {
                        Some(Cow::Borrowed(v))
                    } else {
                        let full_path = std::env::current_dir()?.join(v);
                        Some(Cow::Owned(full_path))
                    }
                }
                None => ctx.get_log_dir().map(|d| Cow::Owned(d.join("log"))).ok(),
            };

            if let Some(p) = &path {
                logger = logger
                    .log_to_file(
                        FileSpec::try_from(p.as_ref()).with_context(|| "creating filespec")?,
                    )
                    .append()
                    .write_mode(WriteMode::BufferAndFlush);
            }
        }

        Ok(logger.start().with_context(|| "starting logger")?)
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let ctx = DefaultContext::default();
    let log_handle = cli.configure_loggers(&ctx)?;

    let res = match cli.command {
        Commands::Backup(c) => c.run(&ctx),
        Commands::Restore(c) => c.run(&ctx),
        Commands::List(c) => c.run(&ctx),
        Commands::Show(c) => c.run(&ctx),
        Commands::Edit(c) => c.run(&ctx),
        Commands::Delete(c) => c.run(&ctx),
        Commands::Export(c) => c.run(&ctx),
    };

    if let Err(e) = &res {
        // Full chain goes to the log, a single line to the user
        log::error!("command failed: {:?}", e);
    }
    log_handle.flush();
    res
}
