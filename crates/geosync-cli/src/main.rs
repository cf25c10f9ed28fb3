use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use geosync_journal::{render_changes, render_coverage};
use geosync_lifecycle::StopOutcome;
use geosync_runner::{Runner, SyncOptions};

#[derive(Parser)]
#[command(name = "geosync", version)]
struct Cli {
    /// Working root holding geosync.toml, data and the cache
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Log filter, e.g. `info` or `geosync_resolver=debug` (defaults to RUST_LOG)
    #[arg(long, global = true)]
    log: Option<String>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a default geosync.toml and create the working directories
    Init,

    /// Preflight checks
    Doctor,

    /// Run the full pipeline
    Sync {
        /// Use the snapshot already on disk
        #[arg(long)]
        skip_acquire: bool,
        /// Leave the serving process alone
        #[arg(long)]
        no_restart: bool,
        /// Report what would change without touching the cache, snapshots or service
        #[arg(long)]
        dry_run: bool,
    },

    /// Print the change set between the current and previous snapshots
    Diff,

    /// Resolve every current record that has no cached coordinates
    Resolve {
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Coverage statistics for the current snapshot
    Stats,

    /// Restart the serving process only
    Restart,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = match &cli.log {
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::from_default_env(),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let root = match cli.root {
        Some(root) => root,
        None => std::env::current_dir()?,
    };

    match cli.cmd {
        Command::Init => {
            let cfg_path = Runner::init_root(&root)?;
            println!("Initialized geosync in {} (config {})", root.display(), cfg_path.display());
        }
        Command::Doctor => {
            let r = Runner::open(root)?;
            let checks = r.doctor();
            for c in &checks {
                println!("[{}] {}: {}", if c.ok { "ok" } else { "FAIL" }, c.name, c.detail);
            }
            if checks.iter().any(|c| !c.ok) {
                std::process::exit(1);
            }
            println!("OK");
        }
        Command::Sync {
            skip_acquire,
            no_restart,
            dry_run,
        } => {
            let r = Runner::open(root)?;
            let summary = r.sync(&SyncOptions {
                skip_acquire,
                no_restart,
                dry_run,
            });
            println!("{summary}");
            if let Some(dir) = &summary.run_dir {
                println!("Run journal: {}", dir.display());
            }
            if summary.started.is_some() {
                if let Some(url) = &r.cfg.service.url {
                    println!("Service available at {url}");
                }
            }
            std::process::exit(summary.exit_code());
        }
        Command::Diff => {
            let r = Runner::open(root)?;
            let (current, changes) = r.diff()?;
            let mut out = String::new();
            render_changes(&mut out, &changes);
            println!("{} records in current snapshot", current.len());
            print!("{out}");
            if changes.is_empty() {
                println!("No changes.");
            }
        }
        Command::Resolve { limit } => {
            let r = Runner::open(root)?;
            let summary = r.resolve_all(limit)?;
            println!("{summary}");
        }
        Command::Stats => {
            let r = Runner::open(root)?;
            let stats = r.stats()?;
            let mut out = String::new();
            render_coverage(&mut out, &stats);
            print!("{out}");
        }
        Command::Restart => {
            let r = Runner::open(root)?;
            let outcome = r.restart()?;
            if let Some((handle, how)) = &outcome.stopped {
                let how = match how {
                    StopOutcome::Graceful => "gracefully",
                    StopOutcome::Forced => "forcibly",
                };
                println!("Stopped pid {} {how}", handle.pid);
            }
            println!(
                "Started pid {} (log {})",
                outcome.started.pid,
                outcome.started.log_path.display()
            );
            if let Some(url) = &r.cfg.service.url {
                println!("Service available at {url}");
            }
        }
    }

    Ok(())
}
