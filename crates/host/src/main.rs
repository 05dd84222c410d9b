//! `pixbridge` document host.
//!
//! Hosts one PNG workspace for a viewer that speaks the bridge protocol as
//! newline-delimited JSON on stdin/stdout. Logs go to stderr.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand};
use pixbridge_document::{DocumentHost, LocalFileSystem};
use tokio_util::sync::CancellationToken;
use tracing::info;
use url::Url;

mod config;
mod session;
mod ui;

use crate::config::AppConfig;
use crate::session::{Exit, Session, SessionOptions};
use crate::ui::TerminalUi;

/// Hot-exit deadline when no request timeout is configured.
const DEFAULT_HOT_EXIT_TIMEOUT: Duration = Duration::from_secs(3);

/// Command line arguments.
#[derive(Parser, Debug)]
#[command(name = "pixbridge")]
#[command(about = "Document host for pixbridge viewers")]
struct Args {
	/// Verbose logging
	#[arg(short, long, global = true)]
	verbose: bool,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Host FILE for one viewer over stdin/stdout
	Serve {
		/// Workspace file
		file: PathBuf,

		/// Restore from this backup id instead of FILE's contents
		#[arg(long, value_name = "ID")]
		backup: Option<String>,

		/// Configuration file
		#[arg(short, long, value_name = "FILE")]
		config: Option<PathBuf>,
	},
	/// Print a fresh cache token
	NewToken,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let args = Args::parse();
	setup_tracing(args.verbose);

	match args.command {
		Command::NewToken => {
			println!("{}", pixbridge_cache::generate_token());
			Ok(())
		}
		Command::Serve { file, backup, config } => {
			let exit = serve(&file, backup.as_deref(), config.as_deref()).await?;
			info!(reason = ?exit.reason, backup = exit.backup.as_deref(), "host.done");
			// stdin's blocking read cannot be cancelled and would hold the runtime open.
			std::process::exit(0)
		}
	}
}

async fn serve(file: &Path, backup: Option<&str>, config: Option<&Path>) -> anyhow::Result<Exit> {
	let config = AppConfig::load(config).context("loading configuration")?;
	let path = std::path::absolute(file).with_context(|| format!("resolving {}", file.display()))?;
	let uri = Url::from_file_path(&path).map_err(|()| anyhow!("cannot address {}", path.display()))?;

	let (host, events) = DocumentHost::with_events(Arc::new(LocalFileSystem), Arc::new(TerminalUi));
	let host = Arc::new(host.with_request_timeout(config.host.request_timeout()));
	let doc = host.open(uri, backup).await.with_context(|| format!("opening {}", path.display()))?;
	info!(file = %path.display(), restored = backup.is_some(), autosave = config.document.autosave, "host.serve");

	let shutdown = CancellationToken::new();
	tokio::spawn({
		let shutdown = shutdown.clone();
		async move {
			if tokio::signal::ctrl_c().await.is_ok() {
				shutdown.cancel();
			}
		}
	});

	let options = SessionOptions {
		autosave: config.document.autosave,
		backup_dir: config.document.backup_dir(),
		hot_exit_timeout: config.host.request_timeout().unwrap_or(DEFAULT_HOT_EXIT_TIMEOUT),
	};
	let exit = Session::new(host, doc, events, options)
		.run(tokio::io::stdin(), tokio::io::stdout(), shutdown)
		.await;
	Ok(exit)
}

fn setup_tracing(verbose: bool) {
	use tracing_subscriber::EnvFilter;

	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
		if verbose {
			EnvFilter::new("pixbridge_host=trace,debug")
		} else {
			EnvFilter::new("info")
		}
	});
	tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}
