//! Dialogs for a host whose stdin and stdout carry the protocol.

use async_trait::async_trait;
use pixbridge_document::HostUi;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, error};

/// Prompts on the controlling terminal and reports errors through the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalUi;

impl TerminalUi {
	async fn ask(prompt: &str) -> std::io::Result<Option<String>> {
		let tty = tokio::fs::OpenOptions::new().read(true).write(true).open("/dev/tty").await?;
		let mut tty = BufReader::new(tty);
		tty.get_mut().write_all(format!("{prompt}: ").as_bytes()).await?;
		tty.get_mut().flush().await?;
		let mut line = String::new();
		if tty.read_line(&mut line).await? == 0 {
			return Ok(None);
		}
		let answer = line.trim();
		Ok((!answer.is_empty()).then(|| answer.to_owned()))
	}
}

#[async_trait]
impl HostUi for TerminalUi {
	async fn input_box(&self, prompt: &str) -> Option<String> {
		match Self::ask(prompt).await {
			Ok(answer) => answer,
			Err(error) => {
				debug!(%error, "host.ui.no_terminal");
				None
			}
		}
	}

	fn show_error(&self, message: &str) {
		error!(message, "host.ui.error");
	}
}
