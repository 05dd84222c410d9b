//! Host configuration.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Where engine input requests are answered.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputRouting {
	/// Forward `inputNumber` / `inputSize` to the shell over the bridge.
	#[default]
	Shell,
	/// Ask the host directly.
	Prompt,
}

/// Options for hosting one engine instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HostConfig {
	/// Run the dirty tracker and emit `notifyDirty`.
	pub enable_dirty_notification: bool,
	/// Dirty-notification window in milliseconds.
	pub dirty_interval: u64,
	/// Hide the engine's own save button.
	pub disable_save_workspace_button: bool,
	/// Workspace file loaded right after initialization.
	pub workspace_path: Option<PathBuf>,
	/// Where input requests go.
	pub input_routing: InputRouting,
	/// Prefix of generated workspace names.
	pub workspace_name_prefix: String,
	/// Haptic pulse length in milliseconds.
	pub vibration_ms: u64,
	/// Optional timeout for bridge requests, in milliseconds.
	pub request_timeout: Option<u64>,
}

impl Default for HostConfig {
	fn default() -> Self {
		Self {
			enable_dirty_notification: false,
			dirty_interval: 1000,
			disable_save_workspace_button: false,
			workspace_path: None,
			input_routing: InputRouting::Shell,
			workspace_name_prefix: "pixel".to_owned(),
			vibration_ms: 50,
			request_timeout: None,
		}
	}
}

impl HostConfig {
	/// Dirty-notification window.
	pub fn dirty_interval(&self) -> Duration {
		Duration::from_millis(self.dirty_interval)
	}

	/// Haptic pulse length.
	pub fn vibration(&self) -> Duration {
		Duration::from_millis(self.vibration_ms)
	}

	/// Timeout for bridge requests, if any.
	pub fn request_timeout(&self) -> Option<Duration> {
		self.request_timeout.map(Duration::from_millis)
	}
}

/// Loads a TOML configuration file.
///
/// A missing file yields `T::default()`; an unreadable or malformed file is an error.
pub fn load_toml<T: DeserializeOwned + Default>(path: &Path) -> Result<T, ConfigError> {
	let text = match std::fs::read_to_string(path) {
		Ok(text) => text,
		Err(e) if e.kind() == ErrorKind::NotFound => {
			tracing::debug!(path = %path.display(), "config.missing");
			return Ok(T::default());
		}
		Err(error) => {
			return Err(ConfigError::Io {
				path: path.to_path_buf(),
				error,
			});
		}
	};
	toml::from_str(&text).map_err(|error| ConfigError::Toml {
		path: path.to_path_buf(),
		error,
	})
}
