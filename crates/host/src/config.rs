//! Configuration file of the `pixbridge` binary.

use std::path::{Path, PathBuf};

use pixbridge_runtime::HostConfig;
use pixbridge_runtime::config::load_toml;
use serde::{Deserialize, Serialize};

/// Whole configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
	/// Options shared with the viewer side.
	pub host: HostConfig,
	/// Document persistence options.
	pub document: DocumentConfig,
}

/// `[document]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DocumentConfig {
	/// Where hot-exit backups go. Defaults to the platform data directory.
	pub backup_dir: Option<PathBuf>,
	/// Save whenever the viewer reports an edit.
	pub autosave: bool,
}

impl AppConfig {
	/// Reads `path`, or the default location when `None`. A missing file yields defaults.
	pub fn load(path: Option<&Path>) -> Result<Self, pixbridge_runtime::ConfigError> {
		match path.map(Path::to_path_buf).or_else(default_config_path) {
			Some(path) => load_toml(&path),
			None => Ok(Self::default()),
		}
	}
}

impl DocumentConfig {
	/// Backup directory, falling back to `<data dir>/pixbridge/backups`.
	pub fn backup_dir(&self) -> PathBuf {
		self.backup_dir.clone().unwrap_or_else(|| {
			dirs::data_local_dir()
				.unwrap_or_else(std::env::temp_dir)
				.join("pixbridge")
				.join("backups")
		})
	}
}

fn default_config_path() -> Option<PathBuf> {
	dirs::config_dir().map(|dir| dir.join("pixbridge").join("config.toml"))
}
