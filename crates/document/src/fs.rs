//! File system seam.

use std::io;

use async_trait::async_trait;
use url::Url;

/// Reads and writes document bytes by URI.
#[async_trait]
pub trait FileSystem: Send + Sync + 'static {
	/// Reads the whole file.
	async fn read(&self, uri: &Url) -> io::Result<Vec<u8>>;

	/// Replaces the file's contents, creating it if needed.
	async fn write(&self, uri: &Url, data: &[u8]) -> io::Result<()>;

	/// Removes the file.
	async fn delete(&self, uri: &Url) -> io::Result<()>;

	/// Whether documents at `uri` can be saved in place.
	fn is_writable(&self, uri: &Url) -> bool;
}

/// `file://` URIs on the local disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFileSystem;

impl LocalFileSystem {
	fn path(uri: &Url) -> io::Result<std::path::PathBuf> {
		uri.to_file_path()
			.map_err(|()| io::Error::new(io::ErrorKind::InvalidInput, format!("not a local file: {uri}")))
	}
}

#[async_trait]
impl FileSystem for LocalFileSystem {
	async fn read(&self, uri: &Url) -> io::Result<Vec<u8>> {
		tokio::fs::read(Self::path(uri)?).await
	}

	async fn write(&self, uri: &Url, data: &[u8]) -> io::Result<()> {
		let path = Self::path(uri)?;
		if let Some(parent) = path.parent() {
			tokio::fs::create_dir_all(parent).await?;
		}
		tokio::fs::write(path, data).await
	}

	async fn delete(&self, uri: &Url) -> io::Result<()> {
		tokio::fs::remove_file(Self::path(uri)?).await
	}

	fn is_writable(&self, uri: &Url) -> bool {
		uri.scheme() == "file"
	}
}
