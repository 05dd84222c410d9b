//! Shell user interface seam.

use std::sync::Arc;

use async_trait::async_trait;
use pixbridge_rpc::UserNotifier;

/// Dialogs the shell can show on behalf of a viewer.
#[async_trait]
pub trait HostUi: Send + Sync + 'static {
	/// Asks for a line of text. `None` when dismissed.
	async fn input_box(&self, prompt: &str) -> Option<String>;

	/// Shows an error message.
	fn show_error(&self, message: &str);
}

/// Routes bridge-level failures nobody awaits to the shell UI.
pub(crate) struct UiNotifier(pub Arc<dyn HostUi>);

impl UserNotifier for UiNotifier {
	fn show_error(&self, message: &str) {
		self.0.show_error(message);
	}
}
