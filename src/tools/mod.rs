//! Black-box collaborators of the pipeline: external commands, the
//! third-party resolver, notifications and live reload.

mod dependencies;
mod external_tool;
mod live_reload;
mod notifier;
mod shell;

pub use dependencies::DependencyResolver;
pub use external_tool::{ExternalTool, ToolError};
pub use live_reload::{LiveReload, LiveReloadError};
#[cfg(test)]
pub use notifier::testing;
pub use notifier::{Notification, Notifier, TerminalNotifier};
