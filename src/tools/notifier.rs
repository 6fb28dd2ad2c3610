use colored::Colorize;
use supports_color::Stream;
use tracing::{error, info};

use crate::ext::BestEffortPathExt;
use crate::pipeline::{Environment, StageError};

const RULE: &str = "----------------------";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Success,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: Level,
    pub title: String,
    pub message: String,
}

impl Notification {
    pub fn compiled(environment: Environment) -> Self {
        Self {
            level: Level::Success,
            title: "Scripts Compiled".to_string(),
            message: format!("Environment: {environment}"),
        }
    }

    pub fn failed(error: &StageError) -> Self {
        let file = error
            .file
            .as_deref()
            .map(|file| file.to_slash_string())
            .unwrap_or_default();
        let cause = error.cause.as_deref().unwrap_or_default();

        Self {
            level: Level::Failure,
            title: format!("{}: {}", error.kind, error.stage),
            message: format!("{RULE}\n{}\n{file}\n{RULE}\n{cause}", error.message),
        }
    }
}

/// Shows notifications to the person running the build.
pub trait Notifier {
    fn notify(&self, notification: &Notification);
}

/// Prints notifications to stderr, coloured when the terminal allows it.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&self, notification: &Notification) {
        match notification.level {
            Level::Success => info!("{}: {}", notification.title, notification.message),
            Level::Failure => error!("{}", notification.title),
        }

        let title = if supports_color::on(Stream::Stderr).is_some() {
            match notification.level {
                Level::Success => notification.title.green().bold().to_string(),
                Level::Failure => notification.title.red().bold().to_string(),
            }
        } else {
            notification.title.clone()
        };
        eprintln!("{title}\n{}", notification.message);
    }
}

#[cfg(test)]
pub mod testing {
    use std::cell::RefCell;

    use super::{Notification, Notifier};

    /// Keeps every notification for later inspection.
    #[derive(Debug, Default)]
    pub struct RecordingNotifier {
        pub notifications: RefCell<Vec<Notification>>,
    }

    impl RecordingNotifier {
        pub fn titles(&self) -> Vec<String> {
            self.notifications
                .borrow()
                .iter()
                .map(|notification| notification.title.clone())
                .collect()
        }
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, notification: &Notification) {
            self.notifications.borrow_mut().push(notification.clone());
        }
    }
}
