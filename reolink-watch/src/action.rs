//! External command run for each emitted event

use std::process::{Command, Stdio};

use crate::error::ActionError;
use crate::event::Event;

/// A shell command template with `{type}`, `{action}` and `{timestamp}` placeholders
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionTemplate {
    template: String,
}

impl ActionTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Substitute the event's fields into the template
    pub fn render(&self, event: &Event) -> String {
        self.template
            .replace("{type}", &event.feature)
            .replace("{action}", event.action.as_str())
            .replace("{timestamp}", &event.timestamp_rfc3339())
    }

    /// Run the rendered command through the platform shell and wait for it
    pub fn run(&self, event: &Event) -> Result<(), ActionError> {
        let command = self.render(event);
        tracing::debug!(%command, "running event action");

        let status = shell(&command)
            .stdin(Stdio::null())
            .status()
            .map_err(|source| ActionError::Spawn {
                command: command.clone(),
                source,
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(ActionError::Failed { command, status })
        }
    }
}

#[cfg(windows)]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command);
    cmd
}

#[cfg(not(windows))]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}
