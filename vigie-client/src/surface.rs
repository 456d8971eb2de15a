//! Desktop surface driven by the notification gateway
//!
//! The gateway only knows the [`ClientSurface`] seam: enumerate open
//! dashboard windows, focus one, or open a new one. The production
//! implementation runs configured commands with `{url}`/`{id}` placeholders,
//! the way the rest of the system delegates host actions to commands.

use crate::config::SurfaceConfig;
use parking_lot::Mutex;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

/// One open dashboard window known to the surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowRef {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("no open command configured")]
    MissingOpenCommand,
    #[error("unknown window: {0}")]
    UnknownWindow(String),
    #[error("malformed command template: {0}")]
    BadTemplate(String),
    #[error("command failed: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Seam between the gateway and whatever hosts the dashboard views.
pub trait ClientSurface: Send + Sync {
    /// Currently open dashboard windows, in opening order.
    fn list_windows(&self) -> Vec<WindowRef>;
    fn focus(&self, id: &str) -> Result<(), SurfaceError>;
    fn open_window(&self, url: &str) -> Result<(), SurfaceError>;
}

/// Drives the operator's desktop through configured commands. Only windows
/// opened through this surface are enumerable; richer hosts can provide a
/// real enumeration behind the same trait.
pub struct CommandSurface {
    open_command: Option<String>,
    focus_command: Option<String>,
    roster: Mutex<Vec<WindowRef>>,
}

impl CommandSurface {
    pub fn new(config: SurfaceConfig) -> Self {
        Self {
            open_command: config.open_command,
            focus_command: config.focus_command,
            roster: Mutex::new(Vec::new()),
        }
    }

    fn run_template(template: &str, url: &str, id: &str) -> Result<(), SurfaceError> {
        let rendered = template.replace("{url}", url).replace("{id}", id);
        let parts = shell_words::split(&rendered)
            .map_err(|e| SurfaceError::BadTemplate(e.to_string()))?;
        let Some((program, args)) = parts.split_first() else {
            return Err(SurfaceError::BadTemplate("empty command".into()));
        };
        debug!("surface command: {rendered}");
        std::process::Command::new(program).args(args).spawn()?;
        Ok(())
    }
}

impl ClientSurface for CommandSurface {
    fn list_windows(&self) -> Vec<WindowRef> {
        self.roster.lock().clone()
    }

    fn focus(&self, id: &str) -> Result<(), SurfaceError> {
        let window = self
            .roster
            .lock()
            .iter()
            .find(|window| window.id == id)
            .cloned()
            .ok_or_else(|| SurfaceError::UnknownWindow(id.to_string()))?;

        // without a dedicated focus command, re-opening the URL raises the
        // existing browser tab with every common opener
        let template = self
            .focus_command
            .as_deref()
            .or(self.open_command.as_deref())
            .ok_or(SurfaceError::MissingOpenCommand)?;
        Self::run_template(template, &window.url, &window.id)
    }

    fn open_window(&self, url: &str) -> Result<(), SurfaceError> {
        let template = self
            .open_command
            .as_deref()
            .ok_or(SurfaceError::MissingOpenCommand)?;
        let id = Uuid::new_v4().to_string();
        Self::run_template(template, url, &id)?;
        self.roster.lock().push(WindowRef {
            id,
            url: url.to_string(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn surface_with(open: Option<&str>, focus: Option<&str>) -> CommandSurface {
        CommandSurface::new(SurfaceConfig {
            open_command: open.map(str::to_string),
            focus_command: focus.map(str::to_string),
        })
    }

    #[test]
    fn open_records_the_window() {
        let surface = surface_with(Some("true {url}"), None);
        surface.open_window("http://localhost:8080/tasks").unwrap();

        let windows = surface.list_windows();
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].url, "http://localhost:8080/tasks");
        assert!(!windows[0].id.is_empty());
    }

    #[test]
    fn focus_known_window_uses_fallback_open_command() {
        let surface = surface_with(Some("true {url}"), None);
        surface.open_window("http://localhost:8080/").unwrap();
        let id = surface.list_windows()[0].id.clone();

        surface.focus(&id).unwrap();
    }

    #[test]
    fn focus_unknown_window_is_an_error() {
        let surface = surface_with(Some("true {url}"), None);
        assert!(matches!(
            surface.focus("nope"),
            Err(SurfaceError::UnknownWindow(_))
        ));
    }

    #[test]
    fn missing_open_command_is_an_error() {
        let surface = surface_with(None, None);
        assert!(matches!(
            surface.open_window("http://localhost:8080/"),
            Err(SurfaceError::MissingOpenCommand)
        ));
        assert!(surface.list_windows().is_empty());
    }

    #[test]
    fn empty_template_is_rejected() {
        let surface = surface_with(Some("   "), None);
        assert!(matches!(
            surface.open_window("http://localhost:8080/"),
            Err(SurfaceError::BadTemplate(_))
        ));
    }
}
