//! Seams for the external collaborators: the host document editor, the
//! modal subsystem, and the login session store. Each has a `Missing*`
//! fallback so a controller can be assembled before the host wires in its
//! real implementations.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::Value;
use shared::{
    domain::{CellId, CellSnapshot},
    protocol::{DocumentMetadata, MethodSpec},
};
use tokio::sync::oneshot;
use tracing::warn;

/// Handle to a freshly inserted managed cell. `ready` resolves once the
/// embedded widget has finished its asynchronous initialization; the
/// controller must not inject parameters before then.
#[derive(Debug)]
pub struct InsertedMethodCell {
    pub cell: CellSnapshot,
    pub ready: oneshot::Receiver<()>,
}

/// The notebook-style document editor. All calls run on the single UI
/// task and must not block.
pub trait NotebookHost: Send + Sync {
    fn metadata(&self) -> DocumentMetadata;
    fn selected_cell(&self) -> Option<CellSnapshot>;
    fn show_cell_toolbar(&self, cell: CellId);
    fn hide_cell_toolbar(&self, cell: CellId);
    fn hide_all_toolbars(&self);
    /// Global keyboard-shortcut capture. Disabled while a managed cell is
    /// selected so keystrokes reach the embedded widget.
    fn set_keyboard_capture(&self, enabled: bool);
    fn set_autosave_interval(&self, seconds: u32);
    fn save_checkpoint(&self);
    fn select_cell(&self, cell: CellId);
    fn insert_method_cell(&self, spec: &MethodSpec) -> Result<InsertedMethodCell>;
    fn load_widget_state(&self, cell: CellId, parameters: &Value) -> Result<()>;
    fn run_widget(&self, cell: CellId) -> Result<()>;
    fn reload_page(&self);
}

pub struct MissingNotebookHost;

impl NotebookHost for MissingNotebookHost {
    fn metadata(&self) -> DocumentMetadata {
        DocumentMetadata::default()
    }

    fn selected_cell(&self) -> Option<CellSnapshot> {
        None
    }

    fn show_cell_toolbar(&self, _cell: CellId) {}

    fn hide_cell_toolbar(&self, _cell: CellId) {}

    fn hide_all_toolbars(&self) {}

    fn set_keyboard_capture(&self, _enabled: bool) {}

    fn set_autosave_interval(&self, _seconds: u32) {}

    fn save_checkpoint(&self) {}

    fn select_cell(&self, _cell: CellId) {}

    fn insert_method_cell(&self, _spec: &MethodSpec) -> Result<InsertedMethodCell> {
        Err(anyhow!("notebook host is unavailable"))
    }

    fn load_widget_state(&self, cell: CellId, _parameters: &Value) -> Result<()> {
        Err(anyhow!("notebook host is unavailable for cell {}", cell.0))
    }

    fn run_widget(&self, cell: CellId) -> Result<()> {
        Err(anyhow!("notebook host is unavailable for cell {}", cell.0))
    }

    fn reload_page(&self) {}
}

/// The modal/dialog subsystem used to surface errors and confirmations.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Blocking modal with a single dismiss control.
    async fn alert(&self, title: &str, body: &str);
    /// Yes/No confirmation; returns true when the user accepts.
    async fn confirm(&self, title: &str, body: &str) -> bool;
}

pub struct MissingNotificationSink;

#[async_trait]
impl NotificationSink for MissingNotificationSink {
    async fn alert(&self, title: &str, body: &str) {
        warn!(title, body, "notification sink is unavailable; alert dropped");
    }

    async fn confirm(&self, title: &str, _body: &str) -> bool {
        warn!(title, "notification sink is unavailable; confirmation declined");
        false
    }
}

/// Login session storage owned by the host environment.
pub trait AuthSession: Send + Sync {
    fn user_id(&self) -> Option<String>;
    fn token(&self) -> Option<String>;
}

pub struct AnonymousSession;

impl AuthSession for AnonymousSession {
    fn user_id(&self) -> Option<String> {
        None
    }

    fn token(&self) -> Option<String> {
        None
    }
}
