//! One renderable record with an optional asynchronous "copy into target
//! workspace" action behind a conflict confirmation.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use shared::{domain::ObjectRef, protocol::CopyObjectParams};
use tokio::sync::{broadcast, Mutex};
use tracing::error;

use crate::{
    events::ControllerEvent,
    service::WorkbenchService,
    traits::NotificationSink,
};

const ELLIPSIS: &str = "...";
const PERMISSION_DENIED_MARKER: &str = "may not write to workspace";

/// Describes one renderable record. `target_workspace: None` makes the
/// card display-only; the copy action stays disabled.
#[derive(Debug, Clone)]
pub struct ActionCardEntry {
    pub source_ref: ObjectRef,
    pub target_workspace: Option<String>,
    pub display_name: String,
    pub version: Option<String>,
    pub type_name: String,
    pub edited_by: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub is_set: bool,
    pub max_name_length: Option<usize>,
}

/// Data-type icon marker handed to the layout renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataIcon {
    pub type_name: String,
    pub is_set: bool,
}

/// Visual structure handed to the out-of-scope layout renderer. Same
/// entry in, same view out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardView {
    pub title: String,
    /// Untruncated name, attached only when the title was shortened.
    pub tooltip: Option<String>,
    pub version: Option<String>,
    pub type_label: String,
    pub edited_by: Option<String>,
    pub timestamp: Option<String>,
    pub icon: DataIcon,
    pub action_enabled: bool,
}

/// Copy progress for one card. An explicit field, never inferred from
/// whatever label the renderer last painted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyState {
    Idle,
    Requesting,
    Succeeded,
    Conflict,
    Failed,
}

pub fn render(entry: &ActionCardEntry) -> CardView {
    let (title, shortened) = shorten_name(&entry.display_name, entry.max_name_length);
    CardView {
        title,
        tooltip: shortened.then(|| entry.display_name.clone()),
        version: entry.version.clone(),
        type_label: entry.type_name.clone(),
        edited_by: entry.edited_by.clone(),
        timestamp: entry
            .timestamp
            .map(|ts| ts.format("%Y-%m-%d %H:%M").to_string()),
        icon: DataIcon {
            type_name: entry.type_name.clone(),
            is_set: entry.is_set,
        },
        action_enabled: entry.target_workspace.is_some(),
    }
}

fn shorten_name(name: &str, max_len: Option<usize>) -> (String, bool) {
    let Some(max_len) = max_len else {
        return (name.to_string(), false);
    };
    if name.chars().count() <= max_len {
        return (name.to_string(), false);
    }
    let keep = max_len.saturating_sub(ELLIPSIS.len());
    let mut shortened: String = name.chars().take(keep).collect();
    shortened.push_str(ELLIPSIS);
    (shortened, true)
}

pub struct ActionCard {
    entry: ActionCardEntry,
    service: Arc<dyn WorkbenchService>,
    sink: Arc<dyn NotificationSink>,
    events: broadcast::Sender<ControllerEvent>,
    state: Mutex<CopyState>,
}

impl ActionCard {
    pub fn new(
        entry: ActionCardEntry,
        service: Arc<dyn WorkbenchService>,
        sink: Arc<dyn NotificationSink>,
        events: broadcast::Sender<ControllerEvent>,
    ) -> Self {
        Self {
            entry,
            service,
            sink,
            events,
            state: Mutex::new(CopyState::Idle),
        }
    }

    pub fn entry(&self) -> &ActionCardEntry {
        &self.entry
    }

    pub fn render(&self) -> CardView {
        render(&self.entry)
    }

    pub async fn state(&self) -> CopyState {
        *self.state.lock().await
    }

    /// The renderer swaps the action control for a loading indicator
    /// while this holds.
    pub async fn is_busy(&self) -> bool {
        matches!(
            *self.state.lock().await,
            CopyState::Requesting | CopyState::Conflict
        )
    }

    /// Runs the copy action. No-op for display-only cards and while a
    /// request is already in flight. A card whose previous copy completed
    /// asks for confirmation first; declining issues no call and leaves
    /// the completed marker in place.
    pub async fn trigger_copy(&self) {
        let Some(target_workspace) = self.entry.target_workspace.clone() else {
            return;
        };

        let needs_confirmation = {
            let mut state = self.state.lock().await;
            match *state {
                CopyState::Requesting | CopyState::Conflict => return,
                CopyState::Succeeded => {
                    *state = CopyState::Conflict;
                    true
                }
                CopyState::Idle | CopyState::Failed => {
                    *state = CopyState::Requesting;
                    false
                }
            }
        };

        if needs_confirmation {
            let accepted = self
                .sink
                .confirm(
                    "Item already exists in workspace under same name.",
                    "Do you want to override the existing copy?",
                )
                .await;
            let mut state = self.state.lock().await;
            if !accepted {
                *state = CopyState::Succeeded;
                return;
            }
            *state = CopyState::Requesting;
        }

        let params = CopyObjectParams {
            source_ref: self.entry.source_ref,
            target_workspace,
        };
        match self.service.copy_object(&params).await {
            Ok(()) => {
                *self.state.lock().await = CopyState::Succeeded;
                let _ = self.events.send(ControllerEvent::DataListChanged);
            }
            Err(err) => {
                *self.state.lock().await = CopyState::Failed;
                let message = match err.message() {
                    Some(message) if message.contains(PERMISSION_DENIED_MARKER) => {
                        "Error: you do not have permission to add data to this workspace."
                            .to_string()
                    }
                    Some(message) => format!("Error: {message}"),
                    None => "Unknown error!".to_string(),
                };
                error!(source_ref = %self.entry.source_ref, "object copy failed: {message}");
                let _ = self.events.send(ControllerEvent::CopyFailed {
                    source_ref: self.entry.source_ref,
                    message,
                });
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/action_card_tests.rs"]
mod tests;
