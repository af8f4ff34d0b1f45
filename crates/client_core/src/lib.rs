//! Front-end controller core for the workbench document editor.
//!
//! `SessionController` bootstraps a session over the host notebook,
//! tracks cell-selection and toolbar state, gates keyboard capture,
//! translates save rejections into user-facing messages, and owns the
//! version-upgrade workflow. The host editor, the modal subsystem, the
//! login store, and the remote workbench service are all reached through
//! trait seams so the controller can be driven headless.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use serde_json::Value;
use shared::{
    domain::{CellSnapshot, WorkspaceId},
    protocol::DocumentMetadata,
};
use thiserror::Error;
use tokio::{
    sync::{broadcast, mpsc, Mutex},
    task::JoinHandle,
    time::{timeout, Duration},
};
use tracing::{debug, error, warn};

pub mod action_card;
pub mod events;
pub mod save_failure;
pub mod service;
pub mod settings;
pub mod traits;
pub mod version_monitor;

pub use action_card::{ActionCard, ActionCardEntry, CardView, CopyState, DataIcon};
pub use events::{ControllerEvent, HostEvent, SaveFailure};
pub use save_failure::{classify_save_failure, ClassifiedSaveFailure, SaveFailureKind};
pub use service::{
    CopyError, HttpWorkbenchService, MissingWorkbenchService, ShutdownError, WorkbenchService,
};
pub use settings::{load_settings, SessionProperties, Settings};
pub use traits::{
    AnonymousSession, AuthSession, InsertedMethodCell, MissingNotebookHost,
    MissingNotificationSink, NotebookHost, NotificationSink,
};
pub use version_monitor::{VersionMonitor, VersionState};

const EVENT_CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Error)]
pub enum InitError {
    #[error("unable to locate a workspace id in the document metadata")]
    MissingWorkspaceId,
}

/// Per-session controller state. One instance per page load.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub workspace_id: Option<WorkspaceId>,
    pub creator: Option<String>,
    pub selected_cell: Option<CellSnapshot>,
    pub keyboard_capture: bool,
}

pub struct SessionController {
    host: Arc<dyn NotebookHost>,
    sink: Arc<dyn NotificationSink>,
    service: Arc<dyn WorkbenchService>,
    auth: Arc<dyn AuthSession>,
    settings: Settings,
    version_monitor: Arc<VersionMonitor>,
    state: Mutex<SessionState>,
    events: broadcast::Sender<ControllerEvent>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl SessionController {
    pub fn new(
        host: Arc<dyn NotebookHost>,
        sink: Arc<dyn NotificationSink>,
        service: Arc<dyn WorkbenchService>,
        auth: Arc<dyn AuthSession>,
        settings: Settings,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let version_monitor = Arc::new(VersionMonitor::new(
            Arc::clone(&service),
            Arc::clone(&sink),
            Arc::clone(&host),
            Arc::clone(&auth),
            events.clone(),
            &settings,
        ));
        Arc::new(Self {
            host,
            sink,
            service,
            auth,
            settings,
            version_monitor,
            state: Mutex::new(SessionState {
                keyboard_capture: true,
                ..SessionState::default()
            }),
            events,
            tasks: Mutex::new(Vec::new()),
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn version_monitor(&self) -> &Arc<VersionMonitor> {
        &self.version_monitor
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ControllerEvent> {
        self.events.subscribe()
    }

    pub async fn state(&self) -> SessionState {
        self.state.lock().await.clone()
    }

    /// Bootstraps the session: resolves document metadata (a missing
    /// workspace id is fatal and halts further setup), normalizes the
    /// host UI, starts the lifecycle intake task over `intake`, and
    /// kicks off the startup version check. Call once per page load.
    pub async fn initialize(
        self: &Arc<Self>,
        intake: mpsc::UnboundedReceiver<HostEvent>,
    ) -> Result<(), InitError> {
        let metadata = self.host.metadata();
        let Some(workspace_id) = metadata.workspace_id else {
            error!("unable to locate a workspace id in the document metadata");
            self.sink
                .alert(
                    "Session startup failed",
                    "Unable to locate a workspace id in the document metadata. \
                     The session cannot continue.",
                )
                .await;
            return Err(InitError::MissingWorkspaceId);
        };

        {
            let mut state = self.state.lock().await;
            state.workspace_id = Some(workspace_id);
            state.creator = metadata.creator.clone();
        }

        self.host.hide_all_toolbars();
        self.host.set_autosave_interval(0);

        let mut tasks = Vec::new();
        if let Some(task) = self.spawn_creator_lookup(&metadata) {
            tasks.push(task);
        }

        // Put the toolbar where the host's current selection is.
        let current = self.host.selected_cell();
        self.apply_selection(current).await;

        let controller = Arc::clone(self);
        tasks.push(tokio::spawn(async move {
            let mut intake = intake;
            while let Some(event) = intake.recv().await {
                controller.handle_host_event(event).await;
            }
        }));

        let monitor = Arc::clone(&self.version_monitor);
        tasks.push(tokio::spawn(async move {
            monitor.check_for_update().await;
        }));
        self.version_monitor.start_periodic_recheck().await;

        self.tasks.lock().await.extend(tasks);
        Ok(())
    }

    fn spawn_creator_lookup(&self, metadata: &DocumentMetadata) -> Option<JoinHandle<()>> {
        let creator = metadata.creator.clone()?;
        let service = Arc::clone(&self.service);
        let token = self.auth.token();
        let events = self.events.clone();
        Some(tokio::spawn(async move {
            match service.fetch_user_profile(&creator, token.as_deref()).await {
                Ok(Some(profile)) => {
                    let _ = events.send(ControllerEvent::CreatorResolved {
                        display_name: profile.display_name(),
                    });
                }
                Ok(None) => {}
                Err(err) => debug!(creator, "creator profile lookup failed: {err:#}"),
            }
        }))
    }

    pub async fn handle_host_event(&self, event: HostEvent) {
        match event {
            HostEvent::KernelStatus(status) => {
                let _ = self.events.send(ControllerEvent::KernelStatus(status));
            }
            HostEvent::CellSelected(cell) | HostEvent::CellCreated(cell) => {
                self.apply_selection(Some(cell)).await;
            }
            HostEvent::CellDeleted => {
                // Deleting the selected cell moves selection wherever the
                // host put it afterwards.
                let current = self.host.selected_cell();
                self.apply_selection(current).await;
            }
            HostEvent::SaveFailed(failure) => self.on_save_failed(failure).await,
        }
    }

    /// Single place that moves the toolbar and the keyboard gate.
    /// Invariant: at most one toolbar is visible, it belongs to the
    /// selected cell, and keyboard capture is off exactly while the
    /// selected cell is a managed kind.
    async fn apply_selection(&self, cell: Option<CellSnapshot>) {
        let mut state = self.state.lock().await;
        if let Some(previous) = state.selected_cell {
            if Some(previous.cell_id) != cell.map(|c| c.cell_id) {
                self.host.hide_cell_toolbar(previous.cell_id);
            }
        }
        state.selected_cell = cell;

        let capture = match cell {
            Some(cell) => {
                if cell.kind.is_managed() {
                    false
                } else {
                    self.host.show_cell_toolbar(cell.cell_id);
                    true
                }
            }
            None => true,
        };
        if capture != state.keyboard_capture {
            state.keyboard_capture = capture;
            self.host.set_keyboard_capture(capture);
        }
    }

    async fn on_save_failed(&self, failure: SaveFailure) {
        let classified = classify_save_failure(&failure, self.settings.max_document_size_bytes);
        warn!(kind = ?classified.kind, "document save rejected");
        self.sink
            .alert("Document save failed!", &classified.message)
            .await;
    }

    /// Triggers a checkpoint save through the host. Failures come back
    /// through the save-failure lifecycle event, not this call.
    pub fn save(&self) {
        self.host.save_checkpoint();
    }

    pub fn session_properties(&self) -> SessionProperties {
        self.settings.session_properties()
    }

    /// Inserts a managed cell for `method_id`, waits for its widget to
    /// finish asynchronous initialization, then injects `parameters` and
    /// runs it. Injection never precedes the readiness signal. An
    /// unknown method id inserts nothing and is logged only.
    pub async fn create_and_run_method(&self, method_id: &str, parameters: Value) -> Result<()> {
        let ids = vec![method_id.to_string()];
        let mut specs = match self.service.fetch_method_specs(&ids).await {
            Ok(specs) => specs,
            Err(err) => {
                warn!(method_id, "method spec lookup failed: {err:#}");
                return Ok(());
            }
        };
        let Some(spec) = specs.remove(method_id) else {
            warn!(method_id, "method not found and cannot run");
            return Ok(());
        };

        let inserted = self.host.insert_method_cell(&spec)?;
        let cell = inserted.cell;
        self.apply_selection(Some(cell)).await;

        let wait = Duration::from_secs(self.settings.widget_ready_timeout_secs);
        let ready = timeout(wait, inserted.ready).await;
        let failure = match ready {
            Ok(Ok(())) => None,
            Ok(Err(_)) => Some("widget was torn down before initialization completed".to_string()),
            Err(_) => Some(format!(
                "widget failed to initialize within {}s",
                self.settings.widget_ready_timeout_secs
            )),
        };
        if let Some(reason) = failure {
            error!(method_id, "{reason}");
            let _ = self.events.send(ControllerEvent::MethodLaunchFailed {
                method_id: method_id.to_string(),
                reason: reason.clone(),
            });
            return Err(anyhow!("method {method_id} launch failed: {reason}"));
        }

        self.host.load_widget_state(cell.cell_id, &parameters)?;
        self.host.select_cell(cell.cell_id);
        self.host.run_widget(cell.cell_id)?;
        Ok(())
    }

    /// Builds a card wired into this controller's service, modal sink,
    /// and event fan-out.
    pub fn action_card(&self, entry: ActionCardEntry) -> ActionCard {
        ActionCard::new(
            entry,
            Arc::clone(&self.service),
            Arc::clone(&self.sink),
            self.events.clone(),
        )
    }

    /// Tears down the session: the lifecycle intake and any background
    /// tasks are aborted so late completions cannot touch the UI.
    pub async fn shutdown(&self) {
        for task in self.tasks.lock().await.drain(..) {
            task.abort();
        }
        self.version_monitor.shutdown().await;
    }
}

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod test_support;

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
