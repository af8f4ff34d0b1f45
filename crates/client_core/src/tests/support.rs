//! Shared trait doubles for controller, card, and monitor tests.

use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::Value;
use shared::{
    domain::{CellId, CellKind, CellSnapshot},
    protocol::{CopyObjectParams, DocumentMetadata, MethodSpec, UserProfile, VersionInfo},
};
use tokio::sync::{oneshot, Notify};

use crate::{
    service::{CopyError, ShutdownError, WorkbenchService},
    traits::{AuthSession, InsertedMethodCell, NotebookHost, NotificationSink},
};

pub fn cell(kind: CellKind) -> CellSnapshot {
    CellSnapshot::new(CellId::new(), kind)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyBehavior {
    Immediately,
    Never,
    DropSignal,
}

pub struct RecordingHost {
    pub metadata: Mutex<DocumentMetadata>,
    pub host_selection: Mutex<Option<CellSnapshot>>,
    pub visible_toolbars: Mutex<HashSet<CellId>>,
    pub keyboard_capture: Mutex<bool>,
    pub autosave_intervals: Mutex<Vec<u32>>,
    pub checkpoint_saves: AtomicUsize,
    pub inserted_methods: Mutex<Vec<String>>,
    pub ready_behavior: Mutex<ReadyBehavior>,
    pub held_ready_signals: Mutex<Vec<oneshot::Sender<()>>>,
    pub loaded_states: Mutex<Vec<(CellId, Value)>>,
    pub run_cells: Mutex<Vec<CellId>>,
    pub selected_cells: Mutex<Vec<CellId>>,
    pub reloads: AtomicUsize,
}

impl RecordingHost {
    pub fn new(metadata: DocumentMetadata) -> Arc<Self> {
        Arc::new(Self {
            metadata: Mutex::new(metadata),
            host_selection: Mutex::new(None),
            visible_toolbars: Mutex::new(HashSet::new()),
            keyboard_capture: Mutex::new(true),
            autosave_intervals: Mutex::new(Vec::new()),
            checkpoint_saves: AtomicUsize::new(0),
            inserted_methods: Mutex::new(Vec::new()),
            ready_behavior: Mutex::new(ReadyBehavior::Immediately),
            held_ready_signals: Mutex::new(Vec::new()),
            loaded_states: Mutex::new(Vec::new()),
            run_cells: Mutex::new(Vec::new()),
            selected_cells: Mutex::new(Vec::new()),
            reloads: AtomicUsize::new(0),
        })
    }

    pub fn set_host_selection(&self, cell: Option<CellSnapshot>) {
        *self.host_selection.lock().expect("lock") = cell;
    }

    pub fn set_ready_behavior(&self, behavior: ReadyBehavior) {
        *self.ready_behavior.lock().expect("lock") = behavior;
    }

    pub fn visible_toolbar_count(&self) -> usize {
        self.visible_toolbars.lock().expect("lock").len()
    }

    pub fn toolbar_visible(&self, cell: CellId) -> bool {
        self.visible_toolbars.lock().expect("lock").contains(&cell)
    }

    pub fn keyboard_capture_enabled(&self) -> bool {
        *self.keyboard_capture.lock().expect("lock")
    }

    pub fn inserted_count(&self) -> usize {
        self.inserted_methods.lock().expect("lock").len()
    }
}

impl NotebookHost for RecordingHost {
    fn metadata(&self) -> DocumentMetadata {
        self.metadata.lock().expect("lock").clone()
    }

    fn selected_cell(&self) -> Option<CellSnapshot> {
        *self.host_selection.lock().expect("lock")
    }

    fn show_cell_toolbar(&self, cell: CellId) {
        self.visible_toolbars.lock().expect("lock").insert(cell);
    }

    fn hide_cell_toolbar(&self, cell: CellId) {
        self.visible_toolbars.lock().expect("lock").remove(&cell);
    }

    fn hide_all_toolbars(&self) {
        self.visible_toolbars.lock().expect("lock").clear();
    }

    fn set_keyboard_capture(&self, enabled: bool) {
        *self.keyboard_capture.lock().expect("lock") = enabled;
    }

    fn set_autosave_interval(&self, seconds: u32) {
        self.autosave_intervals.lock().expect("lock").push(seconds);
    }

    fn save_checkpoint(&self) {
        self.checkpoint_saves.fetch_add(1, Ordering::SeqCst);
    }

    fn select_cell(&self, cell: CellId) {
        self.selected_cells.lock().expect("lock").push(cell);
    }

    fn insert_method_cell(&self, spec: &MethodSpec) -> Result<InsertedMethodCell> {
        self.inserted_methods
            .lock()
            .expect("lock")
            .push(spec.method_id.clone());
        let snapshot = cell(CellKind::Method);
        self.set_host_selection(Some(snapshot));

        let (tx, rx) = oneshot::channel();
        match *self.ready_behavior.lock().expect("lock") {
            ReadyBehavior::Immediately => {
                let _ = tx.send(());
            }
            ReadyBehavior::Never => {
                self.held_ready_signals.lock().expect("lock").push(tx);
            }
            ReadyBehavior::DropSignal => drop(tx),
        }
        Ok(InsertedMethodCell {
            cell: snapshot,
            ready: rx,
        })
    }

    fn load_widget_state(&self, cell: CellId, parameters: &Value) -> Result<()> {
        self.loaded_states
            .lock()
            .expect("lock")
            .push((cell, parameters.clone()));
        Ok(())
    }

    fn run_widget(&self, cell: CellId) -> Result<()> {
        self.run_cells.lock().expect("lock").push(cell);
        Ok(())
    }

    fn reload_page(&self) {
        self.reloads.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct RecordingSink {
    pub alerts: Mutex<Vec<(String, String)>>,
    pub confirm_answers: Mutex<Vec<bool>>,
    pub confirm_calls: AtomicUsize,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            alerts: Mutex::new(Vec::new()),
            confirm_answers: Mutex::new(Vec::new()),
            confirm_calls: AtomicUsize::new(0),
        })
    }

    /// Queues the answer returned by the next `confirm` call.
    pub fn push_confirm_answer(&self, answer: bool) {
        self.confirm_answers.lock().expect("lock").push(answer);
    }

    pub fn alert_count(&self) -> usize {
        self.alerts.lock().expect("lock").len()
    }

    pub fn last_alert(&self) -> Option<(String, String)> {
        self.alerts.lock().expect("lock").last().cloned()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn alert(&self, title: &str, body: &str) {
        self.alerts
            .lock()
            .expect("lock")
            .push((title.to_string(), body.to_string()));
    }

    async fn confirm(&self, _title: &str, _body: &str) -> bool {
        self.confirm_calls.fetch_add(1, Ordering::SeqCst);
        let mut answers = self.confirm_answers.lock().expect("lock");
        if answers.is_empty() {
            false
        } else {
            answers.remove(0)
        }
    }
}

#[derive(Debug, Clone)]
pub enum ScriptedCopy {
    Ok,
    Api(String),
    Transport(String),
}

#[derive(Debug, Clone)]
pub enum ScriptedShutdown {
    Ok,
    Rejected { status: u16, message: String },
    Transport(String),
}

pub struct RecordingService {
    pub version_response: Mutex<Result<VersionInfo, String>>,
    pub version_probes: AtomicUsize,
    pub copy_response: Mutex<ScriptedCopy>,
    pub copy_calls: Mutex<Vec<CopyObjectParams>>,
    /// When set, `copy_object` parks until the gate is notified.
    pub copy_gate: Mutex<Option<Arc<Notify>>>,
    pub shutdown_response: Mutex<ScriptedShutdown>,
    pub shutdown_calls: Mutex<Vec<String>>,
    pub method_specs: Mutex<HashMap<String, MethodSpec>>,
    pub spec_lookup_fails: Mutex<Option<String>>,
    pub profiles: Mutex<HashMap<String, UserProfile>>,
}

impl RecordingService {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            version_response: Mutex::new(Err("no version scripted".to_string())),
            version_probes: AtomicUsize::new(0),
            copy_response: Mutex::new(ScriptedCopy::Ok),
            copy_calls: Mutex::new(Vec::new()),
            copy_gate: Mutex::new(None),
            shutdown_response: Mutex::new(ScriptedShutdown::Ok),
            shutdown_calls: Mutex::new(Vec::new()),
            method_specs: Mutex::new(HashMap::new()),
            spec_lookup_fails: Mutex::new(None),
            profiles: Mutex::new(HashMap::new()),
        })
    }

    pub fn set_version(&self, tag: &str) {
        *self.version_response.lock().expect("lock") = Ok(VersionInfo {
            version: tag.to_string(),
        });
    }

    pub fn set_version_failure(&self, message: &str) {
        *self.version_response.lock().expect("lock") = Err(message.to_string());
    }

    pub fn set_copy_response(&self, response: ScriptedCopy) {
        *self.copy_response.lock().expect("lock") = response;
    }

    pub fn set_copy_gate(&self, gate: Arc<Notify>) {
        *self.copy_gate.lock().expect("lock") = Some(gate);
    }

    pub fn set_shutdown_response(&self, response: ScriptedShutdown) {
        *self.shutdown_response.lock().expect("lock") = response;
    }

    pub fn add_method_spec(&self, method_id: &str, title: &str) {
        self.method_specs.lock().expect("lock").insert(
            method_id.to_string(),
            MethodSpec {
                method_id: method_id.to_string(),
                title: title.to_string(),
                behavior: Value::Null,
            },
        );
    }

    pub fn copy_call_count(&self) -> usize {
        self.copy_calls.lock().expect("lock").len()
    }
}

#[async_trait]
impl WorkbenchService for RecordingService {
    async fn fetch_version(&self) -> Result<VersionInfo> {
        self.version_probes.fetch_add(1, Ordering::SeqCst);
        self.version_response
            .lock()
            .expect("lock")
            .clone()
            .map_err(|message| anyhow!(message))
    }

    async fn shutdown_session(&self, user_id: &str) -> Result<(), ShutdownError> {
        self.shutdown_calls
            .lock()
            .expect("lock")
            .push(user_id.to_string());
        match self.shutdown_response.lock().expect("lock").clone() {
            ScriptedShutdown::Ok => Ok(()),
            ScriptedShutdown::Rejected { status, message } => {
                Err(ShutdownError::Rejected { status, message })
            }
            ScriptedShutdown::Transport(message) => Err(ShutdownError::Transport(message)),
        }
    }

    async fn copy_object(&self, params: &CopyObjectParams) -> Result<(), CopyError> {
        let gate = self.copy_gate.lock().expect("lock").clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.copy_calls.lock().expect("lock").push(params.clone());
        match self.copy_response.lock().expect("lock").clone() {
            ScriptedCopy::Ok => Ok(()),
            ScriptedCopy::Api(message) => Err(CopyError::Api(shared::error::ApiException::new(
                shared::error::ErrorCode::Internal,
                message,
            ))),
            ScriptedCopy::Transport(message) => Err(CopyError::Transport(message)),
        }
    }

    async fn fetch_method_specs(
        &self,
        method_ids: &[String],
    ) -> Result<HashMap<String, MethodSpec>> {
        if let Some(message) = self.spec_lookup_fails.lock().expect("lock").clone() {
            return Err(anyhow!(message));
        }
        let specs = self.method_specs.lock().expect("lock");
        Ok(method_ids
            .iter()
            .filter_map(|id| specs.get(id).map(|spec| (id.clone(), spec.clone())))
            .collect())
    }

    async fn fetch_user_profile(
        &self,
        username: &str,
        _token: Option<&str>,
    ) -> Result<Option<UserProfile>> {
        Ok(self.profiles.lock().expect("lock").get(username).cloned())
    }
}

pub struct StaticAuth {
    pub user: Option<String>,
    pub session_token: Option<String>,
}

impl StaticAuth {
    pub fn signed_in(user: &str) -> Arc<Self> {
        Arc::new(Self {
            user: Some(user.to_string()),
            session_token: Some("test-token".to_string()),
        })
    }

    pub fn anonymous() -> Arc<Self> {
        Arc::new(Self {
            user: None,
            session_token: None,
        })
    }
}

impl AuthSession for StaticAuth {
    fn user_id(&self) -> Option<String> {
        self.user.clone()
    }

    fn token(&self) -> Option<String> {
        self.session_token.clone()
    }
}
