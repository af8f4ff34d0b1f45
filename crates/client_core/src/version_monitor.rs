//! Release monitoring and the upgrade-and-shutdown workflow.

use std::{sync::Arc, time::Duration};

use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
};
use tracing::{info, warn};

use crate::{
    events::ControllerEvent,
    service::WorkbenchService,
    settings::Settings,
    traits::{AuthSession, NotebookHost, NotificationSink},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionState {
    Unchecked,
    UpToDate,
    UpdateAvailable { latest: String },
}

pub struct VersionMonitor {
    service: Arc<dyn WorkbenchService>,
    sink: Arc<dyn NotificationSink>,
    host: Arc<dyn NotebookHost>,
    auth: Arc<dyn AuthSession>,
    events: broadcast::Sender<ControllerEvent>,
    current_version: String,
    reload_delay: Duration,
    recheck_every: Option<Duration>,
    state: Mutex<VersionState>,
    recheck_task: Mutex<Option<JoinHandle<()>>>,
}

impl VersionMonitor {
    pub fn new(
        service: Arc<dyn WorkbenchService>,
        sink: Arc<dyn NotificationSink>,
        host: Arc<dyn NotebookHost>,
        auth: Arc<dyn AuthSession>,
        events: broadcast::Sender<ControllerEvent>,
        settings: &Settings,
    ) -> Self {
        Self {
            service,
            sink,
            host,
            auth,
            events,
            current_version: settings.version_tag.clone(),
            reload_delay: Duration::from_millis(settings.reload_delay_ms),
            recheck_every: settings
                .version_recheck_minutes
                .map(|minutes| Duration::from_secs(minutes * 60)),
            state: Mutex::new(VersionState::Unchecked),
            recheck_task: Mutex::new(None),
        }
    }

    pub async fn state(&self) -> VersionState {
        self.state.lock().await.clone()
    }

    /// One probe against the release endpoint. A tag differing from the
    /// running version reveals the update affordance exactly once;
    /// transport failures are diagnostic-only and leave the state as it
    /// was. No retry is scheduled here.
    pub async fn check_for_update(&self) {
        match self.service.fetch_version().await {
            Ok(info) => {
                let mut state = self.state.lock().await;
                if info.version == self.current_version {
                    *state = VersionState::UpToDate;
                    return;
                }
                let already_revealed = matches!(
                    &*state,
                    VersionState::UpdateAvailable { latest } if *latest == info.version
                );
                *state = VersionState::UpdateAvailable {
                    latest: info.version.clone(),
                };
                if !already_revealed {
                    info!(latest = %info.version, "newer release available");
                    let _ = self.events.send(ControllerEvent::UpdateAvailable {
                        latest: info.version,
                    });
                }
            }
            Err(err) => {
                warn!("unable to check for a version update: {err:#}");
            }
        }
    }

    /// Periodic re-checking is designed in but off unless configured.
    pub async fn start_periodic_recheck(self: &Arc<Self>) {
        let Some(every) = self.recheck_every else {
            return;
        };
        let monitor = Arc::clone(self);
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            // the startup check already covered "now"
            ticker.tick().await;
            loop {
                ticker.tick().await;
                monitor.check_for_update().await;
            }
        });
        if let Some(previous) = self.recheck_task.lock().await.replace(task) {
            previous.abort();
        }
    }

    /// Terminates the backing session for the signed-in user, then
    /// schedules a full page reload after a short settle delay. On
    /// failure the status code and error text are surfaced and nothing
    /// is reloaded or retried.
    pub async fn perform_upgrade(&self) {
        let Some(user_id) = self.auth.user_id() else {
            self.sink
                .alert(
                    "Unable to update your session",
                    "No signed-in user was found for this session.",
                )
                .await;
            return;
        };

        match self.service.shutdown_session(&user_id).await {
            Ok(()) => {
                tokio::time::sleep(self.reload_delay).await;
                self.host.reload_page();
            }
            Err(err) => {
                self.sink
                    .alert(
                        "Unable to update your session",
                        &format!("Error: {err}"),
                    )
                    .await;
            }
        }
    }

    pub async fn shutdown(&self) {
        if let Some(task) = self.recheck_task.lock().await.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
#[path = "tests/version_monitor_tests.rs"]
mod tests;
