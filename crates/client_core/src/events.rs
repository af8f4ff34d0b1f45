//! Host lifecycle intake and controller event fan-out.

use shared::domain::{CellSnapshot, KernelStatus, ObjectRef};

/// Document-lifecycle events the host editor delivers over the
/// controller's intake channel.
#[derive(Debug, Clone)]
pub enum HostEvent {
    KernelStatus(KernelStatus),
    CellSelected(CellSnapshot),
    CellCreated(CellSnapshot),
    CellDeleted,
    SaveFailed(SaveFailure),
}

/// Raw detail the host reports when a document save is rejected.
#[derive(Debug, Clone, Default)]
pub struct SaveFailure {
    pub status: Option<u16>,
    pub body: Option<String>,
}

impl SaveFailure {
    pub fn from_status(status: u16) -> Self {
        Self {
            status: Some(status),
            body: None,
        }
    }

    pub fn with_body(status: u16, body: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            body: Some(body.into()),
        }
    }
}

/// Events fanned out to dependent views over the controller's broadcast
/// channel.
#[derive(Debug, Clone)]
pub enum ControllerEvent {
    KernelStatus(KernelStatus),
    UpdateAvailable {
        latest: String,
    },
    /// A copy landed in the target workspace; data panels should refresh.
    DataListChanged,
    CopyFailed {
        source_ref: ObjectRef,
        message: String,
    },
    MethodLaunchFailed {
        method_id: String,
        reason: String,
    },
    CreatorResolved {
        display_name: String,
    },
}
