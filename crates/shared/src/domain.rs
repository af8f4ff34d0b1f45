use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub i64);
    };
}

id_newtype!(WorkspaceId);
id_newtype!(ObjectId);

/// Addressable workspace/object coordinate. Owned by the data layer and
/// passed through opaquely; the controller never rewrites it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectRef {
    pub workspace_id: WorkspaceId,
    pub object_id: ObjectId,
}

impl ObjectRef {
    pub fn new(workspace_id: WorkspaceId, object_id: ObjectId) -> Self {
        Self {
            workspace_id,
            object_id,
        }
    }
}

impl std::fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.workspace_id.0, self.object_id.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellId(pub Uuid);

impl CellId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CellId {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellKind {
    Code,
    Markdown,
    Method,
    Output,
}

impl CellKind {
    /// Managed cells carry their own chrome and input widgets; the host
    /// toolbar and global keyboard shortcuts stay out of their way.
    pub fn is_managed(self) -> bool {
        matches!(self, CellKind::Method | CellKind::Output)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KernelStatus {
    Idle,
    Busy,
}

/// Identity and kind of one document cell as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellSnapshot {
    pub cell_id: CellId,
    pub kind: CellKind,
}

impl CellSnapshot {
    pub fn new(cell_id: CellId, kind: CellKind) -> Self {
        Self { cell_id, kind }
    }
}
