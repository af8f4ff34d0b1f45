use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::{ObjectRef, WorkspaceId};

/// Result of one version probe. No history is kept; each probe replaces
/// the previous result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CopyObjectParams {
    pub source_ref: ObjectRef,
    pub target_workspace: String,
}

/// Remote method specification, keyed by method id. The `behavior`
/// payload is opaque to the controller and handed to the method widget
/// unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodSpec {
    pub method_id: String,
    pub title: String,
    #[serde(default)]
    pub behavior: serde_json::Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MethodSpecResponse {
    #[serde(default)]
    pub methods: HashMap<String, MethodSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub username: String,
    #[serde(default)]
    pub full_name: Option<String>,
}

impl UserProfile {
    pub fn display_name(&self) -> String {
        match &self.full_name {
            Some(full_name) => format!("{} ({})", full_name, self.username),
            None => self.username.clone(),
        }
    }
}

/// Metadata the host document must carry. A missing workspace id is the
/// one unrecoverable startup condition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub workspace_id: Option<WorkspaceId>,
    pub creator: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}
