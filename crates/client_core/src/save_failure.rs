//! Translation of host save rejections into user-facing messages.

use std::sync::OnceLock;

use regex::Regex;

use crate::{
    events::SaveFailure,
    settings::format_size,
};

const STATUS_PAYLOAD_TOO_LARGE: u16 = 413;

/// Matches the workspace backend's permission denial, e.g.
/// `User alice may not write to workspace 8472`. The backend renders this
/// inside an HTML error page whose format is not under our control; the
/// raw-text fallback below must stay intact.
fn permission_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"User\s+(\w+)\s+may\s+not\s+write\s+to\s+workspace\s+(\d+)")
            .expect("permission pattern compiles")
    })
}

/// Best-effort pull of the headline out of the backend's HTML error page.
fn error_heading_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?is)<[^>]*id="error-message"[^>]*>.*?<h3[^>]*>\s*(.*?)\s*</h3>"#)
            .expect("error heading pattern compiles")
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveFailureKind {
    SizeLimitExceeded,
    PermissionDenied { user: String, workspace: String },
    Server,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedSaveFailure {
    pub kind: SaveFailureKind,
    pub message: String,
}

pub fn classify_save_failure(failure: &SaveFailure, max_size_bytes: u64) -> ClassifiedSaveFailure {
    if failure.status == Some(STATUS_PAYLOAD_TOO_LARGE) {
        return ClassifiedSaveFailure {
            kind: SaveFailureKind::SizeLimitExceeded,
            message: format!(
                "Due to current system constraints, a document may not exceed {} of text. \
                 Errors of this sort are usually due to excessive size of outputs from code \
                 cells, or from large objects embedded in markdown cells. Please decrease \
                 the document size and try to save again.",
                format_size(max_size_bytes)
            ),
        };
    }

    let body = failure.body.as_deref().map(str::trim).unwrap_or_default();
    if body.is_empty() {
        return ClassifiedSaveFailure {
            kind: SaveFailureKind::Unknown,
            message: "An unknown error occurred!".to_string(),
        };
    }

    let error_text = extract_error_text(body);
    if let Some(captures) = permission_pattern().captures(&error_text) {
        let user = captures[1].to_string();
        let workspace = captures[2].to_string();
        return ClassifiedSaveFailure {
            message: format!(
                "User {user} does not have permission to save to workspace {workspace}."
            ),
            kind: SaveFailureKind::PermissionDenied { user, workspace },
        };
    }

    ClassifiedSaveFailure {
        kind: SaveFailureKind::Server,
        message: error_text,
    }
}

fn extract_error_text(body: &str) -> String {
    if let Some(captures) = error_heading_pattern().captures(body) {
        let heading = captures[1].trim();
        if !heading.is_empty() {
            return heading.to_string();
        }
    }
    body.to_string()
}
