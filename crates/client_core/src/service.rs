//! RemoteEndpoint contract: version probe, session shutdown, object copy,
//! method-spec lookup, and user-profile resolution.

use std::collections::HashMap;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::{
    error::{ApiError, ApiException, ErrorCode},
    protocol::{CopyObjectParams, MethodSpec, MethodSpecResponse, UserProfile, VersionInfo},
};
use thiserror::Error;
use url::Url;

use crate::settings::Settings;

#[derive(Debug, Error)]
pub enum ShutdownError {
    #[error("session shutdown rejected: {status} {message}")]
    Rejected { status: u16, message: String },
    #[error("session shutdown transport failure: {0}")]
    Transport(String),
}

#[derive(Debug, Error)]
pub enum CopyError {
    #[error(transparent)]
    Api(#[from] ApiException),
    #[error("copy transport failure: {0}")]
    Transport(String),
}

impl CopyError {
    /// The structured `message` field, when the service returned one.
    pub fn message(&self) -> Option<&str> {
        match self {
            CopyError::Api(err) => Some(&err.message),
            CopyError::Transport(_) => None,
        }
    }
}

#[async_trait]
pub trait WorkbenchService: Send + Sync {
    async fn fetch_version(&self) -> Result<VersionInfo>;
    async fn shutdown_session(&self, user_id: &str) -> Result<(), ShutdownError>;
    async fn copy_object(&self, params: &CopyObjectParams) -> Result<(), CopyError>;
    /// Absent ids are simply missing from the returned map.
    async fn fetch_method_specs(
        &self,
        method_ids: &[String],
    ) -> Result<HashMap<String, MethodSpec>>;
    async fn fetch_user_profile(
        &self,
        username: &str,
        token: Option<&str>,
    ) -> Result<Option<UserProfile>>;
}

pub struct MissingWorkbenchService;

#[async_trait]
impl WorkbenchService for MissingWorkbenchService {
    async fn fetch_version(&self) -> Result<VersionInfo> {
        Err(anyhow!("workbench service is unavailable"))
    }

    async fn shutdown_session(&self, _user_id: &str) -> Result<(), ShutdownError> {
        Err(ShutdownError::Transport(
            "workbench service is unavailable".to_string(),
        ))
    }

    async fn copy_object(&self, _params: &CopyObjectParams) -> Result<(), CopyError> {
        Err(CopyError::Transport(
            "workbench service is unavailable".to_string(),
        ))
    }

    async fn fetch_method_specs(
        &self,
        _method_ids: &[String],
    ) -> Result<HashMap<String, MethodSpec>> {
        Err(anyhow!("workbench service is unavailable"))
    }

    async fn fetch_user_profile(
        &self,
        _username: &str,
        _token: Option<&str>,
    ) -> Result<Option<UserProfile>> {
        Err(anyhow!("workbench service is unavailable"))
    }
}

#[derive(Debug, Serialize)]
struct MethodSpecQuery<'a> {
    methods: &'a [String],
}

#[derive(Debug, Deserialize)]
struct UserProfileResponse {
    #[serde(default)]
    data: HashMap<String, UserProfile>,
}

pub struct HttpWorkbenchService {
    http: Client,
    version_check_url: String,
    service_url: String,
    shutdown_url_base: String,
    user_profile_url: Option<String>,
}

impl HttpWorkbenchService {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        for (name, raw) in [
            ("version_check_url", Some(&settings.version_check_url)),
            ("service_url", Some(&settings.service_url)),
            ("shutdown_url_base", Some(&settings.shutdown_url_base)),
            ("user_profile_url", settings.user_profile_url.as_ref()),
        ] {
            if let Some(raw) = raw {
                Url::parse(raw).with_context(|| format!("invalid {name} '{raw}'"))?;
            }
        }

        Ok(Self {
            http: Client::new(),
            version_check_url: settings.version_check_url.clone(),
            service_url: trim_trailing_slash(&settings.service_url),
            shutdown_url_base: trim_trailing_slash(&settings.shutdown_url_base),
            user_profile_url: settings.user_profile_url.clone(),
        })
    }
}

fn trim_trailing_slash(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

#[async_trait]
impl WorkbenchService for HttpWorkbenchService {
    async fn fetch_version(&self) -> Result<VersionInfo> {
        let body = self
            .http
            .get(&self.version_check_url)
            .send()
            .await
            .context("version probe failed")?
            .error_for_status()
            .context("version probe rejected")?
            .text()
            .await
            .context("version probe body unreadable")?;
        serde_json::from_str(&body).context("version probe payload malformed")
    }

    async fn shutdown_session(&self, user_id: &str) -> Result<(), ShutdownError> {
        let response = self
            .http
            .delete(format!("{}/{user_id}", self.shutdown_url_base))
            .send()
            .await
            .map_err(|err| ShutdownError::Transport(err.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let message = response.text().await.unwrap_or_default();
        Err(ShutdownError::Rejected {
            status: status.as_u16(),
            message,
        })
    }

    async fn copy_object(&self, params: &CopyObjectParams) -> Result<(), CopyError> {
        let response = self
            .http
            .post(format!("{}/copy_object", self.service_url))
            .json(params)
            .send()
            .await
            .map_err(|err| CopyError::Transport(err.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response
            .text()
            .await
            .map_err(|err| CopyError::Transport(err.to_string()))?;
        if let Ok(api_error) = serde_json::from_str::<ApiError>(&body) {
            return Err(ApiException::new(api_error.code, api_error.message).into());
        }
        if !body.trim().is_empty() {
            return Err(ApiException::new(ErrorCode::Internal, body).into());
        }
        Err(CopyError::Transport(format!("status {status}")))
    }

    async fn fetch_method_specs(
        &self,
        method_ids: &[String],
    ) -> Result<HashMap<String, MethodSpec>> {
        let response: MethodSpecResponse = self
            .http
            .post(format!("{}/method_specs", self.service_url))
            .json(&MethodSpecQuery {
                methods: method_ids,
            })
            .send()
            .await
            .context("method spec lookup failed")?
            .error_for_status()
            .context("method spec lookup rejected")?
            .json()
            .await
            .context("method spec payload malformed")?;
        Ok(response.methods)
    }

    async fn fetch_user_profile(
        &self,
        username: &str,
        token: Option<&str>,
    ) -> Result<Option<UserProfile>> {
        let Some(base) = &self.user_profile_url else {
            return Ok(None);
        };

        let mut request = self.http.get(base).query(&[("usernames", username)]);
        if let Some(token) = token {
            request = request.query(&[("token", token)]);
        }
        let mut response: UserProfileResponse = request
            .send()
            .await
            .context("user profile lookup failed")?
            .error_for_status()
            .context("user profile lookup rejected")?
            .json()
            .await
            .context("user profile payload malformed")?;
        Ok(response.data.remove(username))
    }
}

#[cfg(test)]
#[path = "tests/service_tests.rs"]
mod tests;
