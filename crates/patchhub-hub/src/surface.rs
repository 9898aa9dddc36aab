//! Caller-facing request handling.
//!
//! Every request is checked against the install capability before anything
//! else happens, and every outcome is a tagged [`Response`].

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::artifact::ArtifactKind;
use crate::error::{HubError, HubResult};
use crate::hub::Hub;
use crate::ports::CapabilityCheck;

/// A search request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Caller identity, used for access control and rate limiting.
    pub identity: String,
    /// Search term.
    pub term: String,
    /// Kind to search for.
    #[serde(default)]
    pub kind: ArtifactKind,
}

/// An install request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallRequest {
    /// Caller identity, used for access control and rate limiting.
    pub identity: String,
    /// Archive download URL.
    pub url: String,
    /// Artifact identifier; also the install folder name.
    pub identifier: String,
    /// Kind to install as.
    #[serde(default)]
    pub kind: ArtifactKind,
}

/// Tagged outcome returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Whether the operation succeeded.
    pub success: bool,
    /// The result on success, `{code, message}` on failure.
    pub data: Value,
}

impl Response {
    /// A successful response.
    #[must_use]
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data,
        }
    }

    /// A failed response.
    #[must_use]
    pub fn error(err: &HubError) -> Self {
        Self {
            success: false,
            data: json!({ "code": err.code(), "message": err.to_string() }),
        }
    }

    /// Error code on failure.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        if self.success {
            return None;
        }
        self.data.get("code").and_then(Value::as_str)
    }
}

impl<T: Serialize> From<HubResult<T>> for Response {
    fn from(result: HubResult<T>) -> Self {
        match result.and_then(|value| {
            serde_json::to_value(value)
                .map_err(|e| HubError::UnexpectedSchema(format!("failed to encode result: {e}")))
        }) {
            Ok(value) => Self::ok(value),
            Err(err) => Self::error(&err),
        }
    }
}

/// Capability-checked front for a [`Hub`].
pub struct HubService {
    hub: Arc<Hub>,
    access: Arc<dyn CapabilityCheck>,
}

impl fmt::Debug for HubService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HubService")
            .field("hub", &self.hub)
            .finish_non_exhaustive()
    }
}

impl HubService {
    /// Wrap a hub with an access policy.
    #[must_use]
    pub fn new(hub: Arc<Hub>, access: Arc<dyn CapabilityCheck>) -> Self {
        Self { hub, access }
    }

    /// The wrapped hub.
    #[must_use]
    pub fn hub(&self) -> &Arc<Hub> {
        &self.hub
    }

    fn authorize(&self, identity: &str) -> HubResult<()> {
        if self.access.caller_can_install(identity) {
            Ok(())
        } else {
            Err(HubError::PermissionDenied)
        }
    }

    /// Handle a search request.
    pub async fn search(&self, request: SearchRequest) -> Response {
        let result = async {
            self.authorize(&request.identity)?;
            let payload = self
                .hub
                .search(&request.identity, &request.term, request.kind)
                .await?;
            serde_json::from_str::<Value>(&payload)
                .map_err(|e| HubError::UnexpectedSchema(format!("cached payload is invalid: {e}")))
        }
        .await;
        Response::from(result)
    }

    /// Handle an install request.
    pub async fn install(&self, request: InstallRequest) -> Response {
        let result = async {
            self.authorize(&request.identity)?;
            self.hub
                .install(
                    &request.identity,
                    &request.url,
                    &request.identifier,
                    request.kind,
                )
                .await
        }
        .await;
        Response::from(result)
    }
}
