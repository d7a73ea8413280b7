// ── Request facade ──
//
// The failure boundary between the HTTP client and everything above it.
// Two ways in:
//
//   try_*  -> Result<T, Failure>   for callers that want the reason
//   get... -> Option<T>            failure already shown to the user
//
// The `Option` path publishes exactly one error notification per failed
// call. Session expiry is never announced here: the session has already
// redirected to the login route by the time the error reaches us.

use std::sync::Arc;

use reelhouse_api::{ApiClient, ApiRequest};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::Failure;
use crate::notify::Notifier;

#[derive(Clone)]
pub struct Requester {
    client: Arc<ApiClient>,
    notifier: Arc<dyn Notifier>,
}

impl Requester {
    pub fn new(client: Arc<ApiClient>, notifier: Arc<dyn Notifier>) -> Self {
        Self { client, notifier }
    }

    pub fn client(&self) -> &Arc<ApiClient> {
        &self.client
    }

    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.notifier
    }

    // ── Result path ──────────────────────────────────────────────────

    pub async fn try_execute<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, Failure> {
        self.client.execute(request).await.map_err(Failure::from)
    }

    pub async fn try_get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Failure> {
        self.try_execute(ApiRequest::get(path)).await
    }

    pub async fn try_post<T: DeserializeOwned, B: Serialize + Sync + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, Failure> {
        let request = ApiRequest::post(path).json(body).map_err(Failure::from)?;
        self.try_execute(request).await
    }

    pub async fn try_put<T: DeserializeOwned, B: Serialize + Sync + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, Failure> {
        let request = ApiRequest::put(path).json(body).map_err(Failure::from)?;
        self.try_execute(request).await
    }

    pub async fn try_delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, Failure> {
        self.try_execute(ApiRequest::delete(path)).await
    }

    // ── Sentinel path ────────────────────────────────────────────────

    /// Run `request`; on failure tell the user and return `None`.
    pub async fn execute<T: DeserializeOwned>(&self, request: ApiRequest) -> Option<T> {
        let method = request.method.clone();
        let path = request.path.clone();
        match self.try_execute(request).await {
            Ok(payload) => Some(payload),
            Err(failure) => {
                self.report(&failure);
                debug!(%method, path, "request failed");
                None
            }
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Option<T> {
        self.execute(ApiRequest::get(path)).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize + Sync + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Option<T> {
        match self.try_post(path, body).await {
            Ok(payload) => Some(payload),
            Err(failure) => {
                self.report(&failure);
                None
            }
        }
    }

    pub async fn put<T: DeserializeOwned, B: Serialize + Sync + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Option<T> {
        match self.try_put(path, body).await {
            Ok(payload) => Some(payload),
            Err(failure) => {
                self.report(&failure);
                None
            }
        }
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Option<T> {
        self.execute(ApiRequest::delete(path)).await
    }

    /// Publish the user-visible side of a failure.
    pub fn report(&self, failure: &Failure) {
        if failure.is_session_expired() {
            return;
        }
        warn!(error = %failure, status = ?failure.status(), "request failed");
        self.notifier.error(failure.message());
    }
}

impl std::fmt::Debug for Requester {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Requester")
            .field("client", &self.client)
            .finish_non_exhaustive()
    }
}
