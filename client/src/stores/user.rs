// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use std::sync::Arc;

use common::{EditUserPayload, ErrorEnvelope, SignInPayload, User};
use parking_lot::RwLock;
use serde_json::json;
use tokio::task::JoinHandle;
use tokio::time::{self, Duration};
use tracing::debug;

use crate::api::{ApiClient, ApiError, RequestOptions};

use super::{RequestGuard, StoreState};

/// How often the presence keep-alive fires. A missed beat has no
/// client-visible consequence, so there is no backoff or retry.
pub const HEARTBEAT_PERIOD: Duration = Duration::from_secs(60);

/// State container for the current session's user aggregate.
///
/// Constructed explicitly and shared via `Arc` (no ambient singleton), so
/// tests can hold isolated instances per case.
pub struct UserStore {
    api: Arc<ApiClient>,
    state: RwLock<StoreState<Option<User>>>,
    requests: RequestGuard,
}

impl UserStore {
    pub fn new(api: Arc<ApiClient>) -> Arc<Self> {
        Arc::new(Self {
            api,
            state: RwLock::new(StoreState::default()),
            requests: RequestGuard::default(),
        })
    }

    pub fn data(&self) -> Option<User> {
        self.state.read().data.clone()
    }

    pub fn loading(&self) -> bool {
        self.state.read().loading
    }

    pub fn error(&self) -> Option<ErrorEnvelope> {
        self.state.read().error.clone()
    }

    /// Escape hatch for pages injecting a server-validation error.
    pub fn set_error(&self, envelope: ErrorEnvelope) {
        self.state.write().error = Some(envelope);
    }

    pub fn clear_error(&self) {
        self.state.write().error = None;
    }

    /// Drops the cached user, e.g. on sign-out.
    pub fn clear(&self) {
        *self.state.write() = StoreState::default();
    }

    /// Establishes the session. On success the session cookie is held by
    /// the shared HTTP client, and the user aggregate is fetched.
    pub async fn sign_in(&self, payload: SignInPayload) -> Result<(), ApiError> {
        let body = serde_json::to_value(&payload)?;
        match self.api.request("/auth/signin", RequestOptions::post(body)).await {
            Ok(_) => {
                self.clear_error();
                self.get_data(true).await
            }
            Err(err) => {
                self.state.write().error = Some(err.envelope());
                Err(err)
            }
        }
    }

    /// Fetches the user aggregate and replaces the cached data wholesale.
    ///
    /// Concurrent calls are safe: a response is discarded when a newer
    /// request has been issued from this store since (stale-response guard).
    pub async fn get_data(&self, with_loading: bool) -> Result<(), ApiError> {
        let ticket = self.requests.issue();
        if with_loading {
            self.state.write().loading = true;
        }

        let result = self
            .api
            .request("/user", RequestOptions::get().with_auth_redirect())
            .await;

        let mut state = self.state.write();
        if !self.requests.is_current(ticket) {
            // The newer request owns the spinner now; leave loading to it.
            debug!("discarding superseded /user response");
            return Ok(());
        }
        state.loading = false;
        match result.and_then(|body| Ok(serde_json::from_value::<User>(body)?)) {
            Ok(user) => {
                state.data = Some(user);
                state.error = None;
                Ok(())
            }
            Err(err) => {
                state.error = Some(err.envelope());
                Err(err)
            }
        }
    }

    /// Updates username/full name, then re-pulls the aggregate.
    pub async fn edit_profile(&self, payload: EditUserPayload) -> Result<(), ApiError> {
        let body = serde_json::to_value(&payload)?;
        match self.api.request("/user/edit", RequestOptions::put(body)).await {
            Ok(_) => self.get_data(false).await,
            Err(err) => {
                self.state.write().error = Some(err.envelope());
                Err(err)
            }
        }
    }

    /// Fetches a third-party profile summary by username. Does not touch
    /// the focused session user.
    pub async fn fetch_profile(&self, username: &str) -> Result<User, ApiError> {
        let options = RequestOptions::get().with_query("username", username);
        match self.api.request("/user", options).await {
            Ok(body) => Ok(serde_json::from_value(body)?),
            Err(err) => {
                self.state.write().error = Some(err.envelope());
                Err(err)
            }
        }
    }

    /// Starts the presence keep-alive at the default period.
    pub fn start_heartbeat(self: &Arc<Self>) -> HeartbeatHandle {
        self.start_heartbeat_with(HEARTBEAT_PERIOD)
    }

    /// Starts the presence keep-alive at a custom period (tests shorten it).
    ///
    /// Fire-and-forget: errors are swallowed at debug level and never reach
    /// the error envelope. The task stops when the returned handle drops
    /// (provider unmount).
    pub fn start_heartbeat_with(self: &Arc<Self>, period: Duration) -> HeartbeatHandle {
        let store = Arc::clone(self);
        let task = tokio::spawn(async move {
            let mut interval = time::interval(period);
            // The first tick completes immediately. Skip it to wait for the
            // first interval.
            interval.tick().await;

            loop {
                interval.tick().await;
                let options = RequestOptions::patch(Some(json!({})));
                if let Err(err) = store.api.request("/user/heartbeat", options).await {
                    debug!("heartbeat missed: {err}");
                }
            }
        });
        HeartbeatHandle { task }
    }
}

/// Keeps the heartbeat task alive; dropping it aborts the task.
pub struct HeartbeatHandle {
    task: JoinHandle<()>,
}

impl Drop for HeartbeatHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
