// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use std::sync::Arc;

use common::{CreateGoalPayload, ErrorEnvelope, Goal, Task, UpdateGoalPayload};
use parking_lot::RwLock;
use serde_json::json;
use tracing::debug;

use crate::api::{ApiClient, ApiError, RequestOptions};

use super::{RequestGuard, StoreState, UserStore};

/// Undo handle returned by `delete_goal`, bound to the specific goal that
/// was soft-deleted. Pages attach it to the "Undo" action of a dismissible
/// notification; invoking `restore` with it re-runs the same cross-store
/// refresh as the delete, ending in the state the delete never happened.
#[derive(Debug)]
pub struct GoalUndo {
    pub(crate) goal_id: String,
}

impl GoalUndo {
    pub fn goal_id(&self) -> &str {
        &self.goal_id
    }
}

/// State container for the one goal currently being viewed or edited.
///
/// Holds a handle to the `UserStore` because goal mutations invalidate the
/// user aggregate (goal list, completed counters): consistency is restored
/// by calling the user store's public `get_data`, never by reaching into
/// its state directly.
pub struct GoalStore {
    api: Arc<ApiClient>,
    user: Arc<UserStore>,
    state: RwLock<StoreState<Option<Goal>>>,
    requests: RequestGuard,
}

impl GoalStore {
    pub fn new(api: Arc<ApiClient>, user: Arc<UserStore>) -> Arc<Self> {
        Arc::new(Self {
            api,
            user,
            state: RwLock::new(StoreState::default()),
            requests: RequestGuard::default(),
        })
    }

    pub fn data(&self) -> Option<Goal> {
        self.state.read().data.clone()
    }

    /// Id of the focused goal, if any.
    pub fn focused_id(&self) -> Option<String> {
        self.state.read().data.as_ref().map(|goal| goal.id.clone())
    }

    pub fn loading(&self) -> bool {
        self.state.read().loading
    }

    pub fn error(&self) -> Option<ErrorEnvelope> {
        self.state.read().error.clone()
    }

    pub fn set_error(&self, envelope: ErrorEnvelope) {
        self.state.write().error = Some(envelope);
    }

    pub fn clear_error(&self) {
        self.state.write().error = None;
    }

    /// Resets to the default empty state (navigation away).
    pub fn clear(&self) {
        *self.state.write() = StoreState::default();
    }

    /// Fetches one goal and replaces the focused data wholesale. With
    /// `goal_id` omitted, refreshes the currently focused goal; a no-op
    /// when nothing is focused.
    ///
    /// Safe under concurrent calls for different ids: each request takes a
    /// ticket before its first await, and a response is discarded when a
    /// newer request has been issued since. The focused data always ends up
    /// at the result of the newest request, not the last response to land.
    pub async fn get_data(&self, goal_id: Option<&str>, with_loading: bool) -> Result<(), ApiError> {
        let Some(id) = goal_id.map(str::to_owned).or_else(|| self.focused_id()) else {
            return Ok(());
        };

        let ticket = self.requests.issue();
        if with_loading {
            self.state.write().loading = true;
        }

        let options = RequestOptions::get().with_query("goalId", id.clone());
        let result = self.api.request("/goal", options).await;

        let mut state = self.state.write();
        if !self.requests.is_current(ticket) {
            // The newer request owns the spinner now; leave loading to it.
            debug!("discarding superseded response for goal {id}");
            return Ok(());
        }
        state.loading = false;
        match result.and_then(|body| Ok(serde_json::from_value::<Goal>(body)?)) {
            Ok(goal) => {
                state.data = Some(goal);
                state.error = None;
                Ok(())
            }
            Err(err) => {
                state.error = Some(err.envelope());
                Err(err)
            }
        }
    }

    /// Creates a goal, focuses it, and refreshes the user aggregate (its
    /// goal list just changed).
    pub async fn create_goal(&self, payload: CreateGoalPayload) -> Result<Goal, ApiError> {
        let body = serde_json::to_value(&payload)?;
        match self
            .api
            .request("/goal", RequestOptions::post(body))
            .await
            .and_then(|body| Ok(serde_json::from_value::<Goal>(body)?))
        {
            Ok(goal) => {
                {
                    let mut state = self.state.write();
                    state.data = Some(goal.clone());
                    state.error = None;
                }
                self.user.get_data(false).await.ok();
                Ok(goal)
            }
            Err(err) => {
                self.state.write().error = Some(err.envelope());
                Err(err)
            }
        }
    }

    /// Updates the focused goal; the server's response replaces the focused
    /// data wholesale (it carries recomputed fields).
    pub async fn update_goal(&self, payload: UpdateGoalPayload) -> Result<(), ApiError> {
        let body = serde_json::to_value(&payload)?;
        match self
            .api
            .request("/goal", RequestOptions::put(body))
            .await
            .and_then(|body| Ok(serde_json::from_value::<Goal>(body)?))
        {
            Ok(goal) => {
                let mut state = self.state.write();
                state.data = Some(goal);
                state.error = None;
                Ok(())
            }
            Err(err) => {
                self.state.write().error = Some(err.envelope());
                Err(err)
            }
        }
    }

    /// Soft-deletes the focused goal.
    ///
    /// On success the focused data is cleared and the user aggregate is
    /// re-pulled (not decremented locally: the delete is recoverable, so a
    /// local adjustment would drift once the undo window is exercised).
    /// Returns the undo handle to bind to the notification action.
    pub async fn delete_goal(&self) -> Result<GoalUndo, ApiError> {
        let Some(goal_id) = self.focused_id() else {
            let envelope =
                ErrorEnvelope::new("No goal selected", "There is no goal to delete.", "goal/no-focus");
            self.state.write().error = Some(envelope.clone());
            return Err(ApiError::Server(envelope));
        };

        let options = RequestOptions::delete(json!({ "goalId": goal_id }));
        match self.api.request("/goal", options).await {
            Ok(_) => {
                {
                    let mut state = self.state.write();
                    state.data = None;
                    state.error = None;
                }
                self.user.get_data(false).await.ok();
                Ok(GoalUndo { goal_id })
            }
            Err(err) => {
                self.state.write().error = Some(err.envelope());
                Err(err)
            }
        }
    }

    /// Restores a soft-deleted goal and re-runs the same refresh as the
    /// delete, converging on the state the delete never happened (net of
    /// interleaved changes).
    pub async fn restore(&self, undo: GoalUndo) -> Result<(), ApiError> {
        let options = RequestOptions::put(json!({ "goalId": undo.goal_id }));
        match self.api.request("/goal/restore", options).await {
            Ok(_) => {
                self.get_data(Some(&undo.goal_id), false).await.ok();
                self.user.get_data(false).await.ok();
                Ok(())
            }
            Err(err) => {
                self.state.write().error = Some(err.envelope());
                Err(err)
            }
        }
    }

    /// Asks the server to generate tasks for the focused goal from a
    /// free-text prompt. Opaque mutation: only the envelope matters, then
    /// the goal is re-fetched to pick up whatever was attached.
    pub async fn generate_tasks(&self, prompt: &str) -> Result<(), ApiError> {
        let Some(goal_id) = self.focused_id() else {
            return Ok(());
        };
        let options = RequestOptions::post(json!({ "goalId": goal_id, "prompt": prompt }));
        match self.api.request("/ai", options).await {
            Ok(_) => self.get_data(Some(&goal_id), false).await,
            Err(err) => {
                self.state.write().error = Some(err.envelope());
                Err(err)
            }
        }
    }

    /// Applies an optimistic in-place patch to one task in the focused
    /// goal's list (replace-by-predicate). Returns false when the task is
    /// not part of the focused goal; callers treat that as a focus mismatch
    /// and re-fetch instead.
    ///
    /// This is a public operation on the goal store's own data so that the
    /// task store never reaches into this store's state directly.
    pub fn patch_task(&self, task_id: &str, patch: impl FnOnce(&mut Task)) -> bool {
        let mut state = self.state.write();
        let Some(goal) = state.data.as_mut() else {
            return false;
        };
        match goal.tasks.iter_mut().find(|task| task.id == task_id) {
            Some(task) => {
                patch(task);
                true
            }
            None => false,
        }
    }
}
