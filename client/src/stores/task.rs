// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use std::sync::Arc;

use chrono::Utc;
use common::{CreateTaskPayload, ErrorEnvelope, Task, UpdateTaskPayload};
use parking_lot::RwLock;
use serde_json::json;
use tracing::debug;

use crate::api::{ApiClient, ApiError, RequestOptions};

use super::{GoalStore, StoreState, UserStore};

/// Undo handle returned by `delete_task`; see `GoalUndo`.
#[derive(Debug)]
pub struct TaskUndo {
    pub(crate) task_id: String,
}

impl TaskUndo {
    pub fn task_id(&self) -> &str {
        &self.task_id
    }
}

/// State container for the one task currently being viewed or edited.
///
/// Task mutations ripple outward: the owning goal's task list and progress
/// change, and completing or deleting a task moves the user's aggregate
/// counters. Both are re-pulled through the other stores' public `get_data`
/// operations after every mutation; this store never touches their state.
pub struct TaskStore {
    api: Arc<ApiClient>,
    goal: Arc<GoalStore>,
    user: Arc<UserStore>,
    state: RwLock<StoreState<Option<Task>>>,
}

impl TaskStore {
    pub fn new(api: Arc<ApiClient>, goal: Arc<GoalStore>, user: Arc<UserStore>) -> Arc<Self> {
        Arc::new(Self {
            api,
            goal,
            user,
            state: RwLock::new(StoreState::default()),
        })
    }

    pub fn data(&self) -> Option<Task> {
        self.state.read().data.clone()
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

    /// Focuses a task (e.g. when opening its edit page).
    pub fn set_focus(&self, task: Task) {
        self.state.write().data = Some(task);
    }

    /// Resets to the default empty state (navigation away).
    pub fn clear(&self) {
        *self.state.write() = StoreState::default();
    }

    /// Ensures the goal store is focused on `goal_id` before a task
    /// mutation is reconciled into it. A mismatch means the caller operated
    /// on a task of a goal that is not focused; the remedy is a re-fetch of
    /// the right goal, never a silent patch into the wrong cached list.
    async fn ensure_goal_focus(&self, goal_id: &str) -> Result<(), ApiError> {
        match self.goal.focused_id() {
            Some(focused) if focused == goal_id => Ok(()),
            _ => {
                debug!("goal focus mismatch, re-fetching goal {goal_id}");
                self.goal.get_data(Some(goal_id), false).await
            }
        }
    }

    /// Creates a task under its goal, focuses it, and re-pulls the owning
    /// goal so the list and server-computed progress are authoritative.
    pub async fn create_task(&self, payload: CreateTaskPayload) -> Result<Task, ApiError> {
        let goal_id = payload.goal_id.clone();
        let body = serde_json::to_value(&payload)?;
        match self
            .api
            .request("/task", RequestOptions::post(body))
            .await
            .and_then(|body| Ok(serde_json::from_value::<Task>(body)?))
        {
            Ok(task) => {
                {
                    let mut state = self.state.write();
                    state.data = Some(task.clone());
                    state.error = None;
                }
                self.ensure_goal_focus(&goal_id).await.ok();
                self.goal.get_data(Some(&goal_id), false).await.ok();
                Ok(task)
            }
            Err(err) => {
                self.state.write().error = Some(err.envelope());
                Err(err)
            }
        }
    }

    /// Updates a task; the focused task is replaced with the server's
    /// response and the owning goal is re-pulled.
    pub async fn update_task(&self, payload: UpdateTaskPayload) -> Result<(), ApiError> {
        let goal_id = payload.goal_id.clone();
        let body = serde_json::to_value(&payload)?;
        match self
            .api
            .request("/task", RequestOptions::put(body))
            .await
            .and_then(|body| Ok(serde_json::from_value::<Task>(body)?))
        {
            Ok(task) => {
                {
                    let mut state = self.state.write();
                    state.data = Some(task);
                    state.error = None;
                }
                self.goal.get_data(Some(&goal_id), false).await.ok();
                Ok(())
            }
            Err(err) => {
                self.state.write().error = Some(err.envelope());
                Err(err)
            }
        }
    }

    /// Toggles a task's completion with the two-phase protocol:
    ///
    /// 1. optimistic: flip the flag in the focused goal's task list in
    ///    place, so the checkbox answers instantly;
    /// 2. authoritative: PUT the toggle, then re-fetch the goal and the
    ///    user aggregate. Progress and counters are server-computed and
    ///    cannot be derived client-side, so the optimistic patch is never
    ///    trusted as final state.
    ///
    /// The re-fetch runs on failure too, rolling the optimistic flip back.
    pub async fn toggle_completed(&self, task_id: &str, goal_id: &str) -> Result<(), ApiError> {
        self.ensure_goal_focus(goal_id).await.ok();

        let mut new_completed = None;
        self.goal.patch_task(task_id, |task| {
            task.completed = !task.completed;
            task.completed_at = task.completed.then(Utc::now);
            new_completed = Some(task.completed);
        });

        // When the task was not in the focused list the server still owns
        // the truth; send the toggle without an optimistic phase.
        let options = RequestOptions::put(json!({
            "taskId": task_id,
            "goalId": goal_id,
            "completed": new_completed,
        }));
        let result = self.api.request("/task", options).await;

        self.goal.get_data(Some(goal_id), false).await.ok();
        self.user.get_data(false).await.ok();

        match result {
            Ok(_) => Ok(()),
            Err(err) => {
                self.state.write().error = Some(err.envelope());
                Err(err)
            }
        }
    }

    /// Soft-deletes a task.
    ///
    /// Clears the focused task when it is the deleted one, then re-pulls
    /// the owning goal (task list, progress) and the user aggregate
    /// (completed counter) rather than adjusting either locally; the undo
    /// window makes local decrements drift. Returns the undo handle to bind
    /// to the notification action.
    pub async fn delete_task(&self, task_id: &str, goal_id: &str) -> Result<TaskUndo, ApiError> {
        let options = RequestOptions::delete(json!({ "taskId": task_id }));
        match self.api.request("/task", options).await {
            Ok(_) => {
                {
                    let mut state = self.state.write();
                    if state.data.as_ref().is_some_and(|task| task.id == task_id) {
                        state.data = None;
                    }
                    state.error = None;
                }
                self.goal.get_data(Some(goal_id), false).await.ok();
                self.user.get_data(false).await.ok();
                Ok(TaskUndo {
                    task_id: task_id.to_string(),
                })
            }
            Err(err) => {
                self.state.write().error = Some(err.envelope());
                Err(err)
            }
        }
    }

    /// Restores a soft-deleted task and re-runs the same cross-store
    /// refresh as the delete, converging on the pre-delete state (net of
    /// interleaved changes).
    pub async fn restore(&self, undo: TaskUndo, goal_id: &str) -> Result<(), ApiError> {
        let options = RequestOptions::put(json!({ "taskId": undo.task_id }));
        match self.api.request("/task/restore", options).await {
            Ok(_) => {
                self.goal.get_data(Some(goal_id), false).await.ok();
                self.user.get_data(false).await.ok();
                Ok(())
            }
            Err(err) => {
                self.state.write().error = Some(err.envelope());
                Err(err)
            }
        }
    }
}
