// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a goal. The server is the source of truth for
/// transitions; the client only ever round-trips these values.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GoalStatus {
    Active,
    Completed,
    Paused,
    Canceled,
    Pending,
}

impl GoalStatus {
    /// Wire tokens accepted by forms, in display order.
    pub const OPTIONS: [&'static str; 5] = ["active", "completed", "paused", "canceled", "pending"];
}

/// Difficulty rating of a single task.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    VeryHard,
}

impl Difficulty {
    /// Wire tokens accepted by forms, in display order.
    pub const OPTIONS: [&'static str; 4] = ["easy", "medium", "hard", "very-hard"];
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    User,
    Admin,
    Moderator,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Presence {
    Online,
    Offline,
}

/// Represents a task within the system.
///
/// Tasks always belong to exactly one goal (`goal_id`). Soft-deleted
/// ("recycled") tasks keep their row server-side for a bounded undo window,
/// so the client carries the flag and timestamp rather than dropping them.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub goal_id: String,
    pub task: String,
    #[serde(default)]
    pub description: String,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub difficulty: Difficulty,
    pub target_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub is_recycled: bool,
    pub recycled_at: Option<DateTime<Utc>>,
}

/// Represents a goal and its attached tasks.
///
/// `progress` is computed server-side from the attached tasks; the client
/// must never derive it locally (see the two-phase toggle protocol in the
/// client crate).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub id: String,
    pub user_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub target_date: Option<NaiveDate>,
    pub completed_at: Option<DateTime<Utc>>,
    pub status: GoalStatus,
    /// 0..=100, server-computed.
    pub progress: u8,
    /// Theme accent, hex string (e.g. "#1f77b4").
    pub color: String,
    #[serde(default)]
    pub public: bool,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub is_recycled: bool,
    pub recycled_at: Option<DateTime<Utc>>,
}

/// The current session's user aggregate.
///
/// The completed counters are maintained server-side because deletion is
/// soft: a locally decremented counter would drift as soon as an undo is
/// exercised, so the client always re-pulls instead of patching them.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub presence: Presence,
    pub last_active: Option<DateTime<Utc>>,
    #[serde(default)]
    pub goals: Vec<Goal>,
    #[serde(default)]
    pub goals_completed: u32,
    #[serde(default)]
    pub tasks_completed: u32,
}

// --- Search results ---

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSummary {
    pub id: String,
    pub username: String,
    pub name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GoalSummary {
    pub id: String,
    pub title: String,
    pub color: String,
    pub progress: u8,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskSummary {
    pub id: String,
    pub goal_id: String,
    pub task: String,
    pub completed: bool,
}

/// One page of unified search results. `next_offset` is an opaque cursor
/// for the profiles category; `None` means the last page was reached.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SearchResults {
    #[serde(default)]
    pub profiles: Vec<ProfileSummary>,
    #[serde(default)]
    pub goals: Vec<GoalSummary>,
    #[serde(default)]
    pub tasks: Vec<TaskSummary>,
    pub next_offset: Option<String>,
}

// --- Error envelope ---

/// Error codes the client treats as "must re-authenticate". Pages offer a
/// sign-in redirect for these instead of a generic retry.
pub const AUTH_INVALID_CODES: [&str; 4] = [
    "auth/expired-token",
    "auth/invalid-token",
    "auth/user-not-found",
    "auth/invalid-role",
];

/// Returns true when `code` names an unrecoverable authentication state.
pub fn is_auth_invalid(code: &str) -> bool {
    AUTH_INVALID_CODES.contains(&code)
}

/// The generic error shape surfaced when no field-specific mapping applies.
/// Covers network failures, unrecognized server codes, and authentication
/// failures alike.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ErrorEnvelope {
    pub title: String,
    pub message: String,
    pub code: String,
}

impl ErrorEnvelope {
    pub fn new(title: &str, message: &str, code: &str) -> Self {
        Self {
            title: title.to_string(),
            message: message.to_string(),
            code: code.to_string(),
        }
    }

    /// True when this envelope carries an authentication-invalid code.
    pub fn is_auth_invalid(&self) -> bool {
        is_auth_invalid(&self.code)
    }
}

// --- API payloads ---
// It's a good practice to separate the entity models above from the API
// payload models below, as they may have different (and fewer) fields.

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SignInPayload {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CreateGoalPayload {
    pub title: String,
    pub description: String,
    // The target date is optional. If not provided, the goal is open-ended.
    pub target_date: Option<NaiveDate>,
    pub color: String,
    pub public: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UpdateGoalPayload {
    pub goal_id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub target_date: Option<NaiveDate>,
    pub status: Option<GoalStatus>,
    pub color: Option<String>,
    pub public: Option<bool>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskPayload {
    pub goal_id: String,
    pub task: String,
    pub description: String,
    pub difficulty: Difficulty,
    pub target_date: Option<NaiveDate>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskPayload {
    pub task_id: String,
    pub goal_id: String,
    pub task: Option<String>,
    pub description: Option<String>,
    pub completed: Option<bool>,
    pub difficulty: Option<Difficulty>,
    pub target_date: Option<NaiveDate>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct EditUserPayload {
    pub username: String,
    pub name: String,
}
