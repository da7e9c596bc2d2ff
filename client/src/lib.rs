// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
//! Client core for the goal tracker: field-level form validation, the
//! entity cache stores (user/goal/task/search) with their optimistic-update
//! and undo semantics, the REST transport, and the session navigation
//! channel.
//!
//! Stores are explicit, dependency-injected containers wired together at
//! construction:
//!
//! ```no_run
//! use std::sync::Arc;
//! use client::api::ApiClient;
//! use client::stores::{GoalStore, SearchStore, TaskStore, UserStore};
//!
//! let api = Arc::new(ApiClient::new("https://api.example.com").unwrap());
//! let user = UserStore::new(api.clone());
//! let goal = GoalStore::new(api.clone(), user.clone());
//! let task = TaskStore::new(api.clone(), goal.clone(), user.clone());
//! let search = SearchStore::new(api);
//! # let _ = (task, search);
//! ```

pub mod api;
pub mod forms;
pub mod hydrate;
pub mod session;
pub mod stores;
pub mod validation;

pub use api::{ApiClient, ApiError, RequestOptions};
pub use forms::FormState;
pub use hydrate::hydrate_dates;
pub use session::{MemorySessionStorage, NavigationChannel, SessionStorage};
pub use validation::{Constraint, Field, ValidationConfig, validate_field, validate_forms};
