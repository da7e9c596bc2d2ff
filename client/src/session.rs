// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::hydrate::hydrate_dates;

/// Well-known snapshot keys, written when navigating to an edit/info page
/// and removed on navigate-away or successful save.
pub const GOAL_DATA_KEY: &str = "goal-data";
pub const TASK_DATA_KEY: &str = "task-data";
pub const USER_ID_KEY: &str = "user-id";
pub const PREVIEW_GOAL_DATA_KEY: &str = "preview-goal-data";
pub const PREVIEW_PROFILE_EDIT_KEY: &str = "preview-profile-edit";

/// Session-scoped key/value backend. The browser build backs this with
/// `sessionStorage`; tests and native builds use the in-memory variant.
pub trait SessionStorage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String);
    fn remove(&self, key: &str);
}

/// In-memory `SessionStorage`, scoped to the process.
#[derive(Default)]
pub struct MemorySessionStorage {
    entries: RwLock<HashMap<String, String>>,
}

impl SessionStorage for MemorySessionStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: String) {
        self.entries.write().insert(key.to_string(), value);
    }

    fn remove(&self, key: &str) {
        self.entries.write().remove(key);
    }
}

/// Hands one entity snapshot from a list/detail page to an edit/info page
/// across a navigation (surviving a full reload), so the target page does
/// not have to re-fetch what the source page already held.
///
/// Stored values are obfuscated with a SHA-256-derived XOR keystream and
/// hex-encoded. This guards against casual inspection of browser storage
/// only; it is not a security boundary, and the server stays the authority
/// for every authorization check regardless of what the client holds.
pub struct NavigationChannel {
    storage: Arc<dyn SessionStorage>,
    secret: String,
}

impl NavigationChannel {
    pub fn new(storage: Arc<dyn SessionStorage>, secret: impl Into<String>) -> Self {
        Self {
            storage,
            secret: secret.into(),
        }
    }

    /// Serializes and stores `value` under `key` (write on navigate-to).
    pub fn put<T: Serialize>(&self, key: &str, value: &T) -> Result<(), serde_json::Error> {
        let plain = serde_json::to_string(value)?;
        self.storage.set(key, obfuscate(&plain, &self.secret));
        Ok(())
    }

    /// Stores a raw string (e.g. a bare id) under `key`.
    pub fn put_raw(&self, key: &str, value: &str) {
        self.storage.set(key, obfuscate(value, &self.secret));
    }

    /// Returns the snapshot under `key`, parsed as JSON with the same date
    /// hydration as API responses, so a snapshot and a fresh fetch are
    /// indistinguishable to the receiving page.
    ///
    /// Reading does not remove the entry: the snapshot must survive a page
    /// reload of the receiving page, so removal is the explicit `clear`
    /// call on navigate-away-or-save, never a side effect of reading.
    ///
    /// Returns `None` when the key is absent or the stored value does not
    /// decode (a tampered or truncated entry is treated as missing).
    pub fn get_parsed(&self, key: &str) -> Option<Value> {
        let plain = self.get_raw(key)?;
        match serde_json::from_str::<Value>(&plain) {
            Ok(mut value) => {
                hydrate_dates(&mut value);
                Some(value)
            }
            Err(err) => {
                warn!("discarding unparsable session snapshot '{key}': {err}");
                None
            }
        }
    }

    /// Returns the raw string under `key` without removing it.
    pub fn get_raw(&self, key: &str) -> Option<String> {
        let stored = self.storage.get(key)?;
        let plain = deobfuscate(&stored, &self.secret);
        if plain.is_none() {
            warn!("discarding undecodable session snapshot '{key}'");
        }
        plain
    }

    /// Drops the snapshot under `key` (clear on navigate-away-or-save).
    pub fn clear(&self, key: &str) {
        self.storage.remove(key);
    }
}

/// XORs `data` with a keystream of chained SHA-256 blocks over the secret.
fn keystream_apply(data: &[u8], secret: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    let mut counter: u64 = 0;
    let mut block = [0u8; 32];
    for (i, byte) in data.iter().enumerate() {
        let offset = i % 32;
        if offset == 0 {
            let mut hasher = Sha256::new();
            hasher.update(secret.as_bytes());
            hasher.update(counter.to_le_bytes());
            block.copy_from_slice(&hasher.finalize());
            counter += 1;
        }
        out.push(byte ^ block[offset]);
    }
    out
}

fn obfuscate(plain: &str, secret: &str) -> String {
    hex::encode(keystream_apply(plain.as_bytes(), secret))
}

fn deobfuscate(stored: &str, secret: &str) -> Option<String> {
    let bytes = hex::decode(stored).ok()?;
    String::from_utf8(keystream_apply(&bytes, secret)).ok()
}
