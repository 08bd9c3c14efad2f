//! Persisted Telegram identity/group cache.
//!
//! The roster is the sole source of truth for who the bridge has seen,
//! which groups they were seen in, and whether they are admins there. It is
//! shared by the IRC read loop and the Telegram event pump, so every
//! mutation (and the persistence write it triggers) happens under one lock.
//!
//! On-disk schema, preserved from earlier bridge generations:
//!
//! ```json
//! {
//!   "users":  { "<userId>": ["<handle>", <dmAllowed-or-null>] },
//!   "groups": { "<groupId>": { "<userId>": <isAdmin-or-null> } }
//! }
//! ```

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Sentinel handle for users whose display name is not yet known.
/// An incoming sentinel never overwrites a real stored handle.
pub const UNKNOWN_HANDLE: &str = "unknown";

/// Cache errors.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Contract violation by the caller; should not occur in normal
    /// operation.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    #[error("cache io: {0}")]
    Io(#[from] std::io::Error),
    #[error("cache encode/decode: {0}")]
    Json(#[from] serde_json::Error),
}

/// One identity record: `[handle, dmAllowed-or-null]`.
///
/// Tuple struct so it serializes as the two-element JSON array of the
/// on-disk schema. `None` means the user has neither granted nor refused
/// direct messages yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct UserRecord(String, Option<bool>);

/// Member user id -> admin tri-state.
type GroupRecord = BTreeMap<String, Option<bool>>;

#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheData {
    users: BTreeMap<String, UserRecord>,
    groups: BTreeMap<String, GroupRecord>,
}

/// What an [`Roster::upsert`] call observed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertOutcome {
    /// True exactly once per (user, group) pair: the member entry was
    /// created by this call.
    pub new_group_member: bool,
    /// `Some(state)` when this call moved the member's admin tri-state from
    /// unknown to a concrete value. Once concrete, the state is frozen and
    /// later calls report `None`.
    pub admin_changed: Option<bool>,
}

/// A group member with its resolved handle, for NAMES/WHO listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupMember {
    pub user_id: String,
    pub handle: String,
    pub admin: Option<bool>,
}

/// Scope for known-handle enumeration.
#[derive(Debug, Clone, Copy)]
pub enum HandleScope<'a> {
    /// Handles of one group's members.
    Group(&'a str),
    /// All known handles (direct-message destinations).
    Direct,
}

/// The cache service: owned data plus its persistence path.
pub struct Roster {
    path: PathBuf,
    inner: Mutex<CacheData>,
}

impl Roster {
    /// Load the roster from disk, creating a default file when absent.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, CacheError> {
        let path = path.as_ref().to_path_buf();
        let data = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            let data: CacheData = serde_json::from_str(&content)?;
            info!(
                path = %path.display(),
                users = data.users.len(),
                groups = data.groups.len(),
                "Loaded usercache"
            );
            data
        } else {
            let data = CacheData::default();
            std::fs::write(&path, serde_json::to_string_pretty(&data)?)?;
            warn!(path = %path.display(), "Usercache absent, created empty one");
            data
        };
        Ok(Self {
            path,
            inner: Mutex::new(data),
        })
    }

    /// Record an observation of a user, optionally within a group.
    ///
    /// Creates the identity record on first sight, updates the stored
    /// handle and DM permission when they differ, creates group/member
    /// entries as needed, and sets the member's admin tri-state at most
    /// once. Any change is persisted in full before returning.
    pub fn upsert(
        &self,
        user_id: &str,
        handle: &str,
        group_id: Option<&str>,
        admin: Option<bool>,
        dm_allowed: Option<bool>,
    ) -> Result<UpsertOutcome, CacheError> {
        if user_id.is_empty() {
            return Err(CacheError::InvalidArgument("empty user id"));
        }
        if handle.is_empty() {
            return Err(CacheError::InvalidArgument("empty handle"));
        }
        if matches!(group_id, Some(g) if g.is_empty()) {
            return Err(CacheError::InvalidArgument("empty group id"));
        }

        let mut data = self.inner.lock();
        let mut changed = false;
        let mut outcome = UpsertOutcome::default();

        let user = data.users.entry(user_id.to_string()).or_insert_with(|| {
            debug!(user_id, "Created user entry");
            changed = true;
            UserRecord(handle.to_string(), None)
        });

        if user.0 != handle && handle != UNKNOWN_HANDLE {
            debug!(user_id, handle, "Updated stored handle");
            user.0 = handle.to_string();
            changed = true;
        }

        if let Some(dm) = dm_allowed {
            if user.1 != Some(dm) {
                debug!(user_id, dm, "Updated DM permission");
                user.1 = Some(dm);
                changed = true;
            }
        }

        if let Some(gid) = group_id {
            let group = data.groups.entry(gid.to_string()).or_insert_with(|| {
                debug!(group_id = gid, "Created group entry");
                changed = true;
                GroupRecord::new()
            });

            let member = group.entry(user_id.to_string()).or_insert_with(|| {
                debug!(user_id, group_id = gid, "New member in group");
                outcome.new_group_member = true;
                changed = true;
                None
            });

            // Admin state is frozen after the first concrete observation.
            if let Some(flag) = admin {
                if member.is_none() {
                    debug!(user_id, group_id = gid, admin = flag, "Admin state set");
                    *member = Some(flag);
                    outcome.admin_changed = Some(flag);
                    changed = true;
                }
            }
        }

        if changed {
            self.persist(&data)?;
        }
        Ok(outcome)
    }

    /// Mark a user as having refused direct messages.
    ///
    /// Used when a Telegram send comes back unauthorized. Returns whether
    /// anything changed.
    pub fn revoke_dm(&self, user_id: &str) -> Result<bool, CacheError> {
        let mut data = self.inner.lock();
        let Some(user) = data.users.get_mut(user_id) else {
            return Ok(false);
        };
        if user.1 == Some(false) {
            return Ok(false);
        }
        user.1 = Some(false);
        self.persist(&data)?;
        Ok(true)
    }

    /// List a group's members with resolved handles, or `None` when the
    /// group has never been observed.
    pub fn group_members(&self, group_id: &str) -> Option<Vec<GroupMember>> {
        let data = self.inner.lock();
        let group = data.groups.get(group_id)?;
        Some(
            group
                .iter()
                .map(|(uid, admin)| GroupMember {
                    user_id: uid.clone(),
                    handle: data
                        .users
                        .get(uid)
                        .map(|u| u.0.clone())
                        .unwrap_or_else(|| UNKNOWN_HANDLE.to_string()),
                    admin: *admin,
                })
                .collect(),
        )
    }

    /// Resolve a handle to `(user id, dm permission)`, case-insensitively.
    pub fn resolve_handle(&self, handle: &str) -> Option<(String, Option<bool>)> {
        let wanted = handle.to_lowercase();
        let data = self.inner.lock();
        data.users
            .iter()
            .find(|(_, rec)| rec.0.to_lowercase() == wanted)
            .map(|(uid, rec)| (uid.clone(), rec.1))
    }

    /// Known handles in a destination's scope, for forced-mention
    /// conversion.
    pub fn handles_in_scope(&self, scope: HandleScope<'_>) -> Vec<String> {
        let data = self.inner.lock();
        match scope {
            HandleScope::Group(gid) => data
                .groups
                .get(gid)
                .map(|group| {
                    group
                        .keys()
                        .filter_map(|uid| data.users.get(uid))
                        .map(|u| u.0.clone())
                        .collect()
                })
                .unwrap_or_default(),
            HandleScope::Direct => data.users.values().map(|u| u.0.clone()).collect(),
        }
    }

    /// Write the whole cache to disk. Callers hold the data lock, so
    /// mutation and persistence form one critical section.
    fn persist(&self, data: &CacheData) -> Result<(), CacheError> {
        std::fs::write(&self.path, serde_json::to_string_pretty(data)?)?;
        debug!(path = %self.path.display(), "Saved usercache");
        Ok(())
    }
}
