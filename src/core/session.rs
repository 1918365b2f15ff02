//! Session state for the authenticated user.
//!
//! [`SessionStore`] is the single source of truth for the signed-in user and
//! the bearer credentials attached to outbound requests. It performs no
//! network calls; the gateway and the auth flows are its only writers. A
//! subset of the state (profile to a JSON file, tokens to the system keyring)
//! is mirrored to durable storage so a session survives process restarts.

use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::credentials::{CredentialStore, TokenSet};

/// Tokens are treated as expired this many seconds before the server would
/// reject them, so a request never races against real expiry.
pub const TOKEN_EXPIRY_SAFETY_MARGIN_S: i64 = 5 * 60;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Read-only copy of the UI-relevant session fields.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub user: Option<User>,
    pub is_authenticated: bool,
    pub is_loading: bool,
}

#[derive(Default)]
struct SessionState {
    user: Option<User>,
    access_token: Option<String>,
    refresh_token: Option<String>,
    token_expiry: Option<DateTime<Utc>>,
    is_loading: bool,
}

/// The persisted profile subset. Tokens live in the keyring, not here.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedProfile {
    user: Option<User>,
    is_authenticated: bool,
}

/// Durable mirror of the session: profile file + keyring token entry.
pub struct SessionPersistence {
    profile_path: PathBuf,
    credentials: CredentialStore,
}

impl SessionPersistence {
    pub fn new() -> Self {
        Self {
            profile_path: default_profile_path(),
            credentials: CredentialStore::new(),
        }
    }

    pub fn with_paths(profile_path: PathBuf, credentials: CredentialStore) -> Self {
        Self {
            profile_path,
            credentials,
        }
    }

    fn load_profile(&self) -> Option<PersistedProfile> {
        let raw = fs::read_to_string(&self.profile_path).ok()?;
        serde_json::from_str(&raw).ok()
    }

    fn save_profile(&self, profile: &PersistedProfile) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = self.profile_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string(profile)?;
        fs::write(&self.profile_path, raw)?;
        Ok(())
    }

    fn clear_profile(&self) {
        if self.profile_path.exists() {
            if let Err(err) = fs::remove_file(&self.profile_path) {
                debug!("failed to remove persisted session profile: {err}");
            }
        }
    }
}

impl Default for SessionPersistence {
    fn default() -> Self {
        Self::new()
    }
}

fn default_profile_path() -> PathBuf {
    let proj_dirs = ProjectDirs::from("org", "permacommons", "chathub")
        .expect("Failed to determine config directory");
    proj_dirs.config_dir().join("session.json")
}

/// Single source of truth for session data.
///
/// All mutation goes through the methods below; the interior mutex gives the
/// store monitor-like encapsulation, and the lock is never held while doing
/// I/O. Every operation is total: persistence failures are logged and
/// swallowed.
pub struct SessionStore {
    state: Mutex<SessionState>,
    persistence: Option<SessionPersistence>,
}

impl SessionStore {
    /// A store that mirrors changes to durable storage.
    pub fn new(persistence: SessionPersistence) -> Self {
        Self {
            state: Mutex::new(SessionState {
                is_loading: true,
                ..SessionState::default()
            }),
            persistence: Some(persistence),
        }
    }

    /// An in-memory store with no durable mirror (tests, one-shot commands).
    pub fn ephemeral() -> Self {
        Self {
            state: Mutex::new(SessionState {
                is_loading: true,
                ..SessionState::default()
            }),
            persistence: None,
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reload the persisted subset written by a previous process.
    pub fn load_persisted(&self) {
        let Some(persistence) = &self.persistence else {
            return;
        };

        let profile = persistence.load_profile();
        let tokens = match persistence.credentials.load() {
            Ok(tokens) => tokens,
            Err(err) => {
                debug!("failed to load persisted tokens: {err}");
                None
            }
        };

        let mut state = self.lock_state();
        if let Some(profile) = profile {
            state.user = profile.user;
        }
        if let Some(tokens) = tokens {
            state.access_token = Some(tokens.access_token);
            state.refresh_token = Some(tokens.refresh_token);
            state.token_expiry = Some(tokens.expires_at);
        }
    }

    pub fn access_token(&self) -> Option<String> {
        self.lock_state().access_token.clone()
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.lock_state().refresh_token.clone()
    }

    pub fn token_expiry(&self) -> Option<DateTime<Utc>> {
        self.lock_state().token_expiry
    }

    pub fn user(&self) -> Option<User> {
        self.lock_state().user.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.lock_state().user.is_some()
    }

    pub fn is_loading(&self) -> bool {
        self.lock_state().is_loading
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.lock_state();
        SessionSnapshot {
            user: state.user.clone(),
            is_authenticated: state.user.is_some(),
            is_loading: state.is_loading,
        }
    }

    /// True when no expiry is recorded or the safety margin has been reached.
    pub fn is_token_expired(&self) -> bool {
        let expiry = self.lock_state().token_expiry;
        token_expired_at(expiry, Utc::now(), TOKEN_EXPIRY_SAFETY_MARGIN_S)
    }

    /// Store a fresh token pair. Leaves `user` untouched.
    pub fn set_tokens(&self, access_token: &str, refresh_token: &str, expires_in_secs: i64) {
        let expires_at = Utc::now() + Duration::seconds(expires_in_secs);
        {
            let mut state = self.lock_state();
            state.access_token = Some(access_token.to_string());
            state.refresh_token = Some(refresh_token.to_string());
            state.token_expiry = Some(expires_at);
        }

        if let Some(persistence) = &self.persistence {
            let tokens = TokenSet {
                access_token: access_token.to_string(),
                refresh_token: refresh_token.to_string(),
                expires_at,
            };
            if let Err(err) = persistence.credentials.store(&tokens) {
                debug!("failed to persist tokens: {err}");
            }
        }
    }

    /// Set or clear the authenticated user; ends any pending load.
    pub fn set_user(&self, user: Option<User>) {
        {
            let mut state = self.lock_state();
            state.user = user.clone();
            state.is_loading = false;
        }

        if let Some(persistence) = &self.persistence {
            let profile = PersistedProfile {
                is_authenticated: user.is_some(),
                user,
            };
            if let Err(err) = persistence.save_profile(&profile) {
                debug!("failed to persist session profile: {err}");
            }
        }
    }

    pub fn set_loading(&self, is_loading: bool) {
        self.lock_state().is_loading = is_loading;
    }

    /// Clear the whole session. Safe to call when already logged out.
    pub fn logout(&self) {
        {
            let mut state = self.lock_state();
            state.user = None;
            state.access_token = None;
            state.refresh_token = None;
            state.token_expiry = None;
            state.is_loading = false;
        }

        if let Some(persistence) = &self.persistence {
            persistence.clear_profile();
            if let Err(err) = persistence.credentials.clear() {
                debug!("failed to clear persisted tokens: {err}");
            }
        }
    }
}

fn token_expired_at(expiry: Option<DateTime<Utc>>, now: DateTime<Utc>, margin_s: i64) -> bool {
    match expiry {
        Some(expiry) => now > expiry - Duration::seconds(margin_s),
        None => true,
    }
}
