use std::error::Error;
use std::fmt;

use chrono::{DateTime, Utc};
use keyring::Entry;
use serde::{Deserialize, Serialize};

const KEYRING_SERVICE: &str = "chathub";
const KEYRING_ENTRY: &str = "session-tokens";

/// Describes failures when attempting to access the system keyring.
///
/// Recoverable errors indicate that the credential backend was temporarily
/// unavailable (for example when the keychain service is locked). Permanent
/// errors surface the underlying cause directly.
#[derive(Debug)]
pub enum KeyringAccessError {
    Recoverable(keyring::Error),
    Permanent(keyring::Error),
}

impl KeyringAccessError {
    fn inner(&self) -> &keyring::Error {
        match self {
            KeyringAccessError::Recoverable(err) | KeyringAccessError::Permanent(err) => err,
        }
    }

    pub fn is_recoverable(&self) -> bool {
        matches!(self, KeyringAccessError::Recoverable(_))
    }
}

impl From<keyring::Error> for KeyringAccessError {
    fn from(err: keyring::Error) -> Self {
        match err {
            keyring::Error::PlatformFailure(_) | keyring::Error::NoStorageAccess(_) => {
                KeyringAccessError::Recoverable(err)
            }
            other => KeyringAccessError::Permanent(other),
        }
    }
}

impl fmt::Display for KeyringAccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner())
    }
}

impl Error for KeyringAccessError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(self.inner())
    }
}

/// The credential triple written to the keyring as a single JSON entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

/// Durable storage for the session's token set.
#[derive(Debug, Clone, Copy)]
pub struct CredentialStore {
    use_keyring: bool,
}

impl Default for CredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore {
    pub fn new() -> Self {
        Self { use_keyring: true }
    }

    /// Construct a store with keyring access disabled (useful for tests).
    pub fn new_with_keyring(use_keyring: bool) -> Self {
        Self { use_keyring }
    }

    pub fn load(&self) -> Result<Option<TokenSet>, Box<dyn Error>> {
        if !self.use_keyring {
            return Ok(None);
        }

        let entry = Entry::new(KEYRING_SERVICE, KEYRING_ENTRY)?;
        match entry.get_password() {
            Ok(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(err) => Err(Box::new(KeyringAccessError::from(err))),
        }
    }

    pub fn store(&self, tokens: &TokenSet) -> Result<(), Box<dyn Error>> {
        if !self.use_keyring {
            return Ok(());
        }

        let entry = Entry::new(KEYRING_SERVICE, KEYRING_ENTRY)?;
        let raw = serde_json::to_string(tokens)?;
        entry
            .set_password(&raw)
            .map_err(|err| Box::new(KeyringAccessError::from(err)) as Box<dyn Error>)
    }

    pub fn clear(&self) -> Result<bool, Box<dyn Error>> {
        if !self.use_keyring {
            return Ok(false);
        }

        let entry = Entry::new(KEYRING_SERVICE, KEYRING_ENTRY)?;
        match entry.delete_credential() {
            Ok(()) => Ok(true),
            Err(keyring::Error::NoEntry) => Ok(false),
            Err(err) => Err(Box::new(KeyringAccessError::from(err))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_store_is_inert() {
        let store = CredentialStore::new_with_keyring(false);
        assert!(store.load().unwrap().is_none());
        store
            .store(&TokenSet {
                access_token: "a1".to_string(),
                refresh_token: "r1".to_string(),
                expires_at: Utc::now(),
            })
            .unwrap();
        assert!(!store.clear().unwrap());
    }

    #[test]
    fn token_set_round_trips_through_json() {
        let tokens = TokenSet {
            access_token: "a1".to_string(),
            refresh_token: "r1".to_string(),
            expires_at: "2026-01-01T00:00:00Z".parse().unwrap(),
        };
        let raw = serde_json::to_string(&tokens).unwrap();
        let back: TokenSet = serde_json::from_str(&raw).unwrap();
        assert_eq!(back.access_token, "a1");
        assert_eq!(back.refresh_token, "r1");
        assert_eq!(back.expires_at, tokens.expires_at);
    }
}
