//! User directory
//!
//! Owns password verification so that the auth core only ever sees an
//! already-authenticated subject.

use std::sync::atomic::{AtomicU64, Ordering};

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use perch_types::SubjectId;
use tokio::sync::OnceCell;

/// Registered user as exposed to handlers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: SubjectId,
    pub email: String,
}

/// User directory errors
#[derive(Debug, thiserror::Error)]
pub enum UserError {
    /// Unknown email or wrong password
    #[error("invalid email or password")]
    InvalidCredentials,

    /// Email already registered
    #[error("email already registered")]
    DuplicateEmail,

    /// Password hashing failed
    #[error("password hashing failed: {0}")]
    Hashing(String),
}

/// Lookup and verification of user credentials
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Register a new user
    async fn register(&self, email: &str, password: &str) -> Result<UserRecord, UserError>;

    /// Check a password and return the subject it belongs to
    async fn verify_password(&self, email: &str, password: &str) -> Result<SubjectId, UserError>;

    /// Find a user by subject
    async fn find(&self, id: &SubjectId) -> Option<UserRecord>;
}

/// Lowercase and trim an email address for lookup
pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

#[derive(Debug, Clone)]
struct StoredUser {
    id: SubjectId,
    email: String,
    password_hash: String,
}

/// Password hashed once per directory and verified against for unknown
/// emails, so a miss costs the same argon2 work as a wrong password
const DUMMY_PASSWORD: &str = "perch-unknown-user";

/// In-process user directory with argon2id password hashes
#[derive(Default)]
pub struct MemoryUserDirectory {
    by_email: DashMap<String, StoredUser>,
    by_id: DashMap<SubjectId, String>,
    next_id: AtomicU64,
    dummy_hash: OnceCell<String>,
}

impl MemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered users
    pub fn len(&self) -> usize {
        self.by_email.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_email.is_empty()
    }

    async fn dummy_hash(&self) -> Result<String, UserError> {
        self.dummy_hash
            .get_or_try_init(|| hash_password(DUMMY_PASSWORD.to_string()))
            .await
            .cloned()
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn register(&self, email: &str, password: &str) -> Result<UserRecord, UserError> {
        let email = normalize_email(email);
        if self.by_email.contains_key(&email) {
            return Err(UserError::DuplicateEmail);
        }

        let password_hash = hash_password(password.to_string()).await?;

        // Re-check under the entry lock; a concurrent registration may have won
        match self.by_email.entry(email.clone()) {
            Entry::Occupied(_) => Err(UserError::DuplicateEmail),
            Entry::Vacant(slot) => {
                let id = SubjectId::from(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
                slot.insert(StoredUser {
                    id: id.clone(),
                    email: email.clone(),
                    password_hash,
                });
                self.by_id.insert(id.clone(), email.clone());
                tracing::info!(subject = %id, "User registered");
                Ok(UserRecord { id, email })
            }
        }
    }

    async fn verify_password(&self, email: &str, password: &str) -> Result<SubjectId, UserError> {
        let email = normalize_email(email);
        let Some(user) = self.by_email.get(&email).map(|user| user.clone()) else {
            let dummy = self.dummy_hash().await?;
            check_password(dummy, password.to_string()).await?;
            return Err(UserError::InvalidCredentials);
        };

        if check_password(user.password_hash, password.to_string()).await? {
            Ok(user.id)
        } else {
            tracing::debug!(subject = %user.id, "Password mismatch");
            Err(UserError::InvalidCredentials)
        }
    }

    async fn find(&self, id: &SubjectId) -> Option<UserRecord> {
        let email = self.by_id.get(id)?.clone();
        self.by_email.get(&email).map(|user| UserRecord {
            id: user.id.clone(),
            email: user.email.clone(),
        })
    }
}

/// Hash a password off the async executor
async fn hash_password(password: String) -> Result<String, UserError> {
    tokio::task::spawn_blocking(move || {
        let mut salt_bytes = [0u8; 16];
        getrandom::getrandom(&mut salt_bytes).map_err(|e| UserError::Hashing(e.to_string()))?;
        let salt =
            SaltString::encode_b64(&salt_bytes).map_err(|e| UserError::Hashing(e.to_string()))?;
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|phc| phc.to_string())
            .map_err(|e| UserError::Hashing(e.to_string()))
    })
    .await
    .map_err(|e| UserError::Hashing(e.to_string()))?
}

/// Verify a password against a PHC string off the async executor.
///
/// `Ok(false)` is a mismatch; an unparseable stored hash or a failed blocking
/// task is an internal fault, not a wrong password.
async fn check_password(phc: String, password: String) -> Result<bool, UserError> {
    tokio::task::spawn_blocking(move || {
        let parsed = PasswordHash::new(&phc).map_err(|e| UserError::Hashing(e.to_string()))?;
        match Argon2::default().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(UserError::Hashing(e.to_string())),
        }
    })
    .await
    .map_err(|e| UserError::Hashing(e.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_then_verify() {
        let users = MemoryUserDirectory::new();
        let record = users.register("Ada@Example.com ", "hunter22").await.unwrap();

        assert_eq!(record.email, "ada@example.com");
        let subject = users.verify_password("ada@example.com", "hunter22").await.unwrap();
        assert_eq!(subject, record.id);
        assert_eq!(users.find(&subject).await, Some(record));
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_email_look_alike() {
        let users = MemoryUserDirectory::new();
        users.register("ada@example.com", "hunter22").await.unwrap();

        assert!(matches!(
            users.verify_password("ada@example.com", "hunter23").await,
            Err(UserError::InvalidCredentials)
        ));
        assert!(matches!(
            users.verify_password("bob@example.com", "hunter22").await,
            Err(UserError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let users = MemoryUserDirectory::new();
        users.register("ada@example.com", "hunter22").await.unwrap();

        assert!(matches!(
            users.register("ADA@example.com", "other-password").await,
            Err(UserError::DuplicateEmail)
        ));
        assert_eq!(users.len(), 1);
    }

    #[tokio::test]
    async fn test_ids_are_sequential() {
        let users = MemoryUserDirectory::new();
        let a = users.register("a@example.com", "password1").await.unwrap();
        let b = users.register("b@example.com", "password2").await.unwrap();

        assert_eq!(a.id.as_str(), "1");
        assert_eq!(b.id.as_str(), "2");
    }

    #[test]
    fn test_stored_hash_is_argon2id() {
        let users = MemoryUserDirectory::new();
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(users.register("a@example.com", "password1")).unwrap();

        let stored = users.by_email.get("a@example.com").unwrap();
        assert!(stored.password_hash.starts_with("$argon2id$"));
    }

    #[tokio::test]
    async fn test_corrupt_stored_hash_is_internal_error() {
        let users = MemoryUserDirectory::new();
        let id = SubjectId::from(7u64);
        users.by_email.insert(
            "a@example.com".to_string(),
            StoredUser {
                id: id.clone(),
                email: "a@example.com".to_string(),
                password_hash: "not-a-phc".to_string(),
            },
        );
        users.by_id.insert(id, "a@example.com".to_string());

        let err = users.verify_password("a@example.com", "whatever").await.unwrap_err();
        assert!(matches!(err, UserError::Hashing(_)));

        let api = crate::error::ApiError::from(err);
        assert!(matches!(api, crate::error::ApiError::Internal(_)));
        assert_eq!(api.status_code(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_unknown_email_verifies_against_dummy_hash() {
        let users = MemoryUserDirectory::new();
        assert!(users.dummy_hash.get().is_none());

        assert!(matches!(
            users.verify_password("nobody@example.com", "hunter22").await,
            Err(UserError::InvalidCredentials)
        ));

        let dummy = users.dummy_hash.get().unwrap();
        assert!(dummy.starts_with("$argon2id$"));
        assert!(PasswordHash::new(dummy).is_ok());

        // A second miss reuses the same hash
        users.verify_password("nobody@example.com", "other").await.unwrap_err();
        assert_eq!(users.dummy_hash.get(), Some(dummy));
    }
}
