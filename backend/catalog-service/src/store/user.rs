//! User records and their store.

use crate::error::StoreError;
use parking_lot::RwLock;
use std::collections::HashMap;

/// A provisioned identity. The password is hashed at construction and
/// never kept in clear.
#[derive(Debug, Clone)]
pub struct User {
    pub username: String,
    pub role: String,
    password_hash: String,
}

impl User {
    pub fn new(username: &str, password: &str, role: &str) -> Result<Self, bcrypt::BcryptError> {
        let password_hash = bcrypt::hash(password, bcrypt::DEFAULT_COST)?;
        Ok(Self {
            username: username.to_owned(),
            role: role.to_owned(),
            password_hash,
        })
    }

    pub fn verify_password(&self, password: &str) -> bool {
        bcrypt::verify(password, &self.password_hash).unwrap_or(false)
    }
}

/// Username-keyed user records; lookups return copies.
pub trait UserStore: Send + Sync {
    fn save(&self, user: User) -> Result<(), StoreError>;
    fn find(&self, username: &str) -> Option<User>;
}

#[derive(Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<String, User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UserStore for InMemoryUserStore {
    fn save(&self, user: User) -> Result<(), StoreError> {
        let mut users = self.users.write();
        if users.contains_key(&user.username) {
            return Err(StoreError::AlreadyExists);
        }
        users.insert(user.username.clone(), user);
        Ok(())
    }

    fn find(&self, username: &str) -> Option<User> {
        self.users.read().get(username).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_password_accepts_the_right_password_only() {
        let user = User::new("admin1", "secret", "admin").unwrap();
        assert!(user.verify_password("secret"));
        assert!(!user.verify_password("wrong"));
    }

    #[test]
    fn save_rejects_duplicate_usernames() {
        let store = InMemoryUserStore::new();
        store
            .save(User::new("admin1", "secret", "admin").unwrap())
            .unwrap();
        let err = store
            .save(User::new("admin1", "other", "user").unwrap())
            .unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists));
    }

    #[test]
    fn find_returns_a_copy() {
        let store = InMemoryUserStore::new();
        store
            .save(User::new("user1", "secret", "user").unwrap())
            .unwrap();

        let mut copy = store.find("user1").unwrap();
        copy.role = "admin".into();
        assert_eq!(store.find("user1").unwrap().role, "user");
    }
}
