use std::collections::BTreeSet;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;

use crate::{AuthError, StoreError};

use super::user::{NewUser, Role, User, UserRepository, ADMIN_ROLE};

/// In-memory [`UserRepository`].
///
/// Clones share state. Every trait call bumps [`call_count`](Self::call_count),
/// and [`fail_with`](Self::fail_with) makes subsequent calls return an error.
#[derive(Clone)]
pub struct MockUserRepository {
    pub users: Arc<Mutex<Vec<User>>>,
    pub roles: Arc<Mutex<Vec<Role>>>,
    next_id: Arc<AtomicI64>,
    calls: Arc<AtomicUsize>,
    failure: Arc<Mutex<Option<StoreError>>>,
}

impl MockUserRepository {
    /// Starts with the seeded `Admin` role and no users.
    pub fn new() -> Self {
        Self {
            users: Arc::new(Mutex::new(vec![])),
            roles: Arc::new(Mutex::new(vec![Role {
                id: 1,
                identifier: ADMIN_ROLE.to_owned(),
                description: Some("Administrator".to_owned()),
            }])),
            next_id: Arc::new(AtomicI64::new(1)),
            calls: Arc::new(AtomicUsize::new(0)),
            failure: Arc::new(Mutex::new(None)),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn fail_with(&self, error: Option<StoreError>) {
        if let Ok(mut failure) = self.failure.lock() {
            *failure = error;
        }
    }

    /// Inserts a user directly, bypassing hashing and uniqueness checks.
    pub fn insert(&self, mut user: User) -> User {
        user.id = self.next_id.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut users) = self.users.lock() {
            users.push(user.clone());
        }
        user
    }

    fn enter(&self) -> Result<(), AuthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let failure = self.failure.lock().map_err(|_| StoreError::LockPoisoned)?;
        match failure.as_ref() {
            Some(err) => Err(err.clone().into()),
            None => Ok(()),
        }
    }

    fn users(&self) -> Result<MutexGuard<'_, Vec<User>>, AuthError> {
        Ok(self.users.lock().map_err(|_| StoreError::LockPoisoned)?)
    }
}

impl Default for MockUserRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserRepository for MockUserRepository {
    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>, AuthError> {
        self.enter()?;
        Ok(self.users()?.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        self.enter()?;
        Ok(self.users()?.iter().find(|u| u.email == email).cloned())
    }

    async fn create_user(&self, user: &NewUser, hashed_password: &str) -> Result<User, AuthError> {
        self.enter()?;
        let mut users = self.users()?;
        if users.iter().any(|u| u.email == user.email) {
            return Err(AuthError::DuplicateEmail);
        }

        let created = User {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            email: user.email.clone(),
            username: user.username.clone(),
            hashed_password: hashed_password.to_owned(),
            roles: BTreeSet::new(),
            created_at: Utc::now(),
        };
        users.push(created.clone());
        drop(users);

        Ok(created)
    }

    async fn find_role(&self, identifier: &str) -> Result<Option<Role>, AuthError> {
        self.enter()?;
        let roles = self.roles.lock().map_err(|_| StoreError::LockPoisoned)?;
        Ok(roles.iter().find(|r| r.identifier == identifier).cloned())
    }

    async fn assign_role(&self, user_id: i64, role: &str) -> Result<(), AuthError> {
        self.enter()?;
        let known = self
            .roles
            .lock()
            .map_err(|_| StoreError::LockPoisoned)?
            .iter()
            .any(|r| r.identifier == role);
        if !known {
            return Err(AuthError::RoleNotFound(role.to_owned()));
        }

        let mut users = self.users()?;
        let user = users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or_else(|| StoreError::CorruptRecord(format!("no user with id {user_id}")))?;
        user.roles.insert(role.to_owned());
        Ok(())
    }
}
