use chrono::{DateTime, Utc};

use crate::crypto::PasswordHasher;
use crate::events::{AuthEvent, EventDispatcher};
use crate::validators::{validate_email, validate_username, PasswordPolicy};
use crate::{AuthError, NewUser, SecretString, User, UserRepository};

pub struct RegisterAction<'a, U: UserRepository> {
    users: &'a U,
    hasher: &'a dyn PasswordHasher,
    policy: &'a PasswordPolicy,
    events: &'a EventDispatcher,
}

impl<'a, U: UserRepository> RegisterAction<'a, U> {
    pub fn new(
        users: &'a U,
        hasher: &'a dyn PasswordHasher,
        policy: &'a PasswordPolicy,
        events: &'a EventDispatcher,
    ) -> Self {
        Self {
            users,
            hasher,
            policy,
            events,
        }
    }

    /// Validates the input, rejects a taken email, hashes the password with
    /// a fresh salt and creates the user.
    ///
    /// # Errors
    ///
    /// - `AuthError::Validation` for a malformed email or username, or a
    ///   password the policy rejects
    /// - `AuthError::DuplicateEmail` if the email is taken, including when a
    ///   concurrent registration wins the race inside the store
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "register", skip_all, err)
    )]
    pub async fn execute(
        &self,
        user: &NewUser,
        password: &SecretString,
        now: DateTime<Utc>,
    ) -> Result<User, AuthError> {
        validate_email(&user.email)?;
        validate_username(&user.username)?;
        self.policy.validate(password.expose_secret())?;

        if self.users.find_user_by_email(&user.email).await?.is_some() {
            log::info!(
                target: "gatehouse",
                "msg=\"registration rejected\" reason=\"duplicate email\""
            );
            return Err(AuthError::DuplicateEmail);
        }

        let hashed = self.hasher.hash(password.expose_secret())?;
        let created = self.users.create_user(user, &hashed).await?;

        self.events
            .dispatch(AuthEvent::UserRegistered {
                user_id: created.id,
                email: created.email.clone(),
                at: now,
            })
            .await;

        log::info!(target: "gatehouse", "msg=\"user registered\" user_id={}", created.id);

        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Argon2Hasher;
    use crate::validators::ValidationError;
    use crate::MockUserRepository;

    struct Setup {
        users: MockUserRepository,
        hasher: Argon2Hasher,
        policy: PasswordPolicy,
        events: EventDispatcher,
    }

    impl Setup {
        fn new() -> Self {
            Self {
                users: MockUserRepository::new(),
                hasher: Argon2Hasher::new(1024, 1, 1),
                policy: PasswordPolicy::default(),
                events: EventDispatcher::new(),
            }
        }

        fn action(&self) -> RegisterAction<'_, MockUserRepository> {
            RegisterAction::new(&self.users, &self.hasher, &self.policy, &self.events)
        }
    }

    #[tokio::test]
    async fn test_register_success() {
        let setup = Setup::new();

        let user = setup
            .action()
            .execute(
                &NewUser::new("a@x.com", "alice"),
                &SecretString::new("p1"),
                Utc::now(),
            )
            .await
            .unwrap();

        assert_eq!(user.email, "a@x.com");
        assert_eq!(user.username, "alice");
        assert_ne!(user.hashed_password, "p1");
        assert!(setup.hasher.verify("p1", &user.hashed_password).unwrap());
    }

    #[tokio::test]
    async fn test_register_duplicate_email() {
        let setup = Setup::new();
        let action = setup.action();
        let user = NewUser::new("a@x.com", "alice");
        action
            .execute(&user, &SecretString::new("p1"), Utc::now())
            .await
            .unwrap();

        let err = action
            .execute(&user, &SecretString::new("p2"), Utc::now())
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::DuplicateEmail);
        assert_eq!(setup.users.users.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_register_validates_input() {
        let setup = Setup::new();
        let action = setup.action();

        let err = action
            .execute(
                &NewUser::new("not-an-email", "alice"),
                &SecretString::new("p1"),
                Utc::now(),
            )
            .await
            .unwrap_err();
        assert_eq!(
            err,
            AuthError::Validation(ValidationError::EmailInvalidFormat)
        );

        let err = action
            .execute(
                &NewUser::new("a@x.com", ""),
                &SecretString::new("p1"),
                Utc::now(),
            )
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::Validation(ValidationError::UsernameEmpty));

        let err = action
            .execute(
                &NewUser::new("a@x.com", "alice"),
                &SecretString::new(""),
                Utc::now(),
            )
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::Validation(ValidationError::PasswordEmpty));
        assert_eq!(setup.users.call_count(), 0);
    }

    #[tokio::test]
    async fn test_register_applies_policy() {
        let mut setup = Setup::new();
        setup.policy = PasswordPolicy::standard();

        let err = setup
            .action()
            .execute(
                &NewUser::new("a@x.com", "alice"),
                &SecretString::new("p1"),
                Utc::now(),
            )
            .await
            .unwrap_err();
        assert_eq!(
            err,
            AuthError::Validation(ValidationError::PasswordTooShort(8))
        );
    }
}
