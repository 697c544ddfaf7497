// src/services/users.rs

use std::sync::Arc;

use validator::Validate;

use crate::{
    error::AppError,
    models::user::{CreateUserRequest, Role, StoredUser, User},
    store::{Collection, DocumentStore, Documents, Filter, StoreError},
    utils::{
        clock::Clock,
        hash::{hash_password, verify_password},
    },
};

/// Account registry: registration, credential checks, email resolution.
#[derive(Clone)]
pub struct UserDirectory {
    users: Documents<StoredUser>,
    clock: Arc<dyn Clock>,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl UserDirectory {
    pub fn new(store: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            users: Documents::new(store, Collection::Users),
            clock,
        }
    }

    /// Registers a new account. Fails with `Conflict` if the email is taken.
    pub async fn register(&self, payload: CreateUserRequest) -> Result<User, AppError> {
        payload.validate()?;

        let email = normalize_email(&payload.email);
        if self.find_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        let stored = StoredUser {
            user: User {
                id: uuid::Uuid::new_v4().to_string(),
                email,
                full_name: payload.full_name.trim().to_string(),
                role: payload.role,
                is_active: true,
                created_at: self.clock.now(),
            },
            password_hash: hash_password(&payload.password)?,
        };

        self.users
            .insert(&stored.user.id, &stored)
            .await
            .map_err(|e| match e {
                // Lost a race with a concurrent registration of the same email.
                StoreError::Conflict(_) => AppError::Conflict("Email already registered".to_string()),
                other => {
                    tracing::error!("Failed to register user: {}", other);
                    AppError::from(other)
                }
            })?;

        tracing::info!(user_id = %stored.user.id, role = stored.user.role.as_str(), "registered user");
        Ok(stored.user)
    }

    /// Checks an email/password pair. Every mismatch reads the same to the caller.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User, AppError> {
        let stored = self
            .find_by_email(&normalize_email(email))
            .await?
            .ok_or_else(|| AppError::AuthError("Incorrect email or password".to_string()))?;

        if !verify_password(password, &stored.password_hash)? {
            return Err(AppError::AuthError("Incorrect email or password".to_string()));
        }

        if !stored.user.is_active {
            return Err(AppError::AuthError("Account is disabled".to_string()));
        }

        Ok(stored.user)
    }

    pub async fn get(&self, id: &str) -> Result<Option<User>, AppError> {
        Ok(self.users.get(id).await?.map(|s| s.user))
    }

    /// Splits `emails` into known accounts and addresses that match nobody.
    pub async fn resolve_emails(&self, emails: &[String]) -> Result<(Vec<User>, Vec<String>), AppError> {
        let mut found: Vec<User> = Vec::new();
        let mut unknown = Vec::new();

        for email in emails {
            let email = normalize_email(email);
            match self.find_by_email(&email).await? {
                Some(stored) => {
                    if !found.iter().any(|u| u.id == stored.user.id) {
                        found.push(stored.user);
                    }
                }
                None => unknown.push(email),
            }
        }

        Ok((found, unknown))
    }

    /// Creates the configured admin account unless the email is already registered.
    pub async fn seed_admin(&self, email: &str, password: &str) -> Result<(), AppError> {
        if self.find_by_email(&normalize_email(email)).await?.is_some() {
            return Ok(());
        }

        tracing::info!("Seeding admin user: {}", email);
        self.register(CreateUserRequest {
            email: email.to_string(),
            password: password.to_string(),
            full_name: "Administrator".to_string(),
            role: Role::Admin,
        })
        .await?;
        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<StoredUser>, AppError> {
        Ok(self
            .users
            .find_one(&Filter::new().eq("email", email))
            .await?)
    }
}
