use std::sync::Arc;

use uuid::Uuid;

use crate::{
    config::Config,
    error::AppError,
    models::user::{
        Actor, AuthResponse, ChangePasswordRequest, LoginRequest, RegisterRequest, User, UserDto,
        UserRole,
    },
    repositories::user_repository::UserRepository,
    services::subscription_service::SubscriptionService,
    utils::{
        hash::{hash_password, verify_password},
        jwt::sign_jwt,
    },
};

const INVALID_CREDENTIALS: &str = "Invalid username or password";

#[derive(Clone)]
pub struct IdentityService {
    users: Arc<dyn UserRepository>,
    subscriptions: Arc<SubscriptionService>,
    jwt_secret: String,
    jwt_expiration: u64,
}

impl IdentityService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        subscriptions: Arc<SubscriptionService>,
        config: &Config,
    ) -> Self {
        Self {
            users,
            subscriptions,
            jwt_secret: config.jwt_secret.clone(),
            jwt_expiration: config.jwt_expiration,
        }
    }

    pub async fn register(&self, req: RegisterRequest) -> Result<UserDto, AppError> {
        let username = req.username.trim().to_string();
        let email = req.email.trim().to_lowercase();

        if self.users.find_by_username(&username).await?.is_some() {
            return Err(AppError::Conflict("Username already exists".to_string()));
        }
        if self.users.find_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        let password_hash = hash_password(&req.password)?;
        let mut user = User::new(username, email, password_hash, UserRole::User);
        user.full_name = req.full_name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());

        let created = self.users.create(user).await?;
        // A user without a plan has free-tier access.
        if let Err(e) = self.subscriptions.ensure_free_subscription(created.id).await {
            tracing::error!("Failed to attach free plan to user {}: {:?}", created.id, e);
        }

        tracing::info!("User registered: {}", created.username);
        Ok(created.into())
    }

    pub async fn login(&self, req: LoginRequest) -> Result<AuthResponse, AppError> {
        let identifier = req.email_or_username.trim();

        let user = match self.users.find_by_email(identifier).await? {
            Some(user) => Some(user),
            None => self.users.find_by_username(identifier).await?,
        }
        .filter(|u| !u.is_deleted())
        .ok_or_else(|| AppError::AuthError(INVALID_CREDENTIALS.to_string()))?;

        if !verify_password(&req.password, &user.password_hash)? {
            tracing::warn!("Failed login for user {}", user.username);
            return Err(AppError::AuthError(INVALID_CREDENTIALS.to_string()));
        }

        let token = sign_jwt(user.id, user.role, &self.jwt_secret, self.jwt_expiration)?;
        Ok(AuthResponse {
            token,
            token_type: "Bearer".to_string(),
            expires_in: self.jwt_expiration,
            user: user.into(),
        })
    }

    /// The caller's own profile.
    pub async fn me(&self, actor: &Actor) -> Result<UserDto, AppError> {
        self.active_user(actor.id).await.map(UserDto::from)
    }

    pub async fn change_password(
        &self,
        actor: &Actor,
        req: ChangePasswordRequest,
    ) -> Result<(), AppError> {
        let mut user = self.active_user(actor.id).await?;

        if !verify_password(&req.current_password, &user.password_hash)? {
            return Err(AppError::AuthError("Current password is incorrect".to_string()));
        }
        if req.current_password == req.new_password {
            return Err(AppError::BadRequest(
                "New password must differ from the current one".to_string(),
            ));
        }

        user.password_hash = hash_password(&req.new_password)?;
        self.users.update(user).await?;
        tracing::info!("Password changed for user {}", actor.id);
        Ok(())
    }

    /// Creates the admin account on first start. Does nothing if the username is taken.
    pub async fn seed_admin(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<(), AppError> {
        if self.users.find_by_username(username).await?.is_some() {
            tracing::info!("Admin user '{}' already exists. Skipping seed.", username);
            return Ok(());
        }

        let password_hash = hash_password(password)?;
        let admin = User::new(
            username.to_string(),
            email.trim().to_lowercase(),
            password_hash,
            UserRole::Admin,
        );
        let created = self.users.create(admin).await?;
        if let Err(e) = self.subscriptions.ensure_free_subscription(created.id).await {
            tracing::error!("Failed to attach free plan to admin {}: {:?}", created.id, e);
        }

        tracing::info!("Admin user '{}' created successfully.", username);
        Ok(())
    }

    async fn active_user(&self, id: Uuid) -> Result<User, AppError> {
        self.users
            .find_by_id(id)
            .await?
            .filter(|u| !u.is_deleted())
            .ok_or(AppError::NotFound("User not found".to_string()))
    }
}
