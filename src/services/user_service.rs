use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        pagination::{PagedResult, PaginationParams},
        user::{Actor, UpdateProfileRequest, User, UserDto, UserRole},
    },
    repositories::user_repository::UserRepository,
    utils::validation::ensure_http_url,
};

#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserRepository>,
}

impl UserService {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    pub async fn get_user(&self, id: Uuid) -> Result<UserDto, AppError> {
        self.active(id).await.map(UserDto::from)
    }

    pub async fn list_users(
        &self,
        params: PaginationParams,
        search: Option<String>,
    ) -> Result<PagedResult<UserDto>, AppError> {
        let page = params.resolve()?;
        let search = search.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());

        let users = self
            .users
            .list(search.clone(), page.limit(), page.offset())
            .await?;
        let total = self.users.count(search).await?;

        Ok(PagedResult::new(users, total, page).map(UserDto::from))
    }

    pub async fn update_profile(
        &self,
        actor: &Actor,
        id: Uuid,
        req: UpdateProfileRequest,
    ) -> Result<UserDto, AppError> {
        if !actor.is_owner_or_admin(id) {
            return Err(AppError::Forbidden(
                "You can only edit your own profile".to_string(),
            ));
        }
        let mut user = self.active(id).await?;

        if let Some(username) = req.username {
            let username = username.trim().to_string();
            if !username.eq_ignore_ascii_case(&user.username) {
                if self.users.find_by_username(&username).await?.is_some() {
                    return Err(AppError::Conflict("Username already exists".to_string()));
                }
            }
            user.username = username;
        }
        if let Some(full_name) = req.full_name {
            let full_name = full_name.trim().to_string();
            user.full_name = (!full_name.is_empty()).then_some(full_name);
        }
        if let Some(avatar_url) = req.avatar_url {
            let avatar_url = avatar_url.trim().to_string();
            if avatar_url.is_empty() {
                user.avatar_url = None;
            } else {
                ensure_http_url("avatar_url", &avatar_url)?;
                user.avatar_url = Some(avatar_url);
            }
        }

        let updated = self.users.update(user).await?;
        Ok(updated.into())
    }

    pub async fn change_role(
        &self,
        actor: &Actor,
        id: Uuid,
        role: UserRole,
    ) -> Result<UserDto, AppError> {
        if !actor.is_admin() {
            return Err(AppError::Forbidden("Admin access required".to_string()));
        }
        if actor.id == id {
            return Err(AppError::InvalidOperation(
                "You cannot change your own role".to_string(),
            ));
        }
        let mut user = self.active(id).await?;
        user.role = role;

        let updated = self.users.update(user).await?;
        tracing::info!("User {} role changed to {}", updated.id, role.as_str());
        Ok(updated.into())
    }

    pub async fn delete_user(&self, actor: &Actor, id: Uuid) -> Result<(), AppError> {
        if !actor.is_admin() {
            return Err(AppError::Forbidden("Admin access required".to_string()));
        }
        if actor.id == id {
            return Err(AppError::InvalidOperation(
                "You cannot delete your own account".to_string(),
            ));
        }
        self.active(id).await?;
        self.users.soft_delete(id, Utc::now()).await?;
        tracing::info!("User {} deleted by {}", id, actor.id);
        Ok(())
    }

    pub async fn restore_user(&self, id: Uuid) -> Result<UserDto, AppError> {
        let mut user = self
            .users
            .find_by_id(id)
            .await?
            .ok_or(AppError::NotFound("User not found".to_string()))?;
        if !user.is_deleted() {
            return Err(AppError::InvalidOperation("User is not deleted".to_string()));
        }

        self.users.restore(id).await?;
        user.deleted_at = None;
        tracing::info!("User {} restored", id);
        Ok(user.into())
    }

    /// Soft-deleted users are reported as missing.
    async fn active(&self, id: Uuid) -> Result<User, AppError> {
        self.users
            .find_by_id(id)
            .await?
            .filter(|u| !u.is_deleted())
            .ok_or(AppError::NotFound("User not found".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::repositories::user_repository::MockUserRepository;

    fn user(name: &str) -> User {
        User::new(name.to_string(), format!("{name}@example.com"), "h".to_string(), UserRole::User)
    }

    #[tokio::test]
    async fn deleted_user_is_not_found() {
        let mut u = user("bob");
        u.deleted_at = Some(Utc::now());
        let mut repo = MockUserRepository::new();
        repo.expect_find_by_id().times(1).return_once(move |_| Ok(Some(u)));

        let err = UserService::new(Arc::new(repo))
            .get_user(Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn list_users_passes_trimmed_search_and_window() {
        let mut repo = MockUserRepository::new();
        repo.expect_list()
            .withf(|search, limit, offset| {
                search.as_deref() == Some("ali") && *limit == 20 && *offset == 40
            })
            .times(1)
            .returning(|_, _, _| Ok(vec![user("alice"), user("alina")]));
        repo.expect_count().times(1).returning(|_| Ok(42));

        let page = UserService::new(Arc::new(repo))
            .list_users(PaginationParams::new(3, 20), Some("  ali ".to_string()))
            .await
            .unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.total_count, 42);
        assert_eq!(page.total_pages, 3);
    }

    #[tokio::test]
    async fn update_profile_of_someone_else_is_forbidden() {
        let repo = MockUserRepository::new();
        let err = UserService::new(Arc::new(repo))
            .update_profile(
                &Actor::new(Uuid::new_v4(), UserRole::Moderator),
                Uuid::new_v4(),
                UpdateProfileRequest::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn update_profile_rejects_taken_username() {
        let me = user("alice");
        let id = me.id;
        let mut repo = MockUserRepository::new();
        repo.expect_find_by_id().times(1).return_once(move |_| Ok(Some(me)));
        repo.expect_find_by_username()
            .times(1)
            .return_once(|_| Ok(Some(user("bob"))));
        repo.expect_update().times(0);

        let err = UserService::new(Arc::new(repo))
            .update_profile(
                &Actor::new(id, UserRole::User),
                id,
                UpdateProfileRequest {
                    username: Some("bob".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn update_profile_validates_avatar_url() {
        let me = user("alice");
        let id = me.id;
        let mut repo = MockUserRepository::new();
        repo.expect_find_by_id().times(1).return_once(move |_| Ok(Some(me)));

        let err = UserService::new(Arc::new(repo))
            .update_profile(
                &Actor::new(id, UserRole::User),
                id,
                UpdateProfileRequest {
                    avatar_url: Some("javascript:alert(1)".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[rstest]
    #[case(UserRole::User)]
    #[case(UserRole::Moderator)]
    #[tokio::test]
    async fn only_admins_change_roles(#[case] role: UserRole) {
        let err = UserService::new(Arc::new(MockUserRepository::new()))
            .change_role(&Actor::new(Uuid::new_v4(), role), Uuid::new_v4(), UserRole::Admin)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn admin_cannot_delete_self() {
        let id = Uuid::new_v4();
        let mut repo = MockUserRepository::new();
        repo.expect_soft_delete().times(0);

        let err = UserService::new(Arc::new(repo))
            .delete_user(&Actor::new(id, UserRole::Admin), id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidOperation(_)));
    }

    #[tokio::test]
    async fn restore_requires_deleted_user() {
        let u = user("carol");
        let mut repo = MockUserRepository::new();
        repo.expect_find_by_id().times(1).return_once(move |_| Ok(Some(u)));
        repo.expect_restore().times(0);

        let err = UserService::new(Arc::new(repo))
            .restore_user(Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidOperation(_)));
    }

    #[tokio::test]
    async fn restore_clears_deleted_at() {
        let mut u = user("carol");
        u.deleted_at = Some(Utc::now());
        let id = u.id;
        let mut repo = MockUserRepository::new();
        repo.expect_find_by_id().times(1).return_once(move |_| Ok(Some(u)));
        repo.expect_restore()
            .withf(move |rid| *rid == id)
            .times(1)
            .returning(|_| Ok(()));

        let dto = UserService::new(Arc::new(repo)).restore_user(id).await.unwrap();
        assert_eq!(dto.id, id);
    }
}
