use std::{collections::BTreeMap, sync::Arc};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    config::GENERAL_TOPIC,
    error::AppError,
    models::{
        mistake::{UserMistake, UserMistakeDetail, WeakPoint},
        pagination::{PagedResult, PaginationParams},
        user::Actor,
    },
    repositories::mistake_repository::{MistakeRepository, WeakPointRepository},
};

#[derive(Clone)]
pub struct MistakeService {
    mistakes: Arc<dyn MistakeRepository>,
    weak_points: Arc<dyn WeakPointRepository>,
}

impl MistakeService {
    pub fn new(
        mistakes: Arc<dyn MistakeRepository>,
        weak_points: Arc<dyn WeakPointRepository>,
    ) -> Self {
        Self {
            mistakes,
            weak_points,
        }
    }

    pub async fn record_mistake(&self, user_id: Uuid, quiz_id: Uuid) -> Result<UserMistake, AppError> {
        self.mistakes.upsert_wrong(user_id, quiz_id, Utc::now()).await
    }

    /// Resolves an existing mistake. Returns `None` when the user never got it wrong.
    pub async fn record_correct(
        &self,
        user_id: Uuid,
        quiz_id: Uuid,
    ) -> Result<Option<UserMistake>, AppError> {
        match self.mistakes.find_by_user_and_quiz(user_id, quiz_id).await? {
            Some(mistake) => Ok(Some(self.mistakes.mark_resolved(mistake.id, Utc::now()).await?)),
            None => Ok(None),
        }
    }

    pub async fn list_mistakes(
        &self,
        user_id: Uuid,
        include_resolved: bool,
        params: PaginationParams,
    ) -> Result<PagedResult<UserMistakeDetail>, AppError> {
        let page = params.resolve()?;
        let items = self
            .mistakes
            .list_by_user(user_id, include_resolved, page.limit(), page.offset())
            .await?;
        let total = self.mistakes.count_by_user(user_id, include_resolved).await?;
        Ok(PagedResult::new(items, total, page))
    }

    pub async fn delete_mistake(&self, actor: &Actor, id: Uuid) -> Result<(), AppError> {
        let mistake = self
            .mistakes
            .find_by_id(id)
            .await?
            .ok_or(AppError::NotFound("Mistake not found".to_string()))?;
        if mistake.user_id != actor.id {
            return Err(AppError::Forbidden(
                "You can only delete your own mistakes".to_string(),
            ));
        }
        self.mistakes.delete(id).await
    }

    /// Rebuilds the user's weak points from their unresolved mistakes.
    pub async fn refresh_weak_points(&self, user_id: Uuid) -> Result<Vec<WeakPoint>, AppError> {
        let unresolved = self.mistakes.list_unresolved(user_id).await?;
        let points = aggregate_weak_points(user_id, &unresolved, Utc::now());

        self.weak_points
            .replace_for_user(user_id, points.clone())
            .await?;
        tracing::debug!("Refreshed {} weak points for user {}", points.len(), user_id);
        Ok(points)
    }

    pub async fn list_weak_points(&self, user_id: Uuid) -> Result<Vec<WeakPoint>, AppError> {
        self.weak_points.list_by_user(user_id).await
    }
}

/// Groups mistakes by topic, sorted by mistake count descending then topic.
pub fn aggregate_weak_points(
    user_id: Uuid,
    mistakes: &[UserMistakeDetail],
    at: DateTime<Utc>,
) -> Vec<WeakPoint> {
    let mut by_topic: BTreeMap<String, (i32, i32)> = BTreeMap::new();
    for mistake in mistakes {
        let topic = mistake
            .topic
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(GENERAL_TOPIC)
            .to_string();
        let entry = by_topic.entry(topic).or_default();
        entry.0 += mistake.times_wrong;
        entry.1 += 1;
    }

    let mut points: Vec<WeakPoint> = by_topic
        .into_iter()
        .map(|(topic, (mistake_count, quiz_count))| WeakPoint {
            id: Uuid::new_v4(),
            user_id,
            topic,
            mistake_count,
            quiz_count,
            updated_at: at,
        })
        .collect();
    points.sort_by(|a, b| {
        b.mistake_count
            .cmp(&a.mistake_count)
            .then_with(|| a.topic.cmp(&b.topic))
    });
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::user::UserRole,
        repositories::mistake_repository::{MockMistakeRepository, MockWeakPointRepository},
    };

    fn detail(topic: Option<&str>, times_wrong: i32) -> UserMistakeDetail {
        UserMistakeDetail {
            id: Uuid::new_v4(),
            quiz_id: Uuid::new_v4(),
            question_text: "Q".to_string(),
            topic: topic.map(str::to_string),
            times_wrong,
            times_attempted: times_wrong,
            is_resolved: false,
            last_attempted_at: Utc::now(),
        }
    }

    fn mistake(user_id: Uuid) -> UserMistake {
        let now = Utc::now();
        UserMistake {
            id: Uuid::new_v4(),
            user_id,
            quiz_id: Uuid::new_v4(),
            times_wrong: 2,
            times_attempted: 3,
            is_resolved: false,
            last_attempted_at: now,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn weak_points_group_by_topic_with_general_fallback() {
        let user = Uuid::new_v4();
        let points = aggregate_weak_points(
            user,
            &[
                detail(Some("Lifetimes"), 3),
                detail(Some("Lifetimes"), 1),
                detail(None, 2),
                detail(Some(" "), 2),
                detail(Some("Async"), 4),
            ],
            Utc::now(),
        );

        let summary: Vec<_> = points
            .iter()
            .map(|p| (p.topic.as_str(), p.mistake_count, p.quiz_count))
            .collect();
        assert_eq!(
            summary,
            vec![("Async", 4, 1), (GENERAL_TOPIC, 4, 2), ("Lifetimes", 4, 2)]
        );
        assert!(points.iter().all(|p| p.user_id == user));
    }

    #[tokio::test]
    async fn record_correct_without_mistake_is_noop() {
        let mut mistakes = MockMistakeRepository::new();
        mistakes.expect_find_by_user_and_quiz().times(1).returning(|_, _| Ok(None));
        mistakes.expect_mark_resolved().times(0);

        let service = MistakeService::new(Arc::new(mistakes), Arc::new(MockWeakPointRepository::new()));
        assert!(service
            .record_correct(Uuid::new_v4(), Uuid::new_v4())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn record_correct_resolves_existing_mistake() {
        let user = Uuid::new_v4();
        let existing = mistake(user);
        let id = existing.id;
        let mut resolved = existing.clone();
        resolved.is_resolved = true;
        resolved.times_attempted += 1;

        let mut mistakes = MockMistakeRepository::new();
        mistakes.expect_find_by_user_and_quiz()
            .times(1)
            .return_once(move |_, _| Ok(Some(existing)));
        mistakes.expect_mark_resolved()
            .withf(move |mid, _| *mid == id)
            .times(1)
            .return_once(move |_, _| Ok(resolved));

        let service = MistakeService::new(Arc::new(mistakes), Arc::new(MockWeakPointRepository::new()));
        let result = service.record_correct(user, Uuid::new_v4()).await.unwrap().unwrap();
        assert!(result.is_resolved);
        assert_eq!(result.times_attempted, 4);
    }

    #[tokio::test]
    async fn delete_foreign_mistake_is_forbidden() {
        let existing = mistake(Uuid::new_v4());
        let id = existing.id;
        let mut mistakes = MockMistakeRepository::new();
        mistakes.expect_find_by_id().times(1).return_once(move |_| Ok(Some(existing)));
        mistakes.expect_delete().times(0);

        let service = MistakeService::new(Arc::new(mistakes), Arc::new(MockWeakPointRepository::new()));
        let err = service
            .delete_mistake(&Actor::new(Uuid::new_v4(), UserRole::Admin), id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn refresh_replaces_stored_weak_points() {
        let user = Uuid::new_v4();
        let mut mistakes = MockMistakeRepository::new();
        mistakes.expect_list_unresolved()
            .times(1)
            .returning(|_| Ok(vec![detail(Some("Traits"), 2), detail(Some("Traits"), 1)]));
        let mut weak_points = MockWeakPointRepository::new();
        weak_points.expect_replace_for_user()
            .withf(move |u, points| {
                *u == user && points.len() == 1 && points[0].mistake_count == 3 && points[0].quiz_count == 2
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let service = MistakeService::new(Arc::new(mistakes), Arc::new(weak_points));
        let points = service.refresh_weak_points(user).await.unwrap();
        assert_eq!(points[0].topic, "Traits");
    }
}
