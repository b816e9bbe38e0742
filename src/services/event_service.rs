use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        event::{
            CreateEventRequest, Event, EventDto, EventLeaderboardEntry, EventParticipant,
            EventStatus, UpdateEventRequest,
        },
        notification::NotificationType,
        pagination::{PagedResult, PaginationParams},
        quiz_attempt::AttemptStatus,
        quiz_set::QuizSetType,
        user::Actor,
    },
    repositories::{
        event_repository::EventRepository, quiz_attempt_repository::QuizAttemptRepository,
        quiz_set_repository::QuizSetRepository,
    },
    services::notification_service::NotificationService,
    utils::{html::clean_optional, ranking::rank_by_score, validation::ensure_date_range},
};

#[derive(Clone)]
pub struct EventService {
    events: Arc<dyn EventRepository>,
    quiz_sets: Arc<dyn QuizSetRepository>,
    attempts: Arc<dyn QuizAttemptRepository>,
    notifications: Arc<NotificationService>,
}

impl EventService {
    pub fn new(
        events: Arc<dyn EventRepository>,
        quiz_sets: Arc<dyn QuizSetRepository>,
        attempts: Arc<dyn QuizAttemptRepository>,
        notifications: Arc<NotificationService>,
    ) -> Self {
        Self {
            events,
            quiz_sets,
            attempts,
            notifications,
        }
    }

    pub async fn create(&self, actor: &Actor, req: CreateEventRequest) -> Result<Event, AppError> {
        let name = req.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::BadRequest("Event name is required".to_string()));
        }
        if self.events.find_by_name(&name).await?.is_some() {
            return Err(AppError::Conflict(format!("Event '{name}' already exists")));
        }
        ensure_date_range(req.start_date, req.end_date)?;
        if req.start_date < Utc::now() {
            return Err(AppError::BadRequest(
                "Event cannot start in the past".to_string(),
            ));
        }
        ensure_capacity(req.max_participants)?;
        self.ensure_event_quiz_set(req.quiz_set_id).await?;

        let now = Utc::now();
        let event = Event {
            id: Uuid::new_v4(),
            name,
            description: clean_optional(req.description.as_deref()),
            quiz_set_id: req.quiz_set_id,
            start_date: req.start_date,
            end_date: req.end_date,
            max_participants: req.max_participants,
            status: EventStatus::Upcoming,
            created_by: actor.id,
            created_at: now,
            updated_at: now,
        };
        let created = self.events.create(event).await?;
        tracing::info!("Event created: {} ({})", created.name, created.id);
        Ok(created)
    }

    pub async fn get(&self, id: Uuid) -> Result<EventDto, AppError> {
        let event = self.find(id).await?;
        let participant_count = self.events.count_participants(id).await?;
        Ok(EventDto {
            event,
            participant_count,
        })
    }

    pub async fn list(
        &self,
        status: Option<EventStatus>,
        params: PaginationParams,
    ) -> Result<PagedResult<Event>, AppError> {
        let page = params.resolve()?;
        let items = self.events.list(status, page.limit(), page.offset()).await?;
        let total = self.events.count(status).await?;
        Ok(PagedResult::new(items, total, page))
    }

    pub async fn update(
        &self,
        actor: &Actor,
        id: Uuid,
        req: UpdateEventRequest,
    ) -> Result<Event, AppError> {
        let mut event = self.managed(actor, id).await?;
        ensure_upcoming(&event, "updated")?;

        if let Some(name) = req.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(AppError::BadRequest("Event name is required".to_string()));
            }
            if name != event.name {
                if let Some(existing) = self.events.find_by_name(&name).await? {
                    if existing.id != event.id {
                        return Err(AppError::Conflict(format!("Event '{name}' already exists")));
                    }
                }
            }
            event.name = name;
        }
        if let Some(description) = req.description {
            event.description = clean_optional(Some(&description));
        }
        if let Some(quiz_set_id) = req.quiz_set_id {
            self.ensure_event_quiz_set(quiz_set_id).await?;
            event.quiz_set_id = quiz_set_id;
        }
        if let Some(start_date) = req.start_date {
            event.start_date = start_date;
        }
        if let Some(end_date) = req.end_date {
            event.end_date = end_date;
        }
        ensure_date_range(event.start_date, event.end_date)?;
        if let Some(max) = req.max_participants {
            ensure_capacity(max)?;
            if i64::from(max) < self.events.count_participants(id).await? {
                return Err(AppError::InvalidOperation(
                    "Capacity is below the current participant count".to_string(),
                ));
            }
            event.max_participants = max;
        }

        self.events.update(event).await
    }

    pub async fn delete(&self, actor: &Actor, id: Uuid) -> Result<(), AppError> {
        let event = self.managed(actor, id).await?;
        ensure_upcoming(&event, "deleted")?;
        self.events.delete(id).await?;
        tracing::info!("Event {} deleted by {}", id, actor.id);
        Ok(())
    }

    pub async fn start(&self, actor: &Actor, id: Uuid) -> Result<Event, AppError> {
        let event = self.transition(actor, id, EventStatus::Active).await?;

        let participants: Vec<Uuid> = self
            .events
            .list_participants(id)
            .await?
            .into_iter()
            .map(|p| p.participant_id)
            .collect();
        self.notifications
            .notify_many(
                &participants,
                NotificationType::Event,
                "Event started",
                &format!("The event '{}' has started. Good luck!", event.name),
            )
            .await?;
        Ok(event)
    }

    /// Ends the event, persists final ranks and tells every participant where they placed.
    pub async fn end(&self, actor: &Actor, id: Uuid) -> Result<Event, AppError> {
        let event = self.transition(actor, id, EventStatus::Ended).await?;

        let ranked = rank_by_score(
            self.events.list_participants(id).await?,
            |p| i64::from(p.score),
            |p| p.joined_at,
        );
        let ranks = ranked
            .iter()
            .map(|(rank, p)| (p.participant_id, *rank as i32))
            .collect();
        self.events.set_final_ranks(id, ranks).await?;

        for (rank, participant) in &ranked {
            self.notifications
                .notify(
                    participant.participant_id,
                    NotificationType::Event,
                    "Event ended",
                    &format!(
                        "The event '{}' has ended. You placed #{} with {} points.",
                        event.name, rank, participant.score
                    ),
                )
                .await?;
        }
        tracing::info!("Event {} ended with {} participants", id, ranked.len());
        Ok(event)
    }

    pub async fn join(&self, actor: &Actor, id: Uuid) -> Result<EventParticipant, AppError> {
        let event = self.find(id).await?;
        if event.status == EventStatus::Ended {
            return Err(AppError::InvalidOperation("Event has already ended".to_string()));
        }
        if self.events.find_participant(id, actor.id).await?.is_some() {
            return Err(AppError::Conflict("Already joined this event".to_string()));
        }
        if self.events.count_participants(id).await? >= i64::from(event.max_participants) {
            return Err(AppError::InvalidOperation("Event is full".to_string()));
        }

        let participant = EventParticipant::new(id, actor.id);
        self.events.add_participant(participant.clone()).await?;
        tracing::info!("User {} joined event {}", actor.id, id);
        Ok(participant)
    }

    pub async fn leave(&self, actor: &Actor, id: Uuid) -> Result<(), AppError> {
        let event = self.find(id).await?;
        if event.status != EventStatus::Upcoming {
            return Err(AppError::InvalidOperation(
                "You can only leave an event before it starts".to_string(),
            ));
        }
        if self.events.find_participant(id, actor.id).await?.is_none() {
            return Err(AppError::NotFound(
                "You are not a participant of this event".to_string(),
            ));
        }
        self.events.remove_participant(id, actor.id).await
    }

    /// Credits a completed attempt to the participant. Only a better score replaces the stored one.
    pub async fn record_attempt_result(
        &self,
        actor: &Actor,
        id: Uuid,
        attempt_id: Uuid,
    ) -> Result<EventParticipant, AppError> {
        let event = self.find(id).await?;
        if event.status != EventStatus::Active {
            return Err(AppError::InvalidOperation("Event is not active".to_string()));
        }
        let mut participant = self
            .events
            .find_participant(id, actor.id)
            .await?
            .ok_or(AppError::Forbidden(
                "You are not a participant of this event".to_string(),
            ))?;

        let attempt = self
            .attempts
            .find_by_id(attempt_id)
            .await?
            .ok_or(AppError::NotFound("Attempt not found".to_string()))?;
        if attempt.user_id != actor.id {
            return Err(AppError::Forbidden(
                "This attempt belongs to another user".to_string(),
            ));
        }
        if attempt.status != AttemptStatus::Completed {
            return Err(AppError::InvalidOperation(
                "Attempt is not completed".to_string(),
            ));
        }
        if attempt.quiz_set_id != event.quiz_set_id {
            return Err(AppError::BadRequest(
                "Attempt is not on this event's quiz set".to_string(),
            ));
        }

        if participant.finished_at.is_none() || attempt.score > participant.score {
            participant.score = attempt.score;
            participant.accuracy = attempt.accuracy;
            participant.finished_at = attempt.completed_at;
            self.events.update_participant(participant.clone()).await?;
            tracing::debug!("Event {} participant {} scored {}", id, actor.id, attempt.score);
        }
        Ok(participant)
    }

    pub async fn leaderboard(&self, id: Uuid) -> Result<Vec<EventLeaderboardEntry>, AppError> {
        self.find(id).await?;
        let participants = self.events.list_participants(id).await?;

        Ok(rank_by_score(participants, |p| i64::from(p.score), |p| p.joined_at)
            .into_iter()
            .map(|(rank, p)| EventLeaderboardEntry {
                rank,
                user_id: p.participant_id,
                username: p.username,
                score: p.score,
                accuracy: p.accuracy,
                joined_at: p.joined_at,
            })
            .collect())
    }

    async fn find(&self, id: Uuid) -> Result<Event, AppError> {
        self.events
            .find_by_id(id)
            .await?
            .ok_or(AppError::NotFound("Event not found".to_string()))
    }

    /// Creator or admin.
    async fn managed(&self, actor: &Actor, id: Uuid) -> Result<Event, AppError> {
        let event = self.find(id).await?;
        if !actor.is_owner_or_admin(event.created_by) {
            return Err(AppError::Forbidden(
                "Only the creator or an admin can manage this event".to_string(),
            ));
        }
        Ok(event)
    }

    async fn transition(&self, actor: &Actor, id: Uuid, next: EventStatus) -> Result<Event, AppError> {
        let mut event = self.managed(actor, id).await?;
        if !event.status.can_transition_to(next) {
            return Err(AppError::InvalidOperation(format!(
                "Cannot move event from {:?} to {:?}",
                event.status, next
            )));
        }
        event.status = next;
        let updated = self.events.update(event).await?;
        tracing::info!("Event {} is now {:?}", id, next);
        Ok(updated)
    }

    async fn ensure_event_quiz_set(&self, quiz_set_id: Uuid) -> Result<(), AppError> {
        let quiz_set = self
            .quiz_sets
            .find_by_id(quiz_set_id)
            .await?
            .filter(|s| !s.is_deleted())
            .ok_or(AppError::BadRequest("Quiz set does not exist".to_string()))?;
        if quiz_set.quiz_type != QuizSetType::Event {
            return Err(AppError::BadRequest(
                "Events require a quiz set of type 'event'".to_string(),
            ));
        }
        Ok(())
    }
}

fn ensure_upcoming(event: &Event, action: &str) -> Result<(), AppError> {
    if event.status != EventStatus::Upcoming {
        return Err(AppError::InvalidOperation(format!(
            "Only upcoming events can be {action}"
        )));
    }
    Ok(())
}

pub(crate) fn ensure_capacity(max_participants: i32) -> Result<(), AppError> {
    if max_participants < 1 {
        return Err(AppError::BadRequest(
            "Capacity must be at least 1".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration};

    use super::*;
    use crate::{
        models::{
            event::EventParticipantDetail, quiz_attempt::QuizAttempt, quiz_set::QuizSet,
            user::UserRole,
        },
        repositories::{
            event_repository::MockEventRepository,
            notification_repository::MockNotificationRepository,
            quiz_attempt_repository::MockQuizAttemptRepository,
            quiz_set_repository::MockQuizSetRepository,
        },
    };

    struct Mocks {
        events: MockEventRepository,
        sets: MockQuizSetRepository,
        attempts: MockQuizAttemptRepository,
        notifications: MockNotificationRepository,
    }

    impl Mocks {
        fn new() -> Self {
            Self {
                events: MockEventRepository::new(),
                sets: MockQuizSetRepository::new(),
                attempts: MockQuizAttemptRepository::new(),
                notifications: MockNotificationRepository::new(),
            }
        }

        fn into_service(self) -> EventService {
            EventService::new(
                Arc::new(self.events),
                Arc::new(self.sets),
                Arc::new(self.attempts),
                Arc::new(NotificationService::new(Arc::new(self.notifications))),
            )
        }
    }

    fn event(created_by: Uuid, status: EventStatus) -> Event {
        let now = Utc::now();
        Event {
            id: Uuid::new_v4(),
            name: "Spring Sprint".to_string(),
            description: None,
            quiz_set_id: Uuid::new_v4(),
            start_date: now + Duration::days(1),
            end_date: now + Duration::days(2),
            max_participants: 2,
            status,
            created_by,
            created_at: now,
            updated_at: now,
        }
    }

    fn quiz_set(quiz_type: QuizSetType) -> QuizSet {
        let now = Utc::now();
        QuizSet {
            id: Uuid::new_v4(),
            title: "Set".to_string(),
            description: None,
            quiz_type,
            cover_image_url: None,
            is_published: true,
            is_premium_only: false,
            created_by: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    fn request(start_in: Duration, end_in: Duration) -> CreateEventRequest {
        let now = Utc::now();
        CreateEventRequest {
            name: "Spring Sprint".to_string(),
            description: Some("<b>fast</b> rounds<script>x</script>".to_string()),
            quiz_set_id: Uuid::new_v4(),
            start_date: now + start_in,
            end_date: now + end_in,
            max_participants: 10,
        }
    }

    fn detail(name: &str, score: i32, joined_at: DateTime<Utc>) -> EventParticipantDetail {
        EventParticipantDetail {
            participant_id: Uuid::new_v4(),
            username: name.to_string(),
            score,
            accuracy: 0.0,
            final_rank: None,
            joined_at,
            finished_at: None,
        }
    }

    fn completed_attempt(user_id: Uuid, quiz_set_id: Uuid, score: i32) -> QuizAttempt {
        let mut attempt = QuizAttempt::start(user_id, quiz_set_id, 10);
        attempt.status = AttemptStatus::Completed;
        attempt.score = score;
        attempt.accuracy = f64::from(score);
        attempt.completed_at = Some(Utc::now());
        attempt
    }

    #[tokio::test]
    async fn create_requires_event_quiz_set() {
        let mut m = Mocks::new();
        m.events.expect_find_by_name().times(1).returning(|_| Ok(None));
        m.sets.expect_find_by_id()
            .times(1)
            .returning(|_| Ok(Some(quiz_set(QuizSetType::Practice))));
        m.events.expect_create().times(0);

        let err = m
            .into_service()
            .create(
                &Actor::new(Uuid::new_v4(), UserRole::User),
                request(Duration::hours(1), Duration::hours(2)),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn create_rejects_start_in_the_past() {
        let mut m = Mocks::new();
        m.events.expect_find_by_name().times(1).returning(|_| Ok(None));
        m.events.expect_create().times(0);

        let err = m
            .into_service()
            .create(
                &Actor::new(Uuid::new_v4(), UserRole::User),
                request(-Duration::hours(1), Duration::hours(2)),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn create_rejects_duplicate_name() {
        let mut m = Mocks::new();
        m.events.expect_find_by_name()
            .times(1)
            .returning(|_| Ok(Some(event(Uuid::new_v4(), EventStatus::Upcoming))));

        let err = m
            .into_service()
            .create(
                &Actor::new(Uuid::new_v4(), UserRole::User),
                request(Duration::hours(1), Duration::hours(2)),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn create_starts_upcoming_with_sanitised_description() {
        let actor = Actor::new(Uuid::new_v4(), UserRole::User);
        let mut m = Mocks::new();
        m.events.expect_find_by_name().times(1).returning(|_| Ok(None));
        m.sets.expect_find_by_id()
            .times(1)
            .returning(|_| Ok(Some(quiz_set(QuizSetType::Event))));
        m.events.expect_create()
            .withf(move |e| e.status == EventStatus::Upcoming && e.created_by == actor.id)
            .times(1)
            .returning(Ok);

        let created = m
            .into_service()
            .create(&actor, request(Duration::hours(1), Duration::hours(2)))
            .await
            .unwrap();
        assert_eq!(created.description.as_deref(), Some("<b>fast</b> rounds"));
    }

    #[tokio::test]
    async fn join_full_event_is_invalid() {
        let e = event(Uuid::new_v4(), EventStatus::Upcoming);
        let id = e.id;
        let mut m = Mocks::new();
        m.events.expect_find_by_id().times(1).return_once(move |_| Ok(Some(e)));
        m.events.expect_find_participant().times(1).returning(|_, _| Ok(None));
        m.events.expect_count_participants().times(1).returning(|_| Ok(2));
        m.events.expect_add_participant().times(0);

        let err = m
            .into_service()
            .join(&Actor::new(Uuid::new_v4(), UserRole::User), id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidOperation(_)));
    }

    #[tokio::test]
    async fn join_twice_conflicts() {
        let e = event(Uuid::new_v4(), EventStatus::Active);
        let id = e.id;
        let user = Uuid::new_v4();
        let mut m = Mocks::new();
        m.events.expect_find_by_id().times(1).return_once(move |_| Ok(Some(e)));
        m.events.expect_find_participant()
            .times(1)
            .returning(move |eid, pid| Ok(Some(EventParticipant::new(eid, pid))));

        let err = m
            .into_service()
            .join(&Actor::new(user, UserRole::User), id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn leave_after_start_is_invalid() {
        let e = event(Uuid::new_v4(), EventStatus::Active);
        let id = e.id;
        let mut m = Mocks::new();
        m.events.expect_find_by_id().times(1).return_once(move |_| Ok(Some(e)));
        m.events.expect_remove_participant().times(0);

        let err = m
            .into_service()
            .leave(&Actor::new(Uuid::new_v4(), UserRole::User), id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidOperation(_)));
    }

    #[tokio::test]
    async fn update_after_start_is_invalid() {
        let owner = Uuid::new_v4();
        let e = event(owner, EventStatus::Active);
        let id = e.id;
        let mut m = Mocks::new();
        m.events.expect_find_by_id().times(1).return_once(move |_| Ok(Some(e)));
        m.events.expect_update().times(0);

        let err = m
            .into_service()
            .update(&Actor::new(owner, UserRole::User), id, UpdateEventRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidOperation(_)));
    }

    #[tokio::test]
    async fn start_by_stranger_is_forbidden() {
        let e = event(Uuid::new_v4(), EventStatus::Upcoming);
        let id = e.id;
        let mut m = Mocks::new();
        m.events.expect_find_by_id().times(1).return_once(move |_| Ok(Some(e)));

        let err = m
            .into_service()
            .start(&Actor::new(Uuid::new_v4(), UserRole::Moderator), id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn start_notifies_participants() {
        let owner = Uuid::new_v4();
        let e = event(owner, EventStatus::Upcoming);
        let id = e.id;
        let now = Utc::now();
        let mut m = Mocks::new();
        m.events.expect_find_by_id().times(1).return_once(move |_| Ok(Some(e)));
        m.events.expect_update()
            .withf(|e| e.status == EventStatus::Active)
            .times(1)
            .returning(Ok);
        m.events.expect_list_participants()
            .times(1)
            .returning(move |_| Ok(vec![detail("a", 0, now), detail("b", 0, now)]));
        m.notifications.expect_create_many()
            .withf(|n| n.len() == 2 && n.iter().all(|x| x.notification_type == NotificationType::Event))
            .times(1)
            .returning(|_| Ok(()));

        let started = m.into_service().start(&Actor::new(owner, UserRole::User), id).await.unwrap();
        assert_eq!(started.status, EventStatus::Active);
    }

    #[tokio::test]
    async fn end_before_start_is_invalid() {
        let owner = Uuid::new_v4();
        let e = event(owner, EventStatus::Upcoming);
        let id = e.id;
        let mut m = Mocks::new();
        m.events.expect_find_by_id().times(1).return_once(move |_| Ok(Some(e)));
        m.events.expect_update().times(0);

        let err = m
            .into_service()
            .end(&Actor::new(owner, UserRole::User), id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidOperation(_)));
    }

    #[tokio::test]
    async fn end_persists_ranks_with_join_order_tiebreak() {
        let owner = Uuid::new_v4();
        let e = event(owner, EventStatus::Active);
        let id = e.id;
        let base = Utc::now();
        let first = detail("first", 50, base);
        let second = detail("second", 50, base + Duration::seconds(5));
        let top = detail("top", 70, base + Duration::seconds(9));
        let (first_id, second_id, top_id) =
            (first.participant_id, second.participant_id, top.participant_id);

        let mut m = Mocks::new();
        m.events.expect_find_by_id().times(1).return_once(move |_| Ok(Some(e)));
        m.events.expect_update().times(1).returning(Ok);
        m.events.expect_list_participants()
            .times(1)
            .return_once(move |_| Ok(vec![second, top, first]));
        m.events.expect_set_final_ranks()
            .withf(move |_, ranks| *ranks == vec![(top_id, 1), (first_id, 2), (second_id, 3)])
            .times(1)
            .returning(|_, _| Ok(()));
        m.notifications.expect_create()
            .times(3)
            .returning(Ok);

        m.into_service().end(&Actor::new(owner, UserRole::User), id).await.unwrap();
    }

    #[tokio::test]
    async fn record_result_keeps_best_score() {
        let user = Uuid::new_v4();
        let e = event(Uuid::new_v4(), EventStatus::Active);
        let (id, set_id) = (e.id, e.quiz_set_id);
        let mut current = EventParticipant::new(id, user);
        current.score = 80;
        current.finished_at = Some(Utc::now());
        let attempt = completed_attempt(user, set_id, 60);
        let attempt_id = attempt.id;

        let mut m = Mocks::new();
        m.events.expect_find_by_id().times(1).return_once(move |_| Ok(Some(e)));
        m.events.expect_find_participant().times(1).return_once(move |_, _| Ok(Some(current)));
        m.attempts.expect_find_by_id().times(1).return_once(move |_| Ok(Some(attempt)));
        m.events.expect_update_participant().times(0);

        let p = m
            .into_service()
            .record_attempt_result(&Actor::new(user, UserRole::User), id, attempt_id)
            .await
            .unwrap();
        assert_eq!(p.score, 80);
    }

    #[tokio::test]
    async fn record_result_improves_score() {
        let user = Uuid::new_v4();
        let e = event(Uuid::new_v4(), EventStatus::Active);
        let (id, set_id) = (e.id, e.quiz_set_id);
        let attempt = completed_attempt(user, set_id, 90);
        let attempt_id = attempt.id;

        let mut m = Mocks::new();
        m.events.expect_find_by_id().times(1).return_once(move |_| Ok(Some(e)));
        m.events.expect_find_participant()
            .times(1)
            .returning(|eid, pid| Ok(Some(EventParticipant::new(eid, pid))));
        m.attempts.expect_find_by_id().times(1).return_once(move |_| Ok(Some(attempt)));
        m.events.expect_update_participant()
            .withf(|p| p.score == 90 && p.finished_at.is_some())
            .times(1)
            .returning(|_| Ok(()));

        let p = m
            .into_service()
            .record_attempt_result(&Actor::new(user, UserRole::User), id, attempt_id)
            .await
            .unwrap();
        assert_eq!(p.accuracy, 90.0);
    }

    #[tokio::test]
    async fn record_result_rejects_other_quiz_set() {
        let user = Uuid::new_v4();
        let e = event(Uuid::new_v4(), EventStatus::Active);
        let id = e.id;
        let attempt = completed_attempt(user, Uuid::new_v4(), 90);
        let attempt_id = attempt.id;

        let mut m = Mocks::new();
        m.events.expect_find_by_id().times(1).return_once(move |_| Ok(Some(e)));
        m.events.expect_find_participant()
            .times(1)
            .returning(|eid, pid| Ok(Some(EventParticipant::new(eid, pid))));
        m.attempts.expect_find_by_id().times(1).return_once(move |_| Ok(Some(attempt)));

        let err = m
            .into_service()
            .record_attempt_result(&Actor::new(user, UserRole::User), id, attempt_id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn record_result_requires_participation() {
        let e = event(Uuid::new_v4(), EventStatus::Active);
        let id = e.id;
        let mut m = Mocks::new();
        m.events.expect_find_by_id().times(1).return_once(move |_| Ok(Some(e)));
        m.events.expect_find_participant().times(1).returning(|_, _| Ok(None));

        let err = m
            .into_service()
            .record_attempt_result(&Actor::new(Uuid::new_v4(), UserRole::User), id, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }
}
