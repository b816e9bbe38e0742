use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::event::{Event, EventParticipant, EventParticipantDetail, EventStatus},
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Event>, AppError>;

    async fn find_by_name(&self, name: &str) -> Result<Option<Event>, AppError>;

    async fn create(&self, event: Event) -> Result<Event, AppError>;

    async fn update(&self, event: Event) -> Result<Event, AppError>;

    async fn delete(&self, id: Uuid) -> Result<(), AppError>;

    async fn list(
        &self,
        status: Option<EventStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Event>, AppError>;

    async fn count(&self, status: Option<EventStatus>) -> Result<i64, AppError>;

    async fn find_participant(
        &self,
        event_id: Uuid,
        participant_id: Uuid,
    ) -> Result<Option<EventParticipant>, AppError>;

    async fn add_participant(&self, participant: EventParticipant) -> Result<(), AppError>;

    async fn remove_participant(&self, event_id: Uuid, participant_id: Uuid) -> Result<(), AppError>;

    async fn count_participants(&self, event_id: Uuid) -> Result<i64, AppError>;

    /// Ordered by join time.
    async fn list_participants(&self, event_id: Uuid) -> Result<Vec<EventParticipantDetail>, AppError>;

    async fn update_participant(&self, participant: EventParticipant) -> Result<(), AppError>;

    /// Writes `final_rank` for every `(participant_id, rank)` pair atomically.
    async fn set_final_ranks(&self, event_id: Uuid, ranks: Vec<(Uuid, i32)>) -> Result<(), AppError>;
}

#[derive(Clone)]
pub struct PgEventRepository {
    pool: PgPool,
}

impl PgEventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventRepository for PgEventRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Event>, AppError> {
        let event = sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(event)
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Event>, AppError> {
        let event = sqlx::query_as::<_, Event>("SELECT * FROM events WHERE LOWER(name) = LOWER($1)")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(event)
    }

    async fn create(&self, event: Event) -> Result<Event, AppError> {
        let created = sqlx::query_as::<_, Event>(
            r#"
            INSERT INTO events
                (id, name, description, quiz_set_id, start_date, end_date, max_participants,
                 status, created_by, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(event.id)
        .bind(&event.name)
        .bind(&event.description)
        .bind(event.quiz_set_id)
        .bind(event.start_date)
        .bind(event.end_date)
        .bind(event.max_participants)
        .bind(event.status)
        .bind(event.created_by)
        .bind(event.created_at)
        .bind(event.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create event: {:?}", e);
            AppError::from(e)
        })?;
        Ok(created)
    }

    async fn update(&self, event: Event) -> Result<Event, AppError> {
        let updated = sqlx::query_as::<_, Event>(
            r#"
            UPDATE events SET
                name = $2,
                description = $3,
                quiz_set_id = $4,
                start_date = $5,
                end_date = $6,
                max_participants = $7,
                status = $8,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(event.id)
        .bind(&event.name)
        .bind(&event.description)
        .bind(event.quiz_set_id)
        .bind(event.start_date)
        .bind(event.end_date)
        .bind(event.max_participants)
        .bind(event.status)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::NotFound("Event not found".to_string()))?;
        Ok(updated)
    }

    async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Event not found".to_string()));
        }
        Ok(())
    }

    async fn list(
        &self,
        status: Option<EventStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Event>, AppError> {
        let events = sqlx::query_as::<_, Event>(
            r#"
            SELECT * FROM events
            WHERE ($1::event_status IS NULL OR status = $1)
            ORDER BY start_date ASC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(events)
    }

    async fn count(&self, status: Option<EventStatus>) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM events WHERE ($1::event_status IS NULL OR status = $1)",
        )
        .bind(status)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn find_participant(
        &self,
        event_id: Uuid,
        participant_id: Uuid,
    ) -> Result<Option<EventParticipant>, AppError> {
        let participant = sqlx::query_as::<_, EventParticipant>(
            "SELECT * FROM event_participants WHERE event_id = $1 AND participant_id = $2",
        )
        .bind(event_id)
        .bind(participant_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(participant)
    }

    async fn add_participant(&self, participant: EventParticipant) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO event_participants
                (event_id, participant_id, score, accuracy, final_rank, joined_at, finished_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(participant.event_id)
        .bind(participant.participant_id)
        .bind(participant.score)
        .bind(participant.accuracy)
        .bind(participant.final_rank)
        .bind(participant.joined_at)
        .bind(participant.finished_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove_participant(&self, event_id: Uuid, participant_id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query(
            "DELETE FROM event_participants WHERE event_id = $1 AND participant_id = $2",
        )
        .bind(event_id)
        .bind(participant_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Participant not found".to_string()));
        }
        Ok(())
    }

    async fn count_participants(&self, event_id: Uuid) -> Result<i64, AppError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM event_participants WHERE event_id = $1")
                .bind(event_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    async fn list_participants(&self, event_id: Uuid) -> Result<Vec<EventParticipantDetail>, AppError> {
        let participants = sqlx::query_as::<_, EventParticipantDetail>(
            r#"
            SELECT p.participant_id, u.username, p.score, p.accuracy, p.final_rank,
                   p.joined_at, p.finished_at
            FROM event_participants p
            JOIN users u ON u.id = p.participant_id
            WHERE p.event_id = $1
            ORDER BY p.joined_at ASC
            "#,
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(participants)
    }

    async fn update_participant(&self, participant: EventParticipant) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE event_participants SET
                score = $3,
                accuracy = $4,
                final_rank = $5,
                finished_at = $6
            WHERE event_id = $1 AND participant_id = $2
            "#,
        )
        .bind(participant.event_id)
        .bind(participant.participant_id)
        .bind(participant.score)
        .bind(participant.accuracy)
        .bind(participant.final_rank)
        .bind(participant.finished_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Participant not found".to_string()));
        }
        Ok(())
    }

    async fn set_final_ranks(&self, event_id: Uuid, ranks: Vec<(Uuid, i32)>) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        for (participant_id, rank) in ranks {
            sqlx::query(
                "UPDATE event_participants SET final_rank = $3 WHERE event_id = $1 AND participant_id = $2",
            )
            .bind(event_id)
            .bind(participant_id)
            .bind(rank)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
