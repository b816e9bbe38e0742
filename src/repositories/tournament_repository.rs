use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::tournament::{
        Tournament, TournamentParticipant, TournamentParticipantDetail, TournamentQuizSet,
        TournamentStatus,
    },
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TournamentRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Tournament>, AppError>;

    async fn find_by_name(&self, name: &str) -> Result<Option<Tournament>, AppError>;

    async fn create(&self, tournament: Tournament) -> Result<Tournament, AppError>;

    async fn update(&self, tournament: Tournament) -> Result<Tournament, AppError>;

    /// Removes the tournament together with its quiz set links and participants.
    async fn delete(&self, id: Uuid) -> Result<(), AppError>;

    async fn list(
        &self,
        status: Option<TournamentStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Tournament>, AppError>;

    async fn count(&self, status: Option<TournamentStatus>) -> Result<i64, AppError>;

    /// Ordered by round.
    async fn list_quiz_sets(&self, tournament_id: Uuid) -> Result<Vec<TournamentQuizSet>, AppError>;

    async fn find_quiz_set(
        &self,
        tournament_id: Uuid,
        quiz_set_id: Uuid,
    ) -> Result<Option<TournamentQuizSet>, AppError>;

    async fn add_quiz_set(&self, link: TournamentQuizSet) -> Result<(), AppError>;

    /// Returns false when the set was not linked.
    async fn remove_quiz_set(&self, tournament_id: Uuid, quiz_set_id: Uuid) -> Result<bool, AppError>;

    async fn find_participant(
        &self,
        tournament_id: Uuid,
        participant_id: Uuid,
    ) -> Result<Option<TournamentParticipant>, AppError>;

    async fn add_participant(&self, participant: TournamentParticipant) -> Result<(), AppError>;

    async fn remove_participant(&self, tournament_id: Uuid, participant_id: Uuid) -> Result<(), AppError>;

    async fn count_participants(&self, tournament_id: Uuid) -> Result<i64, AppError>;

    /// Ordered by join time.
    async fn list_participants(
        &self,
        tournament_id: Uuid,
    ) -> Result<Vec<TournamentParticipantDetail>, AppError>;
}

#[derive(Clone)]
pub struct PgTournamentRepository {
    pool: PgPool,
}

impl PgTournamentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TournamentRepository for PgTournamentRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Tournament>, AppError> {
        let tournament = sqlx::query_as::<_, Tournament>("SELECT * FROM tournaments WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(tournament)
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Tournament>, AppError> {
        let tournament =
            sqlx::query_as::<_, Tournament>("SELECT * FROM tournaments WHERE LOWER(name) = LOWER($1)")
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;
        Ok(tournament)
    }

    async fn create(&self, tournament: Tournament) -> Result<Tournament, AppError> {
        let created = sqlx::query_as::<_, Tournament>(
            r#"
            INSERT INTO tournaments
                (id, name, description, start_date, end_date, max_participants, status,
                 created_by, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(tournament.id)
        .bind(&tournament.name)
        .bind(&tournament.description)
        .bind(tournament.start_date)
        .bind(tournament.end_date)
        .bind(tournament.max_participants)
        .bind(tournament.status)
        .bind(tournament.created_by)
        .bind(tournament.created_at)
        .bind(tournament.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create tournament: {:?}", e);
            AppError::from(e)
        })?;
        Ok(created)
    }

    async fn update(&self, tournament: Tournament) -> Result<Tournament, AppError> {
        let updated = sqlx::query_as::<_, Tournament>(
            r#"
            UPDATE tournaments SET
                name = $2,
                description = $3,
                start_date = $4,
                end_date = $5,
                max_participants = $6,
                status = $7,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(tournament.id)
        .bind(&tournament.name)
        .bind(&tournament.description)
        .bind(tournament.start_date)
        .bind(tournament.end_date)
        .bind(tournament.max_participants)
        .bind(tournament.status)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::NotFound("Tournament not found".to_string()))?;
        Ok(updated)
    }

    async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM tournament_quiz_sets WHERE tournament_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM tournament_participants WHERE tournament_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM tournaments WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Tournament not found".to_string()));
        }

        tx.commit().await?;
        Ok(())
    }

    async fn list(
        &self,
        status: Option<TournamentStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Tournament>, AppError> {
        let tournaments = sqlx::query_as::<_, Tournament>(
            r#"
            SELECT * FROM tournaments
            WHERE ($1::tournament_status IS NULL OR status = $1)
            ORDER BY start_date ASC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(tournaments)
    }

    async fn count(&self, status: Option<TournamentStatus>) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM tournaments WHERE ($1::tournament_status IS NULL OR status = $1)",
        )
        .bind(status)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn list_quiz_sets(&self, tournament_id: Uuid) -> Result<Vec<TournamentQuizSet>, AppError> {
        let links = sqlx::query_as::<_, TournamentQuizSet>(
            r#"
            SELECT * FROM tournament_quiz_sets
            WHERE tournament_id = $1
            ORDER BY round_number ASC, created_at ASC
            "#,
        )
        .bind(tournament_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(links)
    }

    async fn find_quiz_set(
        &self,
        tournament_id: Uuid,
        quiz_set_id: Uuid,
    ) -> Result<Option<TournamentQuizSet>, AppError> {
        let link = sqlx::query_as::<_, TournamentQuizSet>(
            "SELECT * FROM tournament_quiz_sets WHERE tournament_id = $1 AND quiz_set_id = $2",
        )
        .bind(tournament_id)
        .bind(quiz_set_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(link)
    }

    async fn add_quiz_set(&self, link: TournamentQuizSet) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO tournament_quiz_sets (tournament_id, quiz_set_id, round_number, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(link.tournament_id)
        .bind(link.quiz_set_id)
        .bind(link.round_number)
        .bind(link.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove_quiz_set(&self, tournament_id: Uuid, quiz_set_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(
            "DELETE FROM tournament_quiz_sets WHERE tournament_id = $1 AND quiz_set_id = $2",
        )
        .bind(tournament_id)
        .bind(quiz_set_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_participant(
        &self,
        tournament_id: Uuid,
        participant_id: Uuid,
    ) -> Result<Option<TournamentParticipant>, AppError> {
        let participant = sqlx::query_as::<_, TournamentParticipant>(
            "SELECT * FROM tournament_participants WHERE tournament_id = $1 AND participant_id = $2",
        )
        .bind(tournament_id)
        .bind(participant_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(participant)
    }

    async fn add_participant(&self, participant: TournamentParticipant) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO tournament_participants (tournament_id, participant_id, joined_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(participant.tournament_id)
        .bind(participant.participant_id)
        .bind(participant.joined_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove_participant(&self, tournament_id: Uuid, participant_id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query(
            "DELETE FROM tournament_participants WHERE tournament_id = $1 AND participant_id = $2",
        )
        .bind(tournament_id)
        .bind(participant_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Participant not found".to_string()));
        }
        Ok(())
    }

    async fn count_participants(&self, tournament_id: Uuid) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM tournament_participants WHERE tournament_id = $1",
        )
        .bind(tournament_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn list_participants(
        &self,
        tournament_id: Uuid,
    ) -> Result<Vec<TournamentParticipantDetail>, AppError> {
        let participants = sqlx::query_as::<_, TournamentParticipantDetail>(
            r#"
            SELECT p.participant_id, u.username, p.joined_at
            FROM tournament_participants p
            JOIN users u ON u.id = p.participant_id
            WHERE p.tournament_id = $1
            ORDER BY p.joined_at ASC
            "#,
        )
        .bind(tournament_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(participants)
    }
}
