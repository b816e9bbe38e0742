use std::{collections::HashMap, sync::Arc};

use chrono::Utc;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        notification::NotificationType,
        pagination::{PagedResult, PaginationParams},
        quiz_set::QuizSetType,
        tournament::{
            AddTournamentQuizSetRequest, CreateTournamentRequest, Tournament, TournamentDetailDto,
            TournamentLeaderboardEntry, TournamentParticipant, TournamentQuizSet,
            TournamentStatus, UpdateTournamentRequest,
        },
        user::Actor,
    },
    repositories::{
        quiz_attempt_repository::QuizAttemptRepository, quiz_set_repository::QuizSetRepository,
        tournament_repository::TournamentRepository,
    },
    services::{event_service::ensure_capacity, notification_service::NotificationService},
    utils::{html::clean_optional, ranking::rank_by_score, validation::ensure_date_range},
};

#[derive(Clone)]
pub struct TournamentService {
    tournaments: Arc<dyn TournamentRepository>,
    quiz_sets: Arc<dyn QuizSetRepository>,
    attempts: Arc<dyn QuizAttemptRepository>,
    notifications: Arc<NotificationService>,
}

impl TournamentService {
    pub fn new(
        tournaments: Arc<dyn TournamentRepository>,
        quiz_sets: Arc<dyn QuizSetRepository>,
        attempts: Arc<dyn QuizAttemptRepository>,
        notifications: Arc<NotificationService>,
    ) -> Self {
        Self {
            tournaments,
            quiz_sets,
            attempts,
            notifications,
        }
    }

    pub async fn create(
        &self,
        actor: &Actor,
        req: CreateTournamentRequest,
    ) -> Result<Tournament, AppError> {
        let name = self.unique_name(&req.name, None).await?;
        ensure_date_range(req.start_date, req.end_date)?;
        ensure_capacity(req.max_participants)?;

        let now = Utc::now();
        let tournament = Tournament {
            id: Uuid::new_v4(),
            name,
            description: clean_optional(req.description.as_deref()),
            start_date: req.start_date,
            end_date: req.end_date,
            max_participants: req.max_participants,
            status: TournamentStatus::Created,
            created_by: actor.id,
            created_at: now,
            updated_at: now,
        };
        let created = self.tournaments.create(tournament).await?;
        tracing::info!("Tournament created: {} ({})", created.name, created.id);
        Ok(created)
    }

    pub async fn get(&self, id: Uuid) -> Result<TournamentDetailDto, AppError> {
        let tournament = self.find(id).await?;
        let quiz_sets = self.tournaments.list_quiz_sets(id).await?;
        let participant_count = self.tournaments.count_participants(id).await?;
        Ok(TournamentDetailDto {
            tournament,
            quiz_sets,
            participant_count,
        })
    }

    pub async fn list(
        &self,
        status: Option<TournamentStatus>,
        params: PaginationParams,
    ) -> Result<PagedResult<Tournament>, AppError> {
        let page = params.resolve()?;
        let items = self
            .tournaments
            .list(status, page.limit(), page.offset())
            .await?;
        let total = self.tournaments.count(status).await?;
        Ok(PagedResult::new(items, total, page))
    }

    pub async fn update(&self, id: Uuid, req: UpdateTournamentRequest) -> Result<Tournament, AppError> {
        let mut tournament = self.find(id).await?;
        ensure_created(&tournament, "updated")?;

        if let Some(name) = req.name {
            tournament.name = self.unique_name(&name, Some(id)).await?;
        }
        if let Some(description) = req.description {
            tournament.description = clean_optional(Some(&description));
        }
        if let Some(start_date) = req.start_date {
            tournament.start_date = start_date;
        }
        if let Some(end_date) = req.end_date {
            tournament.end_date = end_date;
        }
        ensure_date_range(tournament.start_date, tournament.end_date)?;
        if let Some(max) = req.max_participants {
            ensure_capacity(max)?;
            if i64::from(max) < self.tournaments.count_participants(id).await? {
                return Err(AppError::InvalidOperation(
                    "Capacity is below the current participant count".to_string(),
                ));
            }
            tournament.max_participants = max;
        }

        self.tournaments.update(tournament).await
    }

    /// Removes the tournament together with its quiz set links and participants.
    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let tournament = self.find(id).await?;
        ensure_created(&tournament, "deleted")?;
        self.tournaments.delete(id).await?;
        tracing::info!("Tournament {} deleted", id);
        Ok(())
    }

    pub async fn add_quiz_set(
        &self,
        id: Uuid,
        req: AddTournamentQuizSetRequest,
    ) -> Result<TournamentQuizSet, AppError> {
        let tournament = self.find(id).await?;
        ensure_created(&tournament, "changed")?;
        if req.round_number < 1 {
            return Err(AppError::BadRequest("Round number starts at 1".to_string()));
        }

        let quiz_set = self
            .quiz_sets
            .find_by_id(req.quiz_set_id)
            .await?
            .filter(|s| !s.is_deleted())
            .ok_or(AppError::NotFound("Quiz set not found".to_string()))?;
        if quiz_set.quiz_type != QuizSetType::Tournament {
            return Err(AppError::BadRequest(
                "Only tournament quiz sets can be added".to_string(),
            ));
        }
        if self
            .tournaments
            .find_quiz_set(id, req.quiz_set_id)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(
                "Quiz set is already part of this tournament".to_string(),
            ));
        }

        let link = TournamentQuizSet {
            tournament_id: id,
            quiz_set_id: req.quiz_set_id,
            round_number: req.round_number,
            created_at: Utc::now(),
        };
        self.tournaments.add_quiz_set(link.clone()).await?;
        Ok(link)
    }

    pub async fn remove_quiz_set(&self, id: Uuid, quiz_set_id: Uuid) -> Result<(), AppError> {
        let tournament = self.find(id).await?;
        ensure_created(&tournament, "changed")?;
        if !self.tournaments.remove_quiz_set(id, quiz_set_id).await? {
            return Err(AppError::NotFound(
                "Quiz set is not part of this tournament".to_string(),
            ));
        }
        Ok(())
    }

    pub async fn start(&self, id: Uuid) -> Result<Tournament, AppError> {
        let tournament = self.find(id).await?;
        if tournament.status == TournamentStatus::Created
            && self.tournaments.list_quiz_sets(id).await?.is_empty()
        {
            return Err(AppError::InvalidOperation(
                "Tournament needs at least one quiz set".to_string(),
            ));
        }
        let tournament = self.transition(tournament, TournamentStatus::Started).await?;

        let participants: Vec<Uuid> = self
            .tournaments
            .list_participants(id)
            .await?
            .into_iter()
            .map(|p| p.participant_id)
            .collect();
        self.notifications
            .notify_many(
                &participants,
                NotificationType::Tournament,
                "Tournament started",
                &format!("The tournament '{}' has started.", tournament.name),
            )
            .await?;
        Ok(tournament)
    }

    pub async fn end(&self, id: Uuid) -> Result<Tournament, AppError> {
        let tournament = self.find(id).await?;
        self.transition(tournament, TournamentStatus::Ended).await
    }

    pub async fn join(&self, actor: &Actor, id: Uuid) -> Result<TournamentParticipant, AppError> {
        let tournament = self.find(id).await?;
        if tournament.status == TournamentStatus::Ended {
            return Err(AppError::InvalidOperation(
                "Tournament has already ended".to_string(),
            ));
        }
        if self.tournaments.find_participant(id, actor.id).await?.is_some() {
            return Err(AppError::Conflict("Already joined this tournament".to_string()));
        }
        if self.tournaments.count_participants(id).await? >= i64::from(tournament.max_participants) {
            return Err(AppError::InvalidOperation("Tournament is full".to_string()));
        }

        let participant = TournamentParticipant {
            tournament_id: id,
            participant_id: actor.id,
            joined_at: Utc::now(),
        };
        self.tournaments.add_participant(participant.clone()).await?;
        tracing::info!("User {} joined tournament {}", actor.id, id);
        Ok(participant)
    }

    pub async fn leave(&self, actor: &Actor, id: Uuid) -> Result<(), AppError> {
        let tournament = self.find(id).await?;
        if tournament.status != TournamentStatus::Created {
            return Err(AppError::InvalidOperation(
                "You can only leave a tournament before it starts".to_string(),
            ));
        }
        if self.tournaments.find_participant(id, actor.id).await?.is_none() {
            return Err(AppError::NotFound(
                "You are not a participant of this tournament".to_string(),
            ));
        }
        self.tournaments.remove_participant(id, actor.id).await
    }

    /// Sums each participant's best in-window score on every tournament quiz set.
    pub async fn leaderboard(&self, id: Uuid) -> Result<Vec<TournamentLeaderboardEntry>, AppError> {
        let tournament = self.find(id).await?;
        let participants = self.tournaments.list_participants(id).await?;
        let quiz_set_ids: Vec<Uuid> = self
            .tournaments
            .list_quiz_sets(id)
            .await?
            .into_iter()
            .map(|l| l.quiz_set_id)
            .collect();

        let mut best: HashMap<(Uuid, Uuid), i32> = HashMap::new();
        if !participants.is_empty() && !quiz_set_ids.is_empty() {
            let user_ids = participants.iter().map(|p| p.participant_id).collect();
            let attempts = self
                .attempts
                .list_completed_in_window(
                    user_ids,
                    quiz_set_ids,
                    tournament.start_date,
                    tournament.end_date,
                )
                .await?;
            for attempt in attempts {
                let slot = best.entry((attempt.user_id, attempt.quiz_set_id)).or_insert(0);
                *slot = (*slot).max(attempt.score);
            }
        }

        let totals = participants.into_iter().map(|p| {
            let mine = best.iter().filter(|((user, _), _)| *user == p.participant_id);
            let (total, completed) = mine.fold((0i64, 0u32), |(total, count), (_, score)| {
                (total + i64::from(*score), count + 1)
            });
            (p, total, completed)
        });

        Ok(rank_by_score(totals.collect(), |(_, total, _)| *total, |(p, _, _)| p.joined_at)
            .into_iter()
            .map(|(rank, (p, total_score, quiz_sets_completed))| TournamentLeaderboardEntry {
                rank,
                user_id: p.participant_id,
                username: p.username,
                total_score,
                quiz_sets_completed,
            })
            .collect())
    }

    async fn find(&self, id: Uuid) -> Result<Tournament, AppError> {
        self.tournaments
            .find_by_id(id)
            .await?
            .ok_or(AppError::NotFound("Tournament not found".to_string()))
    }

    async fn unique_name(&self, raw: &str, current: Option<Uuid>) -> Result<String, AppError> {
        let name = raw.trim().to_string();
        if name.is_empty() {
            return Err(AppError::BadRequest("Tournament name is required".to_string()));
        }
        match self.tournaments.find_by_name(&name).await? {
            Some(existing) if Some(existing.id) != current => Err(AppError::Conflict(format!(
                "Tournament '{name}' already exists"
            ))),
            _ => Ok(name),
        }
    }

    async fn transition(
        &self,
        mut tournament: Tournament,
        next: TournamentStatus,
    ) -> Result<Tournament, AppError> {
        if !tournament.status.can_transition_to(next) {
            return Err(AppError::InvalidOperation(format!(
                "Cannot move tournament from {:?} to {:?}",
                tournament.status, next
            )));
        }
        tournament.status = next;
        let updated = self.tournaments.update(tournament).await?;
        tracing::info!("Tournament {} is now {:?}", updated.id, next);
        Ok(updated)
    }
}

fn ensure_created(tournament: &Tournament, action: &str) -> Result<(), AppError> {
    if tournament.status != TournamentStatus::Created {
        return Err(AppError::InvalidOperation(format!(
            "Only tournaments that have not started can be {action}"
        )));
    }
    Ok(())
}
