use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDate;
use uuid::Uuid;

use crate::{
    config::POINTS_PER_CORRECT_ANSWER,
    models::{
        quiz::Quiz,
        quiz_attempt::{AnswerResultDto, AttemptStatus, QuizAttempt, UserAttemptStats},
    },
};

/// Outcome of grading one submission against the quizzes of a set.
#[derive(Debug, Clone)]
pub struct ScoredAnswers {
    pub results: Vec<AnswerResultDto>,
    pub correct: i32,
    pub wrong: i32,
    pub score: i32,
    pub accuracy: f64,
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// `correct / total * 100`, two decimals. Zero when there is nothing to divide by.
pub fn accuracy_percentage(correct: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    round2(correct as f64 / total as f64 * 100.0)
}

/// Grades every quiz of the set. Quizzes without an answer count as wrong.
pub fn score_answers(quizzes: &[Quiz], answers: &HashMap<Uuid, String>) -> ScoredAnswers {
    let mut correct = 0;
    let mut wrong = 0;

    let results: Vec<AnswerResultDto> = quizzes
        .iter()
        .map(|quiz| {
            let user_answer = answers.get(&quiz.id).cloned();
            let is_correct = user_answer
                .as_deref()
                .is_some_and(|answer| quiz.is_correct(answer));
            if is_correct {
                correct += 1;
            } else {
                wrong += 1;
            }
            AnswerResultDto {
                quiz_id: quiz.id,
                user_answer,
                correct_answer: quiz.correct_answer.clone(),
                is_correct,
                explanation: quiz.explanation.clone(),
            }
        })
        .collect();

    ScoredAnswers {
        results,
        correct,
        wrong,
        score: correct * POINTS_PER_CORRECT_ANSWER,
        accuracy: accuracy_percentage(i64::from(correct), i64::from(correct + wrong)),
    }
}

/// Consecutive days ending at the most recent active day.
/// Zero unless that day is `today` or the day before.
pub fn current_streak(days: &BTreeSet<NaiveDate>, today: NaiveDate) -> u32 {
    let Some(&last) = days.last() else {
        return 0;
    };
    let yesterday = today.pred_opt();
    if last != today && Some(last) != yesterday {
        return 0;
    }

    let mut streak = 0;
    let mut day = Some(last);
    while let Some(d) = day {
        if !days.contains(&d) {
            break;
        }
        streak += 1;
        day = d.pred_opt();
    }
    streak
}

pub fn longest_streak(days: &BTreeSet<NaiveDate>) -> u32 {
    let mut longest = 0;
    let mut run = 0;
    let mut previous: Option<NaiveDate> = None;

    for &day in days {
        run = match previous {
            Some(prev) if prev.succ_opt() == Some(day) => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        previous = Some(day);
    }
    longest
}

/// Aggregates completed attempts; in-progress and abandoned ones are ignored.
pub fn compute_stats(attempts: &[QuizAttempt], today: NaiveDate) -> UserAttemptStats {
    let completed: Vec<&QuizAttempt> = attempts
        .iter()
        .filter(|a| a.status == AttemptStatus::Completed)
        .collect();

    if completed.is_empty() {
        return UserAttemptStats::default();
    }

    let total_attempts = completed.len() as i64;
    let total_questions: i64 = completed.iter().map(|a| i64::from(a.total_questions)).sum();
    let total_correct: i64 = completed.iter().map(|a| i64::from(a.correct_answers)).sum();
    let total_wrong: i64 = completed.iter().map(|a| i64::from(a.wrong_answers)).sum();
    let score_sum: i64 = completed.iter().map(|a| i64::from(a.score)).sum();
    let best_score = completed.iter().map(|a| a.score).max().unwrap_or(0);

    let days: BTreeSet<NaiveDate> = completed
        .iter()
        .filter_map(|a| a.completed_at)
        .map(|at| at.date_naive())
        .collect();

    UserAttemptStats {
        total_attempts,
        total_questions,
        total_correct,
        total_wrong,
        average_score: round2(score_sum as f64 / total_attempts as f64),
        best_score,
        overall_accuracy: accuracy_percentage(total_correct, total_questions),
        current_streak: current_streak(&days, today),
        longest_streak: longest_streak(&days),
    }
}
