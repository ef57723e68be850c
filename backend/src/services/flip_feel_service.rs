use std::collections::{HashMap, HashSet};

use axum::extract::{Path, State};
use axum::Json;
use mindpet_shared::constants::{codes, FLIP_FEEL_TEXT_MAX_LENGTH, MIN_FLIP_FEEL_CHOICES};
use mindpet_shared::validation::validate_text;
use serde::{Deserialize, Serialize};
use sqlx::PgConnection;
use time::OffsetDateTime;
use tracing::{debug, info};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::{AppError, AppResult};
use crate::response::{ApiResponse, Created};
use crate::AppState;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Choice {
    pub id: Uuid,
    #[serde(skip)]
    pub question_id: Uuid,
    pub text: String,
    pub position: i32,
}

#[derive(Debug, Serialize)]
pub struct Question {
    pub id: Uuid,
    pub text: String,
    pub choices: Vec<Choice>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct Session {
    pub id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub finished_at: Option<OffsetDateTime>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct SessionSummary {
    pub id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub finished_at: Option<OffsetDateTime>,
    pub response_count: i64,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct ResponseView {
    pub id: Uuid,
    pub question_id: Uuid,
    pub question_text: String,
    pub choice_id: Uuid,
    pub choice_text: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Serialize)]
pub struct SessionDetail {
    #[serde(flatten)]
    pub session: Session,
    pub responses: Vec<ResponseView>,
}

#[derive(Debug, Deserialize)]
pub struct CreateQuestionRequest {
    pub text: String,
    pub choices: Vec<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct AnswerRequest {
    pub question_id: Uuid,
    pub choice_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub responses: Vec<AnswerRequest>,
}

fn session_not_found() -> AppError {
    AppError::not_found(codes::SESSION_NOT_FOUND, "Session not found")
}

/// Trims the choices and checks there are enough distinct ones.
fn normalize_choices(choices: &[String]) -> AppResult<Vec<String>> {
    let mut seen = HashSet::new();
    let mut normalized = Vec::with_capacity(choices.len());
    for choice in choices {
        validate_text("choice", choice, FLIP_FEEL_TEXT_MAX_LENGTH)?;
        let choice = choice.trim();
        if !seen.insert(choice.to_lowercase()) {
            return Err(AppError::bad_request(
                codes::VALIDATION_ERROR,
                format!("Duplicate choice: {}", choice),
            ));
        }
        normalized.push(choice.to_string());
    }
    if normalized.len() < MIN_FLIP_FEEL_CHOICES {
        return Err(AppError::bad_request(
            codes::VALIDATION_ERROR,
            format!("A question needs at least {} choices", MIN_FLIP_FEEL_CHOICES),
        ));
    }
    Ok(normalized)
}

/// Rejects answer sets that repeat a question.
fn ensure_unique_questions(answers: &[AnswerRequest]) -> AppResult<()> {
    let mut seen = HashSet::new();
    match answers.iter().find(|answer| !seen.insert(answer.question_id)) {
        Some(answer) => Err(AppError::conflict(
            codes::DUPLICATE_RESPONSE,
            format!("Question {} was answered more than once", answer.question_id),
        )),
        None => Ok(()),
    }
}

/// Checks every answer names an active question and one of its own choices.
async fn validate_answers(conn: &mut PgConnection, answers: &[AnswerRequest]) -> AppResult<()> {
    let question_ids: Vec<Uuid> = answers.iter().map(|a| a.question_id).collect();
    let choice_ids: Vec<Uuid> = answers.iter().map(|a| a.choice_id).collect();

    let active: HashSet<Uuid> = sqlx::query_scalar::<_, Uuid>(
        "SELECT id FROM flip_feel_questions WHERE id = ANY($1) AND is_active",
    )
    .bind(&question_ids)
    .fetch_all(&mut *conn)
    .await?
    .into_iter()
    .collect();

    let owners: HashMap<Uuid, Uuid> = sqlx::query_as::<_, (Uuid, Uuid)>(
        "SELECT id, question_id FROM flip_feel_choices WHERE id = ANY($1)",
    )
    .bind(&choice_ids)
    .fetch_all(&mut *conn)
    .await?
    .into_iter()
    .collect();

    for answer in answers {
        if !active.contains(&answer.question_id) {
            return Err(AppError::not_found(codes::QUESTION_NOT_FOUND, "Question not found"));
        }
        if owners.get(&answer.choice_id) != Some(&answer.question_id) {
            return Err(AppError::not_found(
                codes::CHOICE_NOT_FOUND,
                "Choice does not belong to this question",
            ));
        }
    }
    Ok(())
}

async fn insert_response(
    conn: &mut PgConnection,
    session_id: Uuid,
    answer: AnswerRequest,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO flip_feel_responses (id, session_id, question_id, choice_id) VALUES ($1, $2, $3, $4)",
    )
    .bind(Uuid::new_v4())
    .bind(session_id)
    .bind(answer.question_id)
    .bind(answer.choice_id)
    .execute(conn)
    .await?;
    Ok(())
}

async fn load_responses(conn: &mut PgConnection, session_id: Uuid) -> Result<Vec<ResponseView>, sqlx::Error> {
    sqlx::query_as::<_, ResponseView>(
        r#"
        SELECT r.id, r.question_id, q.text AS question_text, r.choice_id, c.text AS choice_text, r.created_at
        FROM flip_feel_responses r
        JOIN flip_feel_questions q ON q.id = r.question_id
        JOIN flip_feel_choices c ON c.id = r.choice_id
        WHERE r.session_id = $1
        ORDER BY r.created_at, r.id
        "#,
    )
    .bind(session_id)
    .fetch_all(conn)
    .await
}

pub async fn list_questions(State(state): State<AppState>) -> AppResult<Json<ApiResponse<Vec<Question>>>> {
    let questions = sqlx::query_as::<_, (Uuid, String)>(
        "SELECT id, text FROM flip_feel_questions WHERE is_active ORDER BY created_at, id",
    )
    .fetch_all(&state.pool)
    .await?;

    let ids: Vec<Uuid> = questions.iter().map(|(id, _)| *id).collect();
    let choices = sqlx::query_as::<_, Choice>(
        "SELECT id, question_id, text, position FROM flip_feel_choices \
         WHERE question_id = ANY($1) ORDER BY position",
    )
    .bind(&ids)
    .fetch_all(&state.pool)
    .await?;

    let mut grouped: HashMap<Uuid, Vec<Choice>> = HashMap::new();
    for choice in choices {
        grouped.entry(choice.question_id).or_default().push(choice);
    }

    let questions = questions
        .into_iter()
        .map(|(id, text)| Question {
            id,
            text,
            choices: grouped.remove(&id).unwrap_or_default(),
        })
        .collect();

    Ok(ApiResponse::ok("Questions retrieved", questions))
}

pub async fn create_question(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<CreateQuestionRequest>,
) -> AppResult<Created<Question>> {
    validate_text("text", &request.text, FLIP_FEEL_TEXT_MAX_LENGTH)?;
    let choices = normalize_choices(&request.choices)?;
    let text = request.text.trim().to_string();

    let mut tx = state.pool.begin().await?;
    let question_id = Uuid::new_v4();
    sqlx::query("INSERT INTO flip_feel_questions (id, text) VALUES ($1, $2)")
        .bind(question_id)
        .bind(&text)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::from_unique_violation(e, codes::DUPLICATE_QUESTION, "This question already exists"))?;

    let mut created = Vec::with_capacity(choices.len());
    for (position, choice_text) in choices.into_iter().enumerate() {
        let choice = sqlx::query_as::<_, Choice>(
            "INSERT INTO flip_feel_choices (id, question_id, text, position) VALUES ($1, $2, $3, $4) \
             RETURNING id, question_id, text, position",
        )
        .bind(Uuid::new_v4())
        .bind(question_id)
        .bind(choice_text)
        .bind(position as i32)
        .fetch_one(&mut *tx)
        .await?;
        created.push(choice);
    }
    tx.commit().await?;

    info!("🃏 Admin {} added flip-feel question {}", user.user_id, question_id);
    Ok(ApiResponse::created(
        "Question created",
        Question {
            id: question_id,
            text,
            choices: created,
        },
    ))
}

/// Records a whole session in one go.
pub async fn submit_session(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<SubmitRequest>,
) -> AppResult<Created<SessionDetail>> {
    if request.responses.is_empty() {
        return Err(AppError::bad_request(codes::VALIDATION_ERROR, "At least one response is required"));
    }
    ensure_unique_questions(&request.responses)?;

    let mut tx = state.pool.begin().await?;
    validate_answers(&mut tx, &request.responses).await?;

    let now = OffsetDateTime::now_utc();
    let session = sqlx::query_as::<_, Session>(
        "INSERT INTO flip_feel_sessions (id, owner_id, started_at, finished_at) VALUES ($1, $2, $3, $3) \
         RETURNING id, started_at, finished_at",
    )
    .bind(Uuid::new_v4())
    .bind(user.user_id)
    .bind(now)
    .fetch_one(&mut *tx)
    .await?;

    for answer in &request.responses {
        insert_response(&mut tx, session.id, *answer).await?;
    }
    let responses = load_responses(&mut tx, session.id).await?;
    tx.commit().await?;

    info!("🃏 User {} submitted session {} ({} answers)", user.user_id, session.id, responses.len());
    Ok(ApiResponse::created("Session recorded", SessionDetail { session, responses }))
}

pub async fn start_session(State(state): State<AppState>, user: AuthUser) -> AppResult<Created<Session>> {
    let session = sqlx::query_as::<_, Session>(
        "INSERT INTO flip_feel_sessions (id, owner_id) VALUES ($1, $2) RETURNING id, started_at, finished_at",
    )
    .bind(Uuid::new_v4())
    .bind(user.user_id)
    .fetch_one(&state.pool)
    .await?;

    Ok(ApiResponse::created("Session started", session))
}

pub async fn answer_question(
    State(state): State<AppState>,
    user: AuthUser,
    Path(session_id): Path<Uuid>,
    Json(answer): Json<AnswerRequest>,
) -> AppResult<Created<ResponseView>> {
    let mut tx = state.pool.begin().await?;

    let finished_at = sqlx::query_scalar::<_, Option<OffsetDateTime>>(
        "SELECT finished_at FROM flip_feel_sessions WHERE id = $1 AND owner_id = $2 FOR UPDATE",
    )
    .bind(session_id)
    .bind(user.user_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(session_not_found)?;
    if finished_at.is_some() {
        debug!("🚫 Session {} already finished", session_id);
        return Err(AppError::conflict(codes::SESSION_FINISHED, "This session is already finished"));
    }

    validate_answers(&mut tx, &[answer]).await?;
    insert_response(&mut tx, session_id, answer)
        .await
        .map_err(|e| AppError::from_unique_violation(e, codes::DUPLICATE_RESPONSE, "Question already answered"))?;

    let response = load_responses(&mut tx, session_id)
        .await?
        .into_iter()
        .find(|r| r.question_id == answer.question_id)
        .ok_or(sqlx::Error::RowNotFound)?;
    tx.commit().await?;

    Ok(ApiResponse::created("Answer recorded", response))
}

pub async fn finish_session(
    State(state): State<AppState>,
    user: AuthUser,
    Path(session_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<SessionDetail>>> {
    let mut tx = state.pool.begin().await?;

    let finished_at = sqlx::query_scalar::<_, Option<OffsetDateTime>>(
        "SELECT finished_at FROM flip_feel_sessions WHERE id = $1 AND owner_id = $2 FOR UPDATE",
    )
    .bind(session_id)
    .bind(user.user_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(session_not_found)?;
    if finished_at.is_some() {
        return Err(AppError::conflict(codes::SESSION_FINISHED, "This session is already finished"));
    }

    let session = sqlx::query_as::<_, Session>(
        "UPDATE flip_feel_sessions SET finished_at = $2 WHERE id = $1 RETURNING id, started_at, finished_at",
    )
    .bind(session_id)
    .bind(OffsetDateTime::now_utc())
    .fetch_one(&mut *tx)
    .await?;
    let responses = load_responses(&mut tx, session_id).await?;
    tx.commit().await?;

    info!("🃏 User {} finished session {}", user.user_id, session_id);
    Ok(ApiResponse::ok("Session finished", SessionDetail { session, responses }))
}

pub async fn list_sessions(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<Vec<SessionSummary>>>> {
    let sessions = sqlx::query_as::<_, SessionSummary>(
        r#"
        SELECT s.id, s.started_at, s.finished_at, COUNT(r.id) AS response_count
        FROM flip_feel_sessions s
        LEFT JOIN flip_feel_responses r ON r.session_id = s.id
        WHERE s.owner_id = $1
        GROUP BY s.id
        ORDER BY s.started_at DESC
        "#,
    )
    .bind(user.user_id)
    .fetch_all(&state.pool)
    .await?;

    Ok(ApiResponse::ok("Sessions retrieved", sessions))
}

pub async fn get_session(
    State(state): State<AppState>,
    user: AuthUser,
    Path(session_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<SessionDetail>>> {
    let mut conn = state.pool.acquire().await?;
    let session = sqlx::query_as::<_, Session>(
        "SELECT id, started_at, finished_at FROM flip_feel_sessions WHERE id = $1 AND owner_id = $2",
    )
    .bind(session_id)
    .bind(user.user_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(session_not_found)?;
    let responses = load_responses(&mut conn, session_id).await?;

    Ok(ApiResponse::ok("Session retrieved", SessionDetail { session, responses }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_choices_are_trimmed_and_counted() {
        let choices = normalize_choices(&[" Calm ".into(), "Restless".into()]).unwrap();
        assert_eq!(choices, vec!["Calm", "Restless"]);

        let err = normalize_choices(&["Only one".into()]).unwrap_err();
        assert_eq!(err.code, codes::VALIDATION_ERROR);
    }

    #[test]
    fn test_duplicate_choices_rejected() {
        let err = normalize_choices(&["Calm".into(), "calm ".into()]).unwrap_err();
        assert_eq!(err.code, codes::VALIDATION_ERROR);
        assert!(err.message.contains("Duplicate"));
    }

    #[test]
    fn test_blank_choice_rejected() {
        assert!(normalize_choices(&["Calm".into(), "   ".into()]).is_err());
    }

    #[test]
    fn test_repeated_question_is_duplicate_response() {
        let question_id = Uuid::new_v4();
        let answers = [
            AnswerRequest { question_id, choice_id: Uuid::new_v4() },
            AnswerRequest { question_id: Uuid::new_v4(), choice_id: Uuid::new_v4() },
            AnswerRequest { question_id, choice_id: Uuid::new_v4() },
        ];
        let err = ensure_unique_questions(&answers).unwrap_err();
        assert_eq!(err.code, codes::DUPLICATE_RESPONSE);
        assert!(ensure_unique_questions(&answers[..2]).is_ok());
    }
}
