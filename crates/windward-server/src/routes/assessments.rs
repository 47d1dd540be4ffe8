use crate::AppConfig;
use crate::permissions::Permission;
use crate::user::ExtractActor;
use axum::response::IntoResponse;
use axum::routing::{Router, get, post};
use axum::{Extension, Json, extract::Path};
use chrono::Utc;
use error::Error;
use protect_axum::protect;
use sea_orm::DatabaseConnection;
use serde_derive::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;
use windward_core::engine;
use windward_core::{AnswerCommand, AnswerOutcome};
use windward_model::item::PublicItem;
use windward_model::recommendation::RecommendationView;
use windward_model::result::ResultView;
use windward_model::session::{Progress, SessionView};
use windward_model_tools::convert::IntoModel;

pub(crate) mod error;

pub(crate) fn create_router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route("/start", post(start)).nest(
        "/{session}",
        Router::new()
            .route("/", get(get_session))
            .route("/answer", post(answer))
            .route("/complete", get(complete)),
    )
}

#[derive(Debug, Deserialize, ToSchema)]
pub(crate) struct StartRequest {
    pub assigned_id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
pub(crate) struct StartResponse {
    pub session_id: Uuid,
    pub question: PublicItem,
    pub progress: Progress,
    pub resumed: bool,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub(crate) struct AnswerRequest {
    pub item_id: Uuid,
    pub response_data: Value,
    pub current_index: i32,
    #[serde(default)]
    pub time_taken: Option<i32>,
    #[serde(default)]
    pub media_key: Option<String>,
}

impl From<AnswerRequest> for AnswerCommand {
    fn from(request: AnswerRequest) -> Self {
        Self {
            item_id: request.item_id,
            response_data: request.response_data,
            time_taken: request.time_taken,
            current_index: request.current_index,
            media_key: request.media_key,
        }
    }
}

/// Either a single answer or, for batch-mode diagnostic templates, the full
/// response list.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(untagged)]
pub(crate) enum AnswerBody {
    Batch(Vec<AnswerRequest>),
    One(AnswerRequest),
}

#[derive(Debug, Serialize, ToSchema)]
pub(crate) struct AnswerResponse {
    pub is_complete: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_question: Option<PublicItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<Progress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ResultView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendations: Option<Vec<RecommendationView>>,
}

impl From<AnswerOutcome> for AnswerResponse {
    fn from(outcome: AnswerOutcome) -> Self {
        match outcome {
            AnswerOutcome::Next(next) => Self {
                is_complete: false,
                next_question: Some(next.question),
                progress: Some(next.progress),
                result: None,
                recommendations: None,
            },
            AnswerOutcome::AwaitingCompletion { progress, .. } => Self {
                is_complete: false,
                next_question: None,
                progress: Some(progress),
                result: None,
                recommendations: None,
            },
            AnswerOutcome::Completed(completion) => Self {
                is_complete: true,
                next_question: None,
                progress: None,
                result: Some(completion.result),
                recommendations: Some(completion.recommendations),
            },
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub(crate) struct CompleteResponse {
    pub result: ResultView,
    pub recommendations: Vec<RecommendationView>,
}

#[utoipa::path(
    post,
    path = "/assessments/start",
    request_body = StartRequest,
    responses(
        (status = OK, body = StartResponse, description = "Starts a new attempt or resumes the in-flight one"),
    ),
    tag = "assessments",
)]
#[axum::debug_handler]
#[protect("Permission::Student", ty = "Permission")]
pub(crate) async fn start(
    ExtractActor(actor): ExtractActor,
    Extension(conn): Extension<DatabaseConnection>,
    Extension(app_config): Extension<AppConfig>,
    Json(body): Json<StartRequest>,
) -> Result<impl IntoResponse, Error> {
    let outcome = engine::start(&conn, app_config.engine(), &actor, body.assigned_id, Utc::now()).await?;
    tracing::debug!(
        session_id = %outcome.session_id,
        assigned_id = %body.assigned_id,
        resumed = outcome.resumed,
        "start handled"
    );
    Ok(Json(StartResponse {
        session_id: outcome.session_id,
        question: outcome.question,
        progress: outcome.progress,
        resumed: outcome.resumed,
    }))
}

#[utoipa::path(
    post,
    path = "/assessments/{session}/answer",
    request_body = AnswerBody,
    responses(
        (status = OK, body = AnswerResponse, description = "Next question or completion signal"),
        (status = CONFLICT, description = "Stale current_index or concurrent submission"),
    ),
    params(
        ("session" = Uuid, Path, description = "session id"),
    ),
    tag = "assessments",
)]
#[protect("Permission::Student", ty = "Permission")]
pub(crate) async fn answer(
    ExtractActor(actor): ExtractActor,
    Extension(conn): Extension<DatabaseConnection>,
    Extension(app_config): Extension<AppConfig>,
    Path(session): Path<Uuid>,
    Json(body): Json<AnswerBody>,
) -> Result<impl IntoResponse, Error> {
    let now = Utc::now();
    let outcome = match body {
        AnswerBody::One(request) => {
            engine::answer(&conn, app_config.engine(), &actor, session, request.into(), now).await?
        }
        AnswerBody::Batch(requests) => {
            let commands = requests.into_iter().map(Into::into).collect();
            engine::answer_batch(&conn, app_config.engine(), &actor, session, commands, now).await?
        }
    };
    Ok(Json(AnswerResponse::from(outcome)))
}

#[utoipa::path(
    get,
    path = "/assessments/{session}/complete",
    responses(
        (status = OK, body = CompleteResponse, description = "Idempotent finalize; repeat calls return the stored result"),
        (status = SERVICE_UNAVAILABLE, description = "External scorer unavailable; retry later"),
    ),
    params(
        ("session" = Uuid, Path, description = "session id"),
    ),
    tag = "assessments",
)]
#[protect("Permission::Student", ty = "Permission")]
pub(crate) async fn complete(
    ExtractActor(actor): ExtractActor,
    Extension(conn): Extension<DatabaseConnection>,
    Extension(app_config): Extension<AppConfig>,
    Path(session): Path<Uuid>,
) -> Result<impl IntoResponse, Error> {
    let completion = engine::complete(
        &conn,
        app_config.engine(),
        app_config.scorers(),
        &actor,
        session,
        Utc::now(),
    )
    .await?;
    Ok(Json(CompleteResponse {
        result: completion.result,
        recommendations: completion.recommendations,
    }))
}

#[utoipa::path(
    get,
    path = "/assessments/{session}",
    responses(
        (status = OK, body = SessionView, description = "Current session state"),
    ),
    params(
        ("session" = Uuid, Path, description = "session id"),
    ),
    tag = "assessments",
)]
#[protect("Permission::Student", ty = "Permission")]
pub(crate) async fn get_session(
    ExtractActor(actor): ExtractActor,
    Extension(conn): Extension<DatabaseConnection>,
    Path(session): Path<Uuid>,
) -> Result<impl IntoResponse, Error> {
    let row = windward_db::session::Query::require(&conn, session).await?;
    let assignment = windward_db::assignment::Query::require(&conn, row.assigned_id).await?;
    if !actor.may_access(assignment.test_taker_id) {
        return Err(Error::Forbidden);
    }
    let view: SessionView = row.into_model();
    Ok(Json(view))
}
