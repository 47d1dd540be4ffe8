use crate::permissions::Permission;
use crate::user::ExtractActor;
use axum::response::IntoResponse;
use axum::routing::{Router, delete, get, post};
use axum::{Extension, Json, extract::Path};
use chrono::{DateTime, Utc};
use error::AdminError;
use http::StatusCode;
use protect_axum::protect;
use sea_orm::{ConnectionTrait, DatabaseConnection, TransactionTrait};
use serde_derive::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;
use windward_core::{OverrideItem, engine};
use windward_config::{AdaptiveParams, DiagnosticParams};
use windward_db::{assignment, audit, catalog, item, pathway, recommendation, template};
use windward_entity::item::ItemKind;
use windward_entity::recommendation::ContentKind;
use windward_entity::template::AssessmentType;
use windward_irt::{CefrLevel, ItemParams};
use windward_model::recommendation::RecommendationView;
use windward_model_tools::convert::IntoModel;

pub(crate) mod error;

pub(crate) fn create_router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/pathways", post(create_pathway))
        .route("/templates", get(list_templates).post(create_template))
        .route("/items", post(create_item))
        .route("/items/{item}", delete(deactivate_item))
        .route("/courses", post(create_course))
        .route("/courses/{course}", delete(archive_course))
        .route("/lessons", post(create_lesson))
        .route("/assessments/assign", post(assign))
        .route("/assessments/{session}/cancel", post(cancel_session))
        .route("/recommendations/{result}", get(get_recommendations))
        .route("/recommendations/{result}/override", post(override_recommendations))
}

#[derive(Debug, Deserialize, ToSchema)]
pub(crate) struct CreatePathwayRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub(crate) struct CreatedResponse {
    pub id: Uuid,
}

#[utoipa::path(
    post,
    path = "/admin/pathways",
    request_body = CreatePathwayRequest,
    responses((status = CREATED, body = CreatedResponse, description = "Pathway created")),
    tag = "admin",
)]
#[protect("Permission::Admin", ty = "Permission")]
pub(crate) async fn create_pathway(
    ExtractActor(actor): ExtractActor,
    Extension(conn): Extension<DatabaseConnection>,
    Json(body): Json<CreatePathwayRequest>,
) -> Result<impl IntoResponse, AdminError> {
    if body.name.trim().is_empty() {
        return Err(AdminError::Validation("pathway name must not be empty".to_owned()));
    }
    let now = Utc::now();
    let pathway = conn
        .transaction(move |tx| {
            Box::pin(async move {
                let pathway = pathway::Mutation::create(tx, body.name, body.description, now).await?;
                audit_created(tx, &actor, "pathway", pathway.id, now).await?;
                Ok::<_, AdminError>(pathway)
            })
        })
        .await?;
    Ok((StatusCode::CREATED, Json(CreatedResponse { id: pathway.id })))
}

#[derive(Debug, Deserialize, ToSchema)]
pub(crate) struct CreateTemplateRequest {
    pub pathway_id: Uuid,
    pub name: String,
    pub assessment_type: String,
    #[serde(default)]
    pub rubric: Option<Value>,
    #[serde(default)]
    pub parameters: Option<Value>,
    #[serde(default)]
    pub adaptive_params: Option<Value>,
    #[serde(default)]
    pub speaking_params: Option<Value>,
    #[serde(default)]
    pub writing_params: Option<Value>,
    #[serde(default)]
    pub item_ids: Vec<Uuid>,
}

#[utoipa::path(
    post,
    path = "/admin/templates",
    request_body = CreateTemplateRequest,
    responses((status = CREATED, body = CreatedResponse, description = "Template published")),
    tag = "admin",
)]
#[protect("Permission::Admin", ty = "Permission")]
pub(crate) async fn create_template(
    ExtractActor(actor): ExtractActor,
    Extension(conn): Extension<DatabaseConnection>,
    Json(body): Json<CreateTemplateRequest>,
) -> Result<impl IntoResponse, AdminError> {
    let assessment_type = parse_assessment_type(&body.assessment_type)?;
    pathway::Query::require(&conn, body.pathway_id).await?;

    // Tunables are validated at authoring time so sessions never trip over
    // a malformed stored config.
    AdaptiveParams::decode(body.adaptive_params.as_ref())?;
    DiagnosticParams::decode_speaking(body.speaking_params.as_ref())?;
    DiagnosticParams::decode_writing(body.writing_params.as_ref())?;
    if matches!(assessment_type, AssessmentType::Speaking | AssessmentType::Writing) && body.item_ids.is_empty() {
        return Err(AdminError::Validation(
            "non-adaptive templates need a fixed item list".to_owned(),
        ));
    }

    let now = Utc::now();
    let template = conn
        .transaction(move |tx| {
            Box::pin(async move {
                let template = template::Mutation::create(
                    tx,
                    body.pathway_id,
                    body.name,
                    assessment_type,
                    body.rubric,
                    body.parameters,
                    body.adaptive_params,
                    body.speaking_params,
                    body.writing_params,
                    body.item_ids,
                    now,
                )
                .await?;
                audit_created(tx, &actor, "template", template.id, now).await?;
                Ok::<_, AdminError>(template)
            })
        })
        .await?;
    Ok((StatusCode::CREATED, Json(CreatedResponse { id: template.id })))
}

#[utoipa::path(
    get,
    path = "/admin/templates",
    responses((status = OK, description = "All templates")),
    tag = "admin",
)]
#[protect("Permission::Admin", ty = "Permission")]
pub(crate) async fn list_templates(
    Extension(conn): Extension<DatabaseConnection>,
) -> Result<impl IntoResponse, AdminError> {
    let templates = template::Query::all(&conn).await?;
    let summaries: Vec<Value> = templates
        .into_iter()
        .map(|template| {
            serde_json::json!({
                "id": template.id,
                "pathway_id": template.pathway_id,
                "name": template.name,
                "version": template.version,
                "active": template.active,
            })
        })
        .collect();
    Ok(Json(summaries))
}

#[derive(Debug, Deserialize, ToSchema)]
pub(crate) struct IrtParamsRequest {
    pub discrimination: f64,
    pub difficulty: f64,
    #[serde(default)]
    pub guessing: f64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub(crate) struct CreateItemRequest {
    pub content: Value,
    pub item_kind: String,
    pub skill_areas: Vec<String>,
    pub target_cefr: String,
    pub irt_params: IrtParamsRequest,
}

#[utoipa::path(
    post,
    path = "/admin/items",
    request_body = CreateItemRequest,
    responses((status = CREATED, body = CreatedResponse, description = "Calibrated item stored")),
    tag = "admin",
)]
#[protect("Permission::Admin", ty = "Permission")]
pub(crate) async fn create_item(
    ExtractActor(actor): ExtractActor,
    Extension(conn): Extension<DatabaseConnection>,
    Json(body): Json<CreateItemRequest>,
) -> Result<impl IntoResponse, AdminError> {
    let kind = parse_item_kind(&body.item_kind)?;
    CefrLevel::from_str(&body.target_cefr)
        .map_err(|_| AdminError::Validation(format!("\"{}\" is not a CEFR level", body.target_cefr)))?;
    ItemParams::new(
        body.irt_params.discrimination,
        body.irt_params.difficulty,
        body.irt_params.guessing,
    )
    .map_err(|error| AdminError::Validation(error.to_string()))?;
    if body.skill_areas.is_empty() {
        return Err(AdminError::Validation("items need at least one skill area".to_owned()));
    }
    if kind == ItemKind::MultipleChoice && body.content.get("correct_answer").is_none() {
        return Err(AdminError::Validation(
            "multiple-choice items need a correct_answer".to_owned(),
        ));
    }

    let now = Utc::now();
    let item = conn
        .transaction(move |tx| {
            Box::pin(async move {
                let item = item::Mutation::create(
                    tx,
                    body.content,
                    kind,
                    body.skill_areas,
                    body.target_cefr,
                    body.irt_params.discrimination,
                    body.irt_params.difficulty,
                    body.irt_params.guessing,
                    now,
                )
                .await?;
                audit_created(tx, &actor, "item", item.id, now).await?;
                Ok::<_, AdminError>(item)
            })
        })
        .await?;
    Ok((StatusCode::CREATED, Json(CreatedResponse { id: item.id })))
}

#[utoipa::path(
    delete,
    path = "/admin/items/{item}",
    responses((status = NO_CONTENT, description = "Item deactivated")),
    params(("item" = Uuid, Path, description = "item id")),
    tag = "admin",
)]
#[protect("Permission::Admin", ty = "Permission")]
pub(crate) async fn deactivate_item(
    ExtractActor(actor): ExtractActor,
    Extension(conn): Extension<DatabaseConnection>,
    Path(item_id): Path<Uuid>,
) -> Result<impl IntoResponse, AdminError> {
    item::Query::require(&conn, item_id).await?;
    item::Mutation::deactivate(&conn, item_id).await?;
    let now = Utc::now();
    audit::Mutation::append(
        &conn,
        Some(actor.user_id),
        actor.kind,
        "item.deactivated",
        "item",
        item_id.to_string(),
        None,
        now,
    )
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize, ToSchema)]
pub(crate) struct CreateCourseRequest {
    pub pathway_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub target_cefr: String,
    pub primary_skill: String,
    #[serde(default)]
    pub secondary_skills: Vec<String>,
    #[serde(default)]
    pub difficulty_order: i32,
    #[serde(default)]
    pub prerequisites: Option<Value>,
}

#[utoipa::path(
    post,
    path = "/admin/courses",
    request_body = CreateCourseRequest,
    responses((status = CREATED, body = CreatedResponse, description = "Course created")),
    tag = "admin",
)]
#[protect("Permission::Admin", ty = "Permission")]
pub(crate) async fn create_course(
    ExtractActor(actor): ExtractActor,
    Extension(conn): Extension<DatabaseConnection>,
    Json(body): Json<CreateCourseRequest>,
) -> Result<impl IntoResponse, AdminError> {
    CefrLevel::from_str(&body.target_cefr)
        .map_err(|_| AdminError::Validation(format!("\"{}\" is not a CEFR level", body.target_cefr)))?;
    pathway::Query::require(&conn, body.pathway_id).await?;
    let now = Utc::now();
    let course = conn
        .transaction(move |tx| {
            Box::pin(async move {
                let course = catalog::Mutation::create_course(
                    tx,
                    body.pathway_id,
                    body.title,
                    body.description,
                    body.target_cefr,
                    body.primary_skill,
                    body.secondary_skills,
                    body.difficulty_order,
                    body.prerequisites.unwrap_or_else(|| serde_json::json!({})),
                    now,
                )
                .await?;
                audit_created(tx, &actor, "course", course.id, now).await?;
                Ok::<_, AdminError>(course)
            })
        })
        .await?;
    Ok((StatusCode::CREATED, Json(CreatedResponse { id: course.id })))
}

#[utoipa::path(
    delete,
    path = "/admin/courses/{course}",
    responses((status = NO_CONTENT, description = "Course archived")),
    params(("course" = Uuid, Path, description = "course id")),
    tag = "admin",
)]
#[protect("Permission::Admin", ty = "Permission")]
pub(crate) async fn archive_course(
    ExtractActor(actor): ExtractActor,
    Extension(conn): Extension<DatabaseConnection>,
    Path(course_id): Path<Uuid>,
) -> Result<impl IntoResponse, AdminError> {
    catalog::Query::course_by_id(&conn, course_id)
        .await?
        .ok_or(AdminError::NotFound)?;
    catalog::Mutation::archive_course(&conn, course_id).await?;
    let now = Utc::now();
    audit::Mutation::append(
        &conn,
        Some(actor.user_id),
        actor.kind,
        "course.archived",
        "course",
        course_id.to_string(),
        None,
        now,
    )
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize, ToSchema)]
pub(crate) struct CreateLessonRequest {
    pub course_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub lesson_order: i32,
    #[serde(default)]
    pub target_skills: Vec<String>,
}

#[utoipa::path(
    post,
    path = "/admin/lessons",
    request_body = CreateLessonRequest,
    responses((status = CREATED, body = CreatedResponse, description = "Lesson created")),
    tag = "admin",
)]
#[protect("Permission::Admin", ty = "Permission")]
pub(crate) async fn create_lesson(
    ExtractActor(actor): ExtractActor,
    Extension(conn): Extension<DatabaseConnection>,
    Json(body): Json<CreateLessonRequest>,
) -> Result<impl IntoResponse, AdminError> {
    catalog::Query::course_by_id(&conn, body.course_id)
        .await?
        .ok_or(AdminError::NotFound)?;
    let now = Utc::now();
    let lesson = conn
        .transaction(move |tx| {
            Box::pin(async move {
                let lesson = catalog::Mutation::create_lesson(
                    tx,
                    body.course_id,
                    body.title,
                    body.lesson_order,
                    body.target_skills,
                    now,
                )
                .await?;
                audit_created(tx, &actor, "lesson", lesson.id, now).await?;
                Ok::<_, AdminError>(lesson)
            })
        })
        .await?;
    Ok((StatusCode::CREATED, Json(CreatedResponse { id: lesson.id })))
}

#[derive(Debug, Deserialize, ToSchema)]
pub(crate) struct AssignRequest {
    pub template_id: Uuid,
    pub test_taker_ids: Vec<Uuid>,
    #[serde(default)]
    pub due_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub(crate) struct AssignResponse {
    pub assigned_ids: Vec<Uuid>,
}

#[utoipa::path(
    post,
    path = "/admin/assessments/assign",
    request_body = AssignRequest,
    responses((status = CREATED, body = AssignResponse, description = "One assignment per test-taker")),
    tag = "admin",
)]
#[protect("Permission::Admin", ty = "Permission")]
pub(crate) async fn assign(
    ExtractActor(actor): ExtractActor,
    Extension(conn): Extension<DatabaseConnection>,
    Json(body): Json<AssignRequest>,
) -> Result<impl IntoResponse, AdminError> {
    if body.test_taker_ids.is_empty() {
        return Err(AdminError::Validation("test_taker_ids must not be empty".to_owned()));
    }
    let template = template::Query::require(&conn, body.template_id).await?;
    if !template.active {
        return Err(AdminError::Validation("template is archived".to_owned()));
    }
    let now = Utc::now();
    let assigned_ids = conn
        .transaction(move |tx| {
            Box::pin(async move {
                let assigned_ids = assignment::Mutation::assign_many(
                    tx,
                    body.template_id,
                    &body.test_taker_ids,
                    actor.user_id,
                    body.due_at,
                    now,
                )
                .await?;
                audit::Mutation::append(
                    tx,
                    Some(actor.user_id),
                    actor.kind,
                    "assessment.assigned",
                    "template",
                    body.template_id.to_string(),
                    Some(serde_json::json!({"count": assigned_ids.len()})),
                    now,
                )
                .await?;
                Ok::<_, AdminError>(assigned_ids)
            })
        })
        .await?;
    Ok((StatusCode::CREATED, Json(AssignResponse { assigned_ids })))
}

#[utoipa::path(
    post,
    path = "/admin/assessments/{session}/cancel",
    responses((status = NO_CONTENT, description = "Session cancelled; no result is produced")),
    params(("session" = Uuid, Path, description = "session id")),
    tag = "admin",
)]
#[protect("Permission::Admin", ty = "Permission")]
pub(crate) async fn cancel_session(
    ExtractActor(actor): ExtractActor,
    Extension(conn): Extension<DatabaseConnection>,
    Path(session): Path<Uuid>,
) -> Result<impl IntoResponse, AdminError> {
    engine::cancel(&conn, &actor, session, Utc::now()).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize, ToSchema)]
pub(crate) struct OverrideRow {
    pub content_type: String,
    pub content_id: Uuid,
    pub target_skill: String,
    pub priority: i32,
}

#[utoipa::path(
    post,
    path = "/admin/recommendations/{result}/override",
    request_body = [OverrideRow],
    responses(
        (status = OK, body = [RecommendationView], description = "The stored plan after the atomic replacement"),
    ),
    params(("result" = Uuid, Path, description = "result id")),
    tag = "admin",
)]
#[protect("Permission::Admin", ty = "Permission")]
pub(crate) async fn override_recommendations(
    ExtractActor(actor): ExtractActor,
    Extension(conn): Extension<DatabaseConnection>,
    Path(result): Path<Uuid>,
    Json(body): Json<Vec<OverrideRow>>,
) -> Result<impl IntoResponse, AdminError> {
    let items = body
        .into_iter()
        .map(|row| {
            let content_kind = match row.content_type.as_str() {
                "course" => ContentKind::Course,
                "lesson" => ContentKind::Lesson,
                other => return Err(AdminError::Validation(format!("unknown content type \"{other}\""))),
            };
            Ok(OverrideItem {
                content_kind,
                content_id: row.content_id,
                target_skill: row.target_skill,
                priority_order: row.priority,
            })
        })
        .collect::<Result<Vec<_>, AdminError>>()?;

    let stored = engine::override_recommendations(&conn, &actor, result, items, Utc::now()).await?;
    Ok(Json(stored))
}

/// Read side of the override endpoint, used by admins to inspect a plan.
#[utoipa::path(
    get,
    path = "/admin/recommendations/{result}",
    responses((status = OK, body = [RecommendationView], description = "Current plan rows")),
    params(("result" = Uuid, Path, description = "result id")),
    tag = "admin",
)]
#[protect("Permission::Admin", ty = "Permission")]
pub(crate) async fn get_recommendations(
    Extension(conn): Extension<DatabaseConnection>,
    Path(result): Path<Uuid>,
) -> Result<impl IntoResponse, AdminError> {
    let rows: Vec<RecommendationView> = recommendation::Query::for_result(&conn, result)
        .await?
        .into_iter()
        .map(IntoModel::into_model)
        .collect();
    Ok(Json(rows))
}

fn parse_assessment_type(value: &str) -> Result<AssessmentType, AdminError> {
    match value {
        "PLACEMENT" => Ok(AssessmentType::Placement),
        "SPEAKING" => Ok(AssessmentType::Speaking),
        "WRITING" => Ok(AssessmentType::Writing),
        other => Err(AdminError::Validation(format!("unknown assessment type \"{other}\""))),
    }
}

fn parse_item_kind(value: &str) -> Result<ItemKind, AdminError> {
    match value {
        "multiple_choice" => Ok(ItemKind::MultipleChoice),
        "speaking_prompt" => Ok(ItemKind::SpeakingPrompt),
        "writing_prompt" => Ok(ItemKind::WritingPrompt),
        other => Err(AdminError::Validation(format!("unknown item kind \"{other}\""))),
    }
}

async fn audit_created<C: ConnectionTrait>(
    conn: &C,
    actor: &windward_core::EngineActor,
    entity_type: &str,
    entity_id: Uuid,
    now: DateTime<Utc>,
) -> Result<(), AdminError> {
    audit::Mutation::append(
        conn,
        Some(actor.user_id),
        actor.kind,
        &format!("{entity_type}.created"),
        entity_type,
        entity_id.to_string(),
        None,
        now,
    )
    .await?;
    Ok(())
}
