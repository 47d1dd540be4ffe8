use crate::permissions::Permission;
use crate::routes::error::{db_response, engine_response};
use crate::user::ExtractActor;
use axum::response::{IntoResponse, Response};
use axum::routing::{Router, get};
use axum::{Extension, Json, extract::Path, extract::Query as QueryParams};
use protect_axum::protect;
use sea_orm::DatabaseConnection;
use serde_derive::Deserialize;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;
use windward_core::EngineError;
use windward_db::result;
use windward_db::sea_orm::DbErr;
use windward_entity::result::ResultKind;
use windward_model::history::{History, ProgressReport, SkillTrend};
use windward_model::result::{ResultKind as ResultKindView, ResultView};
use windward_model_tools::convert::TryIntoModel;
use windward_model_tools::error::ConversionError;

pub(crate) fn create_router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().nest(
        "/{student}",
        Router::new()
            .route("/history", get(history))
            .route("/progress", get(progress)),
    )
}

#[derive(Debug, Error)]
pub(crate) enum StudentError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Db(#[from] DbErr),

    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error("caller may not read this student's records")]
    Forbidden,

    #[error("unknown result type filter")]
    BadFilter,
}

impl IntoResponse for StudentError {
    fn into_response(self) -> Response {
        match self {
            Self::Engine(error) => engine_response(error),
            Self::Db(error) => db_response(error),
            Self::Conversion(error) => {
                tracing::error!(error = &error as &dyn std::error::Error, "stored result unreadable");
                http::StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
            Self::Forbidden => http::StatusCode::FORBIDDEN.into_response(),
            Self::BadFilter => (http::StatusCode::BAD_REQUEST, "unknown result type filter").into_response(),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub(crate) struct HistoryFilter {
    #[serde(default)]
    pub result_type: Option<String>,
}

fn parse_kind(filter: &HistoryFilter) -> Result<Option<ResultKind>, StudentError> {
    match filter.result_type.as_deref() {
        None => Ok(None),
        Some("P") => Ok(Some(ResultKind::Placement)),
        Some("S") => Ok(Some(ResultKind::Speaking)),
        Some("W") => Ok(Some(ResultKind::Writing)),
        Some(_) => Err(StudentError::BadFilter),
    }
}

#[utoipa::path(
    get,
    path = "/students/{student}/history",
    responses((status = OK, body = History, description = "Completed results, newest first")),
    params(
        ("student" = Uuid, Path, description = "test-taker id"),
        ("result_type" = Option<String>, Query, description = "P, S, or W"),
    ),
    tag = "students",
)]
#[protect("Permission::Student", ty = "Permission")]
pub(crate) async fn history(
    ExtractActor(actor): ExtractActor,
    Extension(conn): Extension<DatabaseConnection>,
    Path(student): Path<Uuid>,
    QueryParams(filter): QueryParams<HistoryFilter>,
) -> Result<impl IntoResponse, StudentError> {
    if !actor.may_access(student) {
        return Err(StudentError::Forbidden);
    }
    let kind = parse_kind(&filter)?;
    let results = result::Query::history_for_test_taker(&conn, student, kind)
        .await?
        .into_iter()
        .map(TryIntoModel::try_into_model)
        .collect::<Result<Vec<ResultView>, _>>()?;
    Ok(Json(History { results }))
}

#[utoipa::path(
    get,
    path = "/students/{student}/progress",
    responses((status = OK, body = ProgressReport, description = "Per-skill movement across the latest placements")),
    params(("student" = Uuid, Path, description = "test-taker id")),
    tag = "students",
)]
#[protect("Permission::Student", ty = "Permission")]
pub(crate) async fn progress(
    ExtractActor(actor): ExtractActor,
    Extension(conn): Extension<DatabaseConnection>,
    Path(student): Path<Uuid>,
) -> Result<impl IntoResponse, StudentError> {
    if !actor.may_access(student) {
        return Err(StudentError::Forbidden);
    }
    let placements = result::Query::history_for_test_taker(&conn, student, Some(ResultKind::Placement))
        .await?
        .into_iter()
        .map(TryIntoModel::try_into_model)
        .collect::<Result<Vec<ResultView>, _>>()?;
    Ok(Json(build_report(&placements)))
}

/// Compare the two most recent placements per skill; a single placement
/// reports zero deltas.
fn build_report(placements: &[ResultView]) -> ProgressReport {
    let Some(latest) = placements.first() else {
        return ProgressReport {
            overall_level: None,
            trends: Vec::new(),
        };
    };
    debug_assert!(latest.result_kind == ResultKindView::Placement);
    let previous = placements.get(1);

    let trends = latest
        .skill_scores
        .iter()
        .map(|(skill, score)| {
            let previous_theta = previous.and_then(|result| result.skill_scores.get(skill)).map(|s| s.theta);
            SkillTrend {
                skill: skill.clone(),
                previous_theta,
                current_theta: score.theta,
                delta: previous_theta.map_or(0.0, |prev| score.theta - prev),
                current_level: score.cefr,
            }
        })
        .collect();

    ProgressReport {
        overall_level: Some(latest.proficiency_level),
        trends,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::BTreeMap;
    use windward_irt::CefrLevel;
    use windward_model::result::SkillScore;

    fn placement(grammar_theta: f64) -> ResultView {
        ResultView {
            result_id: Uuid::new_v4(),
            session_id: Uuid::new_v4(),
            proficiency_level: CefrLevel::B1,
            skill_scores: BTreeMap::from([("grammar".to_owned(), SkillScore {
                theta: grammar_theta,
                standard_error: Some(0.3),
                cefr: CefrLevel::B1,
            })]),
            overall_score: grammar_theta,
            result_kind: ResultKindView::Placement,
            information_metric: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn report_compares_latest_two_placements() {
        let report = build_report(&[placement(0.6), placement(0.1)]);
        assert_eq!(report.overall_level, Some(CefrLevel::B1));
        let trend = &report.trends[0];
        assert_eq!(trend.previous_theta, Some(0.1));
        assert!((trend.delta - 0.5).abs() < 1e-9);
    }

    #[test]
    fn single_placement_reports_zero_delta() {
        let report = build_report(&[placement(0.4)]);
        assert!((report.trends[0].delta).abs() < 1e-9);
        assert_eq!(report.trends[0].previous_theta, None);
    }

    #[test]
    fn no_placements_reports_empty() {
        let report = build_report(&[]);
        assert!(report.overall_level.is_none());
        assert!(report.trends.is_empty());
    }
}
