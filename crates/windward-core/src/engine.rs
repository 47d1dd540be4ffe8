use crate::error::EngineError;
use crate::recommend::{self, RecommendationSettings};
use crate::scorer::{self, Scorers};
use crate::snapshot::{TemplateKind, TemplateSnapshot};
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use uuid::Uuid;
use windward_config::{AdaptiveParams, DiagnosticParams, GeneralParams};
use windward_db::recommendation::NewRecommendation;
use windward_db::result::NewResult;
use windward_db::sea_orm::{ConnectionTrait, TransactionTrait};
use windward_db::{assignment, audit, catalog, item, recommendation, result, session, template};
use windward_entity::assignment::AssignmentStatus;
use windward_entity::audit::ActorKind;
use windward_entity::result::ResultKind;
use windward_entity::session::SessionStatus;
use windward_entity::template::config::Model as ConfigRow;
use windward_irt::select::CandidateItem;
use windward_irt::terminate::StopReason;
use windward_irt::{IrtModel, ItemParams, QuadratureGrid, ScoredResponse, select_next};
use windward_model::item::PublicItem;
use windward_model::recommendation::RecommendationView;
use windward_model::result::{ResultView, SkillScore};
use windward_model::session::Progress;
use windward_model_tools::convert::{IntoModel, TryIntoModel};

mod answer;

pub use answer::{AnswerCommand, answer, answer_batch};

/// Service-level defaults threaded through construction; per-template
/// tunables from the config row take precedence where both exist.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub session_ttl_minutes: i64,
    pub quadrature_size: usize,
    pub default_top_k: usize,
    pub default_irt_model: IrtModel,
    pub recommendation: RecommendationSettings,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            session_ttl_minutes: 120,
            quadrature_size: 41,
            default_top_k: 1,
            default_irt_model: IrtModel::default(),
            recommendation: RecommendationSettings::default(),
        }
    }
}

/// The identity acting on the engine, as asserted by the portal BFF.
#[derive(Debug, Clone, Copy)]
pub struct EngineActor {
    pub user_id: Uuid,
    pub kind: ActorKind,
}

impl EngineActor {
    /// Students may only touch their own attempts; staff and the system
    /// sweep may touch any.
    #[must_use]
    pub fn may_access(&self, owner: Uuid) -> bool {
        match self.kind {
            ActorKind::Student => self.user_id == owner,
            ActorKind::Teacher | ActorKind::Admin | ActorKind::System => true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NextQuestion {
    pub session_id: Uuid,
    pub question: PublicItem,
    pub progress: Progress,
}

#[derive(Debug, Clone)]
pub struct Completion {
    pub session_id: Uuid,
    pub result: ResultView,
    pub recommendations: Vec<RecommendationView>,
}

/// Outcome of consuming an answer. Expected terminal states are variants,
/// not errors.
#[derive(Debug, Clone)]
pub enum AnswerOutcome {
    Next(NextQuestion),
    /// All fixed items are answered; the client should call `complete` to
    /// trigger external scoring.
    AwaitingCompletion { session_id: Uuid, progress: Progress },
    Completed(Completion),
}

#[derive(Debug, Clone)]
pub struct StartOutcome {
    pub session_id: Uuid,
    pub question: PublicItem,
    pub progress: Progress,
    pub resumed: bool,
}

pub(crate) struct SessionContext {
    pub session: windward_entity::session::Model,
    pub assignment: windward_entity::assignment::Model,
    pub snapshot: TemplateSnapshot,
}

pub(crate) async fn load_context<C: ConnectionTrait>(
    conn: &C,
    session_id: Uuid,
) -> Result<SessionContext, EngineError> {
    let session = session::Query::require(conn, session_id).await?;
    let assignment = assignment::Query::require(conn, session.assigned_id).await?;
    let snapshot = TemplateSnapshot::decode(&session.template_snapshot)?;
    Ok(SessionContext {
        session,
        assignment,
        snapshot,
    })
}

pub(crate) async fn load_config_row<C: ConnectionTrait>(
    conn: &C,
    template_id: Uuid,
) -> Result<Option<ConfigRow>, EngineError> {
    Ok(template::Query::active_config(conn, template_id).await?)
}

pub(crate) fn decode_adaptive(
    settings: &EngineSettings,
    config: Option<&ConfigRow>,
) -> Result<AdaptiveParams, EngineError> {
    let column = config.and_then(|row| row.adaptive_params.as_ref());
    let mut params = AdaptiveParams::decode(column)?;
    if column.is_none() {
        params.top_k_selection = settings.default_top_k;
        params.irt_model = settings.default_irt_model;
    }
    Ok(params)
}

pub(crate) fn decode_diagnostic(config: Option<&ConfigRow>, kind: TemplateKind) -> Result<DiagnosticParams, EngineError> {
    let params = match kind {
        TemplateKind::Speaking => DiagnosticParams::decode_speaking(config.and_then(|row| row.speaking_params.as_ref()))?,
        TemplateKind::Writing => DiagnosticParams::decode_writing(config.and_then(|row| row.writing_params.as_ref()))?,
        TemplateKind::Placement => DiagnosticParams::default(),
    };
    Ok(params)
}

pub(crate) fn session_ttl(settings: &EngineSettings, config: Option<&ConfigRow>) -> Result<Duration, EngineError> {
    let minutes = match config.and_then(|row| row.parameters.as_ref()) {
        Some(value) => GeneralParams::decode(Some(value))?.time_limit_minutes,
        None => settings.session_ttl_minutes,
    };
    Ok(Duration::minutes(minutes))
}

pub(crate) fn progress_of(session: &windward_entity::session::Model, max_questions: u32) -> Progress {
    Progress {
        questions_completed: session.questions_answered,
        max_questions,
        current_ability: session.current_ability,
        standard_error: session.standard_error,
    }
}

/// Start an attempt, or resume the in-flight one. Resumption returns the
/// question that was already presented, never a fresh selection.
pub async fn start<C: ConnectionTrait + TransactionTrait>(
    conn: &C,
    settings: &EngineSettings,
    actor: &EngineActor,
    assigned_id: Uuid,
    now: DateTime<Utc>,
) -> Result<StartOutcome, EngineError> {
    let assignment = assignment::Query::require(conn, assigned_id).await?;
    if !actor.may_access(assignment.test_taker_id) {
        return Err(EngineError::Forbidden);
    }

    if let Some(latest) = session::Query::latest_for_assignment(conn, assigned_id).await? {
        if latest.status == SessionStatus::InProgress {
            if latest.is_time_expired(now) {
                session::Mutation::set_status(conn, latest.id, SessionStatus::Expired).await?;
            } else {
                return resume(conn, settings, latest).await;
            }
        }
    }

    if !matches!(assignment.status, AssignmentStatus::Pending | AssignmentStatus::InProgress) {
        return Err(EngineError::AssignmentNotStartable);
    }
    if assignment.due_at.is_some_and(|due| now > due) {
        return Err(EngineError::AssignmentExpired);
    }

    let template = template::Query::require(conn, assignment.template_id).await?;
    let config = load_config_row(conn, template.id).await?;
    let snapshot = TemplateSnapshot::of(&template);
    let expires_at = now + session_ttl(settings, config.as_ref())?;

    match snapshot.kind {
        TemplateKind::Placement => {
            let adaptive = decode_adaptive(settings, config.as_ref())?;
            let bank = item::Query::load_active(conn).await?;
            let candidates = candidates_from(&bank, &HashSet::new(), &adaptive);
            let mut rng = rand::rng();
            let first = select_next(
                adaptive.starting_ability,
                adaptive.irt_model,
                &candidates,
                &BTreeMap::new(),
                &adaptive.quotas(),
                adaptive.top_k_selection,
                &mut rng,
            )
            .ok_or(EngineError::NoItemsAvailable)?;
            drop(rng);
            let first_id = first.id;

            let outcome = conn
                .transaction(|tx| {
                    let snapshot = snapshot.clone();
                    let actor = *actor;
                    Box::pin(async move {
                        let session = session::Mutation::create_session(
                            tx,
                            assigned_id,
                            adaptive.starting_ability,
                            snapshot.encode(),
                            template.rubric.clone(),
                            now,
                            expires_at,
                        )
                        .await?;
                        session::Mutation::present_item(tx, session.id, first_id, 0, now).await?;
                        assignment::Mutation::set_status(tx, assigned_id, AssignmentStatus::InProgress).await?;
                        audit::Mutation::append(
                            tx,
                            Some(actor.user_id),
                            actor.kind,
                            "assessment.started",
                            "session",
                            session.id.to_string(),
                            Some(serde_json::json!({"assigned_id": assigned_id})),
                            now,
                        )
                        .await?;
                        Ok::<_, EngineError>((session, adaptive.max_questions))
                    })
                })
                .await?;
            let (session, max_questions) = outcome;

            let question: PublicItem = item::Query::require(conn, first_id).await?.into_model();
            tracing::debug!(session_id = %session.id, %assigned_id, "started placement session");
            Ok(StartOutcome {
                session_id: session.id,
                progress: progress_of(&session, max_questions),
                question,
                resumed: false,
            })
        }
        TemplateKind::Speaking | TemplateKind::Writing => {
            let items = template::Query::ordered_items(conn, template.id).await?;
            let first = items.first().ok_or(EngineError::NoItemsAvailable)?;
            let first_id = first.item_id;
            let total = items.len() as u32;

            let session = conn
                .transaction(|tx| {
                    let snapshot = snapshot.clone();
                    let actor = *actor;
                    Box::pin(async move {
                        let session = session::Mutation::create_session(
                            tx,
                            assigned_id,
                            0.0,
                            snapshot.encode(),
                            template.rubric.clone(),
                            now,
                            expires_at,
                        )
                        .await?;
                        session::Mutation::present_item(tx, session.id, first_id, 0, now).await?;
                        assignment::Mutation::set_status(tx, assigned_id, AssignmentStatus::InProgress).await?;
                        audit::Mutation::append(
                            tx,
                            Some(actor.user_id),
                            actor.kind,
                            "assessment.started",
                            "session",
                            session.id.to_string(),
                            Some(serde_json::json!({"assigned_id": assigned_id})),
                            now,
                        )
                        .await?;
                        Ok::<_, EngineError>(session)
                    })
                })
                .await?;

            let question: PublicItem = item::Query::require(conn, first_id).await?.into_model();
            tracing::debug!(session_id = %session.id, %assigned_id, "started diagnostic session");
            Ok(StartOutcome {
                session_id: session.id,
                progress: progress_of(&session, total),
                question,
                resumed: false,
            })
        }
    }
}

async fn resume<C: ConnectionTrait>(
    conn: &C,
    settings: &EngineSettings,
    session: windward_entity::session::Model,
) -> Result<StartOutcome, EngineError> {
    let snapshot = TemplateSnapshot::decode(&session.template_snapshot)?;
    let pending = session::Query::pending_response(conn, session.id)
        .await?
        .ok_or(EngineError::Conflict)?;
    let question: PublicItem = item::Query::require(conn, pending.item_id).await?.into_model();
    let max_questions = max_questions_of(conn, settings, &snapshot).await?;
    tracing::debug!(session_id = %session.id, "resumed in-flight session");
    Ok(StartOutcome {
        session_id: session.id,
        progress: progress_of(&session, max_questions),
        question,
        resumed: true,
    })
}

pub(crate) async fn max_questions_of<C: ConnectionTrait>(
    conn: &C,
    settings: &EngineSettings,
    snapshot: &TemplateSnapshot,
) -> Result<u32, EngineError> {
    let config = load_config_row(conn, snapshot.template_id).await?;
    match snapshot.kind {
        TemplateKind::Placement => Ok(decode_adaptive(settings, config.as_ref())?.max_questions),
        TemplateKind::Speaking | TemplateKind::Writing => {
            Ok(template::Query::ordered_items(conn, snapshot.template_id).await?.len() as u32)
        }
    }
}

/// Candidate pool: active items overlapping the configured skill areas that
/// the session has not answered. Items with degenerate calibration are
/// skipped with a warning.
pub(crate) fn candidates_from(
    bank: &[windward_entity::item::Model],
    answered: &HashSet<Uuid>,
    adaptive: &AdaptiveParams,
) -> Vec<CandidateItem> {
    let wanted = adaptive.skill_names();
    bank.iter()
        .filter(|item| !answered.contains(&item.id))
        .filter_map(|item| {
            let skills = item.skills();
            if !wanted.is_empty() && !skills.iter().any(|skill| wanted.contains(skill)) {
                return None;
            }
            match ItemParams::new(item.discrimination, item.difficulty, item.guessing) {
                Ok(params) => Some(CandidateItem {
                    id: item.id,
                    params,
                    skills,
                }),
                Err(error) => {
                    tracing::warn!(item_id = %item.id, %error, "skipping item with invalid calibration");
                    None
                }
            }
        })
        .collect()
}

pub(crate) fn scored_responses(
    pairs: &[(windward_entity::response::Model, windward_entity::item::Model)],
) -> Vec<ScoredResponse> {
    pairs
        .iter()
        .filter_map(|(response, item)| {
            let params = ItemParams::new(item.discrimination, item.difficulty, item.guessing).ok()?;
            Some(ScoredResponse {
                params,
                score: response.score(),
            })
        })
        .collect()
}

/// Idempotent completion. An already-completed session returns the stored
/// result untouched; an in-progress one is terminated with its current
/// measurement (placement) or sent through the external scorer (speaking
/// and writing).
pub async fn complete<C: ConnectionTrait + TransactionTrait>(
    conn: &C,
    settings: &EngineSettings,
    scorers: &Scorers,
    actor: &EngineActor,
    session_id: Uuid,
    now: DateTime<Utc>,
) -> Result<Completion, EngineError> {
    let ctx = load_context(conn, session_id).await?;
    if !actor.may_access(ctx.assignment.test_taker_id) {
        return Err(EngineError::Forbidden);
    }

    match ctx.session.status {
        SessionStatus::Completed => return stored_completion(conn, session_id).await,
        SessionStatus::Cancelled => return Err(EngineError::NotAcceptingAnswers),
        SessionStatus::Expired => return Err(EngineError::SessionExpired),
        SessionStatus::InProgress => {}
    }
    if ctx.session.is_time_expired(now) {
        session::Mutation::set_status(conn, session_id, SessionStatus::Expired).await?;
        return Err(EngineError::SessionExpired);
    }

    let config = load_config_row(conn, ctx.snapshot.template_id).await?;
    let submitted = session::Query::submitted_responses(conn, session_id).await?;
    let pairs = with_items(conn, submitted).await?;

    match ctx.snapshot.kind {
        TemplateKind::Placement => {
            let adaptive = decode_adaptive(settings, config.as_ref())?;
            let theta = ctx.session.current_ability;
            let standard_error = ctx.session.standard_error;
            let answered = ctx.session.questions_answered;
            finalize_placement_tx(
                conn,
                settings,
                &ctx,
                &adaptive,
                theta,
                standard_error,
                answered,
                pairs,
                StopReason::EarlyCompletion,
                actor,
                now,
            )
            .await
        }
        TemplateKind::Speaking => {
            if pairs.is_empty() {
                return Err(EngineError::InvalidResponse("no responses to score".to_owned()));
            }
            let params = decode_diagnostic(config.as_ref(), TemplateKind::Speaking)?;
            let responses: Vec<_> = pairs.iter().map(|(response, _)| response.clone()).collect();
            let evaluation = scorer::with_deadline(params.scorer_timeout_s, scorers.speaking.evaluate(&responses)).await?;
            let information = serde_json::json!({
                "criteria_scores": evaluation.criteria_scores,
                "transcript": evaluation.transcript,
            });
            finalize_diagnostic_tx(
                conn,
                settings,
                &ctx,
                &params,
                evaluation.criteria_scores,
                information,
                ResultKind::Speaking,
                actor,
                now,
            )
            .await
        }
        TemplateKind::Writing => {
            if pairs.is_empty() {
                return Err(EngineError::InvalidResponse("no responses to score".to_owned()));
            }
            let params = decode_diagnostic(config.as_ref(), TemplateKind::Writing)?;
            let responses: Vec<_> = pairs.iter().map(|(response, _)| response.clone()).collect();
            let evaluation = scorer::with_deadline(params.scorer_timeout_s, scorers.writing.evaluate(&responses)).await?;
            let information = serde_json::json!({
                "criteria_scores": evaluation.criteria_scores,
                "essay_text": evaluation.essay_text,
                "word_count": evaluation.word_count,
            });
            finalize_diagnostic_tx(
                conn,
                settings,
                &ctx,
                &params,
                evaluation.criteria_scores,
                information,
                ResultKind::Writing,
                actor,
                now,
            )
            .await
        }
    }
}

pub(crate) async fn stored_completion<C: ConnectionTrait>(
    conn: &C,
    session_id: Uuid,
) -> Result<Completion, EngineError> {
    let stored = result::Query::by_session(conn, session_id)
        .await?
        .ok_or(EngineError::NotFound)?;
    let result_id = stored.id;
    let view: ResultView = stored.try_into_model()?;
    let recommendations = recommendation::Query::for_result(conn, result_id)
        .await?
        .into_iter()
        .map(IntoModel::into_model)
        .collect();
    Ok(Completion {
        session_id,
        result: view,
        recommendations,
    })
}

pub(crate) async fn with_items<C: ConnectionTrait>(
    conn: &C,
    responses: Vec<windward_entity::response::Model>,
) -> Result<Vec<(windward_entity::response::Model, windward_entity::item::Model)>, EngineError> {
    let ids: Vec<Uuid> = responses.iter().map(|response| response.item_id).collect();
    let items = item::Query::by_ids(conn, &ids).await?;
    let by_id: BTreeMap<Uuid, windward_entity::item::Model> =
        items.into_iter().map(|item| (item.id, item)).collect();
    responses
        .into_iter()
        .map(|response| {
            let item = by_id.get(&response.item_id).cloned().ok_or(EngineError::NotFound)?;
            Ok((response, item))
        })
        .collect()
}

/// Slice responses per skill and rerun EAP on each subset. Skills with no
/// answered items inherit the overall estimate.
pub(crate) fn skill_scores_for(
    grid: &QuadratureGrid,
    model: IrtModel,
    adaptive: &AdaptiveParams,
    pairs: &[(windward_entity::response::Model, windward_entity::item::Model)],
    overall_theta: f64,
) -> BTreeMap<String, SkillScore> {
    let range = &adaptive.proficiency_range;
    let mut skills: HashSet<String> = adaptive.skill_names().into_iter().collect();
    for (_, item) in pairs {
        skills.extend(item.skills());
    }

    skills
        .into_iter()
        .map(|skill| {
            let subset: Vec<_> = pairs
                .iter()
                .filter(|(_, item)| item.skills().contains(&skill))
                .cloned()
                .collect();
            let score = if subset.is_empty() {
                SkillScore {
                    theta: overall_theta,
                    standard_error: None,
                    cefr: range.band(overall_theta),
                }
            } else {
                let estimate = grid.eap(model, &scored_responses(&subset));
                SkillScore {
                    theta: estimate.theta,
                    standard_error: Some(estimate.standard_error),
                    cefr: range.band(estimate.theta),
                }
            };
            (skill, score)
        })
        .collect()
}

/// Build the plan rows for a finalized skill-score vector.
pub(crate) async fn recommendations_for<C: ConnectionTrait>(
    conn: &C,
    settings: &EngineSettings,
    pathway_id: Uuid,
    skill_scores: &BTreeMap<String, SkillScore>,
    overall: windward_irt::CefrLevel,
    range: &windward_irt::ProficiencyRange,
) -> Result<Vec<NewRecommendation>, EngineError> {
    let courses = catalog::Query::active_courses(conn, pathway_id).await?;
    let planned = recommend::plan_courses(skill_scores, overall, range, &courses, &settings.recommendation);
    let mut lessons_by_course = BTreeMap::new();
    for course in &planned {
        if !lessons_by_course.contains_key(&course.course_id) {
            let lessons = catalog::Query::active_lessons(conn, course.course_id).await?;
            lessons_by_course.insert(course.course_id, lessons);
        }
    }
    Ok(recommend::assemble_rows(&planned, &lessons_by_course, &settings.recommendation))
}

#[allow(clippy::too_many_arguments)]
pub(crate) async fn finalize_placement_tx<C: ConnectionTrait + TransactionTrait>(
    conn: &C,
    settings: &EngineSettings,
    ctx: &SessionContext,
    adaptive: &AdaptiveParams,
    theta: f64,
    standard_error: Option<f64>,
    questions_answered: i32,
    pairs: Vec<(windward_entity::response::Model, windward_entity::item::Model)>,
    reason: StopReason,
    actor: &EngineActor,
    now: DateTime<Utc>,
) -> Result<Completion, EngineError> {
    let grid = QuadratureGrid::new(settings.quadrature_size);
    let skill_scores = skill_scores_for(&grid, adaptive.irt_model, adaptive, &pairs, theta);
    let overall = adaptive.proficiency_range.band(theta);
    let information = serde_json::json!({
        "termination_reason": reason,
        "standard_error": standard_error,
        "questions_answered": questions_answered,
    });

    let new_result = NewResult {
        session_id: ctx.session.id,
        proficiency_level: overall.to_string(),
        skill_scores: serde_json::json!(skill_scores),
        overall_score: theta,
        result_kind: ResultKind::Placement,
        information_metric: Some(information),
    };
    let rows = recommendations_for(
        conn,
        settings,
        ctx.snapshot.pathway_id,
        &skill_scores,
        overall,
        &adaptive.proficiency_range,
    )
    .await?;

    finalize_writes_tx(conn, ctx, new_result, rows, actor, now).await
}

#[allow(clippy::too_many_arguments)]
async fn finalize_diagnostic_tx<C: ConnectionTrait + TransactionTrait>(
    conn: &C,
    settings: &EngineSettings,
    ctx: &SessionContext,
    params: &DiagnosticParams,
    criteria_scores: BTreeMap<String, f64>,
    information: Value,
    kind: ResultKind,
    actor: &EngineActor,
    now: DateTime<Utc>,
) -> Result<Completion, EngineError> {
    let overall_score = params.overall_score(&criteria_scores);
    let overall = params.band_for(overall_score);

    // Criteria are normalized onto the common per-skill schema so the
    // recommendation engine can treat every result type alike.
    let skill_scores: BTreeMap<String, SkillScore> = criteria_scores
        .iter()
        .map(|(criterion, &score)| {
            (criterion.clone(), SkillScore {
                theta: score,
                standard_error: None,
                cefr: params.band_for(score),
            })
        })
        .collect();

    let new_result = NewResult {
        session_id: ctx.session.id,
        proficiency_level: overall.to_string(),
        skill_scores: serde_json::json!(skill_scores),
        overall_score,
        result_kind: kind,
        information_metric: Some(information),
    };
    let range = windward_irt::ProficiencyRange::default();
    let rows = recommendations_for(conn, settings, ctx.snapshot.pathway_id, &skill_scores, overall, &range).await?;

    finalize_writes_tx(conn, ctx, new_result, rows, actor, now).await
}

async fn finalize_writes_tx<C: ConnectionTrait + TransactionTrait>(
    conn: &C,
    ctx: &SessionContext,
    new_result: NewResult,
    rows: Vec<NewRecommendation>,
    actor: &EngineActor,
    now: DateTime<Utc>,
) -> Result<Completion, EngineError> {
    let session_id = ctx.session.id;
    let assigned_id = ctx.assignment.id;
    let actor = *actor;
    conn.transaction(move |tx| {
        Box::pin(async move {
            let stored = session::Mutation::finalize_writes(tx, session_id, assigned_id, new_result, rows, now).await?;
            audit::Mutation::append(
                tx,
                Some(actor.user_id),
                actor.kind,
                "assessment.completed",
                "result",
                stored.id.to_string(),
                None,
                now,
            )
            .await?;
            Ok::<_, EngineError>(())
        })
    })
    .await?;

    tracing::info!(%session_id, "session finalized");
    stored_completion(conn, session_id).await
}

/// Admin-only: abandon an in-flight session without producing a result.
/// The status flip and its audit entry commit together.
pub async fn cancel<C: ConnectionTrait + TransactionTrait>(
    conn: &C,
    actor: &EngineActor,
    session_id: Uuid,
    now: DateTime<Utc>,
) -> Result<(), EngineError> {
    if actor.kind != ActorKind::Admin {
        return Err(EngineError::Forbidden);
    }
    let session = session::Query::require(conn, session_id).await?;
    if session.status != SessionStatus::InProgress {
        return Err(EngineError::NotAcceptingAnswers);
    }
    let actor = *actor;
    conn.transaction(move |tx| {
        Box::pin(async move {
            session::Mutation::set_status(tx, session_id, SessionStatus::Cancelled).await?;
            audit::Mutation::append(
                tx,
                Some(actor.user_id),
                actor.kind,
                "assessment.cancelled",
                "session",
                session_id.to_string(),
                None,
                now,
            )
            .await?;
            Ok::<_, EngineError>(())
        })
    })
    .await?;
    Ok(())
}

/// One row of an admin-supplied replacement plan.
#[derive(Debug, Clone)]
pub struct OverrideItem {
    pub content_kind: windward_entity::recommendation::ContentKind,
    pub content_id: Uuid,
    pub target_skill: String,
    pub priority_order: i32,
}

/// Replace a result's plan with manual rows. Every referenced content id
/// must exist and be active; the swap is atomic and repeatable.
pub async fn override_recommendations<C: ConnectionTrait + TransactionTrait>(
    conn: &C,
    actor: &EngineActor,
    result_id: Uuid,
    items: Vec<OverrideItem>,
    now: DateTime<Utc>,
) -> Result<Vec<RecommendationView>, EngineError> {
    if actor.kind != ActorKind::Admin {
        return Err(EngineError::Forbidden);
    }
    if items.is_empty() {
        return Err(EngineError::InvalidResponse("override list must not be empty".to_owned()));
    }
    result::Query::require(conn, result_id).await?;

    for item in &items {
        let active = match item.content_kind {
            windward_entity::recommendation::ContentKind::Course => catalog::Query::course_by_id(conn, item.content_id)
                .await?
                .is_some_and(|course| course.active),
            windward_entity::recommendation::ContentKind::Lesson => catalog::Query::lesson_by_id(conn, item.content_id)
                .await?
                .is_some_and(|lesson| lesson.active),
        };
        if !active {
            return Err(EngineError::InvalidResponse(format!(
                "content {} does not exist or is inactive",
                item.content_id
            )));
        }
    }

    let rows: Vec<NewRecommendation> = items
        .into_iter()
        .map(|item| NewRecommendation {
            content_id: item.content_id,
            content_kind: item.content_kind,
            target_skill: item.target_skill,
            skill_gap_size: None,
            rationale: None,
            priority_order: item.priority_order,
        })
        .collect();

    // One transaction: the swap and its audit entry land or roll back as a
    // unit.
    let actor = *actor;
    let stored = conn
        .transaction(move |tx| {
            Box::pin(async move {
                let stored = recommendation::Mutation::replace_manual(tx, result_id, rows, actor.user_id, now).await?;
                audit::Mutation::append(
                    tx,
                    Some(actor.user_id),
                    actor.kind,
                    "recommendations.overridden",
                    "result",
                    result_id.to_string(),
                    None,
                    now,
                )
                .await?;
                Ok::<_, EngineError>(stored)
            })
        })
        .await?;
    Ok(stored.into_iter().map(IntoModel::into_model).collect())
}

/// Periodic sweep marking overdue sessions expired.
pub async fn expire_stale<C: ConnectionTrait>(conn: &C, now: DateTime<Utc>) -> Result<u64, EngineError> {
    let expired = session::Mutation::expire_stale(conn, now).await?;
    if expired > 0 {
        tracing::info!(expired, "expired stale sessions");
    }
    Ok(expired)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use windward_config::SkillArea;
    use windward_irt::CefrLevel;

    fn bank_item(nibble: u8, skills: &[&str], discrimination: f64) -> windward_entity::item::Model {
        windward_entity::item::Model {
            id: Uuid::from_u128(u128::from(nibble)),
            content: json!({"prompt": "?", "correct_answer": "a"}),
            item_kind: windward_entity::item::ItemKind::MultipleChoice,
            skill_areas: json!(skills),
            target_cefr: "B1".to_owned(),
            discrimination,
            difficulty: 0.0,
            guessing: 0.0,
            active: true,
            created_at: Utc::now(),
        }
    }

    fn adaptive_with_skills(skills: &[&str]) -> AdaptiveParams {
        AdaptiveParams {
            skill_areas: skills
                .iter()
                .map(|&name| SkillArea {
                    name: name.to_owned(),
                    min_items: 0,
                    max_items: None,
                })
                .collect(),
            ..AdaptiveParams::default()
        }
    }

    fn answered_pair(
        nibble: u8,
        skills: &[&str],
        correct: bool,
    ) -> (windward_entity::response::Model, windward_entity::item::Model) {
        let item = bank_item(nibble, skills, 1.0);
        let response = windward_entity::response::Model {
            session_id: Uuid::from_u128(99),
            item_id: item.id,
            position: i32::from(nibble),
            response_data: Some(json!({"selected_option": "a"})),
            is_correct: Some(correct),
            raw_score: Some(f64::from(u8::from(correct))),
            presented_at: Utc::now(),
            submitted_at: Some(Utc::now()),
            time_taken: None,
            media_key: None,
            asr_transcript: None,
        };
        (response, item)
    }

    #[test]
    fn students_only_access_their_own_attempts() {
        let owner = Uuid::from_u128(1);
        let student = EngineActor {
            user_id: owner,
            kind: ActorKind::Student,
        };
        assert!(student.may_access(owner));
        assert!(!student.may_access(Uuid::from_u128(2)));
        let teacher = EngineActor {
            user_id: Uuid::from_u128(3),
            kind: ActorKind::Teacher,
        };
        assert!(teacher.may_access(owner));
    }

    #[test]
    fn candidates_exclude_answered_and_off_skill_items() {
        let bank = vec![
            bank_item(1, &["grammar"], 1.0),
            bank_item(2, &["listening"], 1.0),
            bank_item(3, &["grammar"], 1.0),
        ];
        let answered = HashSet::from([Uuid::from_u128(3)]);
        let adaptive = adaptive_with_skills(&["grammar"]);
        let candidates = candidates_from(&bank, &answered, &adaptive);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].id, Uuid::from_u128(1));
    }

    #[test]
    fn degenerate_calibration_is_skipped() {
        let bank = vec![bank_item(1, &["grammar"], 0.0), bank_item(2, &["grammar"], 1.2)];
        let candidates = candidates_from(&bank, &HashSet::new(), &adaptive_with_skills(&["grammar"]));
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].id, Uuid::from_u128(2));
    }

    #[test]
    fn uncovered_skills_inherit_the_overall_estimate() {
        let grid = QuadratureGrid::default();
        let adaptive = adaptive_with_skills(&["grammar", "vocabulary"]);
        let pairs = vec![answered_pair(1, &["grammar"], true)];
        let scores = skill_scores_for(&grid, IrtModel::TwoPl, &adaptive, &pairs, 1.2);

        let vocabulary = &scores["vocabulary"];
        assert!((vocabulary.theta - 1.2).abs() < 1e-9);
        assert!(vocabulary.standard_error.is_none());
        assert_eq!(vocabulary.cefr, CefrLevel::B2);

        let grammar = &scores["grammar"];
        assert!(grammar.standard_error.is_some());
        assert!(grammar.theta > 0.0);
    }

    #[test]
    fn skill_slices_only_use_matching_responses() {
        let grid = QuadratureGrid::default();
        let adaptive = adaptive_with_skills(&["grammar", "reading"]);
        let pairs = vec![
            answered_pair(1, &["grammar"], true),
            answered_pair(2, &["grammar"], true),
            answered_pair(3, &["reading"], false),
        ];
        let scores = skill_scores_for(&grid, IrtModel::TwoPl, &adaptive, &pairs, 0.0);
        assert!(scores["grammar"].theta > scores["reading"].theta);
    }
}
