use super::{
    AnswerOutcome, EngineActor, EngineSettings, NextQuestion, SessionContext, candidates_from, decode_adaptive,
    decode_diagnostic, load_config_row, load_context, max_questions_of, scored_responses, skill_scores_for,
    stored_completion, with_items,
};
use crate::error::EngineError;
use crate::scorer::score_placement_answer;
use crate::snapshot::TemplateKind;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use uuid::Uuid;
use windward_config::SubmissionMode;
use windward_db::recommendation::NewRecommendation;
use windward_db::result::NewResult;
use windward_db::sea_orm::{ConnectionTrait, TransactionTrait};
use windward_db::{audit, item, session, template};
use windward_entity::result::ResultKind;
use windward_entity::session::SessionStatus;
use windward_irt::terminate::{StopReason, Termination, evaluate};
use windward_irt::{ItemParams, QuadratureGrid, ScoredResponse, select_next};
use windward_model::item::PublicItem;
use windward_model::session::Progress;
use windward_model_tools::convert::IntoModel;

/// One answer submission. `current_index` is the optimistic concurrency
/// token the client read with the question.
#[derive(Debug, Clone)]
pub struct AnswerCommand {
    pub item_id: Uuid,
    pub response_data: Value,
    pub time_taken: Option<i32>,
    pub current_index: i32,
    pub media_key: Option<String>,
}

/// Consume one answer: score it, append the response, update the ability
/// estimate, then either present the next item or finalize the session.
pub async fn answer<C: ConnectionTrait + TransactionTrait>(
    conn: &C,
    settings: &EngineSettings,
    actor: &EngineActor,
    session_id: Uuid,
    command: AnswerCommand,
    now: DateTime<Utc>,
) -> Result<AnswerOutcome, EngineError> {
    let ctx = load_context(conn, session_id).await?;
    if !actor.may_access(ctx.assignment.test_taker_id) {
        return Err(EngineError::Forbidden);
    }

    // A client retrying an already-processed answer replays the durable
    // state instead of double-appending.
    if command.current_index < ctx.session.current_index {
        return replay(conn, settings, &ctx, &command).await;
    }

    match ctx.session.status {
        SessionStatus::InProgress => {}
        SessionStatus::Completed => return Err(EngineError::AlreadyCompleted),
        SessionStatus::Cancelled => return Err(EngineError::NotAcceptingAnswers),
        SessionStatus::Expired => return Err(EngineError::SessionExpired),
    }
    if ctx.session.is_time_expired(now) {
        session::Mutation::set_status(conn, session_id, SessionStatus::Expired).await?;
        return Err(EngineError::SessionExpired);
    }
    if command.current_index > ctx.session.current_index {
        return Err(EngineError::Conflict);
    }

    let pending = session::Query::pending_response(conn, session_id)
        .await?
        .ok_or(EngineError::Conflict)?;
    if pending.item_id != command.item_id {
        return Err(EngineError::WrongItem);
    }
    if pending.position != command.current_index {
        return Err(EngineError::Conflict);
    }

    match ctx.snapshot.kind {
        TemplateKind::Placement => placement_answer(conn, settings, actor, &ctx, command, now).await,
        TemplateKind::Speaking | TemplateKind::Writing => {
            diagnostic_answer(conn, settings, actor, &ctx, command, now).await
        }
    }
}

/// Batch submission for diagnostic templates configured with
/// `submission_mode = batch`: all responses in one request, applied in
/// order.
pub async fn answer_batch<C: ConnectionTrait + TransactionTrait>(
    conn: &C,
    settings: &EngineSettings,
    actor: &EngineActor,
    session_id: Uuid,
    commands: Vec<AnswerCommand>,
    now: DateTime<Utc>,
) -> Result<AnswerOutcome, EngineError> {
    if commands.is_empty() {
        return Err(EngineError::InvalidResponse("empty answer batch".to_owned()));
    }
    let ctx = load_context(conn, session_id).await?;
    if ctx.snapshot.kind == TemplateKind::Placement {
        return Err(EngineError::InvalidResponse(
            "placement sessions accept one answer per request".to_owned(),
        ));
    }
    let config = load_config_row(conn, ctx.snapshot.template_id).await?;
    let params = decode_diagnostic(config.as_ref(), ctx.snapshot.kind)?;
    if params.submission_mode != SubmissionMode::Batch {
        return Err(EngineError::InvalidResponse(
            "this template accepts one answer per request".to_owned(),
        ));
    }

    let mut outcome = None;
    for command in commands {
        outcome = Some(answer(conn, settings, actor, session_id, command, now).await?);
    }
    Ok(outcome.expect("batch was checked non-empty"))
}

/// Deterministic replay: return what the original request returned,
/// computed from durable rows alone. No state is touched.
async fn replay<C: ConnectionTrait>(
    conn: &C,
    settings: &EngineSettings,
    ctx: &SessionContext,
    command: &AnswerCommand,
) -> Result<AnswerOutcome, EngineError> {
    let recorded = session::Query::response_at(conn, ctx.session.id, command.current_index)
        .await?
        .ok_or(EngineError::Conflict)?;
    if recorded.item_id != command.item_id || recorded.is_pending() {
        return Err(EngineError::Conflict);
    }

    let max_questions = max_questions_of(conn, settings, &ctx.snapshot).await?;
    match session::Query::response_at(conn, ctx.session.id, command.current_index + 1).await? {
        Some(next) => {
            let question: PublicItem = item::Query::require(conn, next.item_id).await?.into_model();
            Ok(AnswerOutcome::Next(NextQuestion {
                session_id: ctx.session.id,
                question,
                progress: super::progress_of(&ctx.session, max_questions),
            }))
        }
        None => match ctx.session.status {
            SessionStatus::Completed => Ok(AnswerOutcome::Completed(stored_completion(conn, ctx.session.id).await?)),
            _ => Ok(AnswerOutcome::AwaitingCompletion {
                session_id: ctx.session.id,
                progress: super::progress_of(&ctx.session, max_questions),
            }),
        },
    }
}

enum Decision {
    Next(Uuid),
    Finish {
        new_result: NewResult,
        rows: Vec<NewRecommendation>,
    },
}

async fn placement_answer<C: ConnectionTrait + TransactionTrait>(
    conn: &C,
    settings: &EngineSettings,
    actor: &EngineActor,
    ctx: &SessionContext,
    command: AnswerCommand,
    now: DateTime<Utc>,
) -> Result<AnswerOutcome, EngineError> {
    let session_id = ctx.session.id;
    let current_item = item::Query::require(conn, command.item_id).await?;
    let (raw_score, is_correct) = score_placement_answer(&current_item.content, &command.response_data)?;

    let config = load_config_row(conn, ctx.snapshot.template_id).await?;
    let adaptive = decode_adaptive(settings, config.as_ref())?;

    let prior = session::Query::submitted_responses(conn, session_id).await?;
    let prior_pairs = with_items(conn, prior).await?;

    let current_params = ItemParams::new(
        current_item.discrimination,
        current_item.difficulty,
        current_item.guessing,
    )
    .map_err(|error| {
        tracing::error!(item_id = %current_item.id, %error, "answered item has invalid calibration");
        EngineError::InvalidResponse("item calibration is invalid".to_owned())
    })?;

    let grid = QuadratureGrid::new(settings.quadrature_size);
    let mut scored = scored_responses(&prior_pairs);
    scored.push(ScoredResponse {
        params: current_params,
        score: raw_score,
    });
    let estimate = grid.eap(adaptive.irt_model, &scored);
    let questions_answered = ctx.session.questions_answered + 1;

    let termination = evaluate(
        questions_answered as u32,
        Some(estimate.standard_error),
        &adaptive.stop_rule(),
    );

    // All answered pairs including the one being submitted; used for skill
    // slicing and coverage counts.
    let mut all_pairs = prior_pairs;
    all_pairs.push((answered_response_row(ctx, &command, is_correct, raw_score, now), current_item));

    let mut bank_for_next = Vec::new();
    let decision = match termination {
        Termination::Stop(reason) => {
            finish_decision(conn, settings, ctx, &adaptive, &grid, &all_pairs, estimate, questions_answered, reason)
                .await?
        }
        Termination::Continue => {
            let answered_ids: HashSet<Uuid> = all_pairs.iter().map(|(_, item)| item.id).collect();
            bank_for_next = item::Query::load_active(conn).await?;
            let candidates = candidates_from(&bank_for_next, &answered_ids, &adaptive);
            let counts = coverage_counts(&all_pairs);
            let mut rng = rand::rng();
            let select_result = select_next(
                estimate.theta,
                adaptive.irt_model,
                &candidates,
                &counts,
                &adaptive.quotas(),
                adaptive.top_k_selection,
                &mut rng,
            );
            drop(rng);
            match select_result {
                Some(next) => Decision::Next(next.id),
                None => {
                    finish_decision(
                        conn,
                        settings,
                        ctx,
                        &adaptive,
                        &grid,
                        &all_pairs,
                        estimate,
                        questions_answered,
                        StopReason::BankExhausted,
                    )
                    .await?
                }
            }
        }
    };

    let expected_index = command.current_index;
    let next_position = expected_index + 1;
    let response_data = command.response_data.clone();
    let time_taken = command.time_taken;
    let media_key = command.media_key.clone();
    let item_id = command.item_id;
    let assigned_id = ctx.assignment.id;
    let actor = *actor;
    let theta = estimate.theta;
    let standard_error = estimate.standard_error;

    let committed = conn
        .transaction(move |tx| {
            Box::pin(async move {
                session::Mutation::submit_response(
                    tx,
                    session_id,
                    item_id,
                    response_data,
                    Some(is_correct),
                    Some(raw_score),
                    time_taken,
                    media_key,
                    now,
                )
                .await?;
                session::Mutation::advance_progress(
                    tx,
                    session_id,
                    expected_index,
                    theta,
                    Some(standard_error),
                    questions_answered,
                )
                .await?;

                match decision {
                    Decision::Next(next_item) => {
                        session::Mutation::present_item(tx, session_id, next_item, next_position, now).await?;
                        audit::Mutation::append(
                            tx,
                            Some(actor.user_id),
                            actor.kind,
                            "assessment.answered",
                            "session",
                            session_id.to_string(),
                            Some(serde_json::json!({"index": expected_index, "correct": is_correct})),
                            now,
                        )
                        .await?;
                        Ok::<_, EngineError>(Some(next_item))
                    }
                    Decision::Finish { new_result, rows } => {
                        let stored =
                            session::Mutation::finalize_writes(tx, session_id, assigned_id, new_result, rows, now)
                                .await?;
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
                        Ok(None)
                    }
                }
            })
        })
        .await?;

    match committed {
        Some(next_item) => {
            let item = bank_for_next
                .iter()
                .find(|item| item.id == next_item)
                .cloned()
                .ok_or(EngineError::NotFound)?;
            let question: PublicItem = item.into_model();
            tracing::debug!(%session_id, index = next_position, "presented next item");
            Ok(AnswerOutcome::Next(NextQuestion {
                session_id,
                question,
                progress: Progress {
                    questions_completed: questions_answered,
                    max_questions: adaptive.max_questions,
                    current_ability: theta,
                    standard_error: Some(standard_error),
                },
            }))
        }
        None => Ok(AnswerOutcome::Completed(stored_completion(conn, session_id).await?)),
    }
}

/// Build the result and plan rows for a terminal answer, before the write
/// transaction opens.
#[allow(clippy::too_many_arguments)]
async fn finish_decision<C: ConnectionTrait>(
    conn: &C,
    settings: &EngineSettings,
    ctx: &SessionContext,
    adaptive: &windward_config::AdaptiveParams,
    grid: &QuadratureGrid,
    all_pairs: &[(windward_entity::response::Model, windward_entity::item::Model)],
    estimate: windward_irt::AbilityEstimate,
    questions_answered: i32,
    reason: StopReason,
) -> Result<Decision, EngineError> {
    let skill_scores = skill_scores_for(grid, adaptive.irt_model, adaptive, all_pairs, estimate.theta);
    let overall = adaptive.proficiency_range.band(estimate.theta);
    let new_result = NewResult {
        session_id: ctx.session.id,
        proficiency_level: overall.to_string(),
        skill_scores: serde_json::json!(skill_scores),
        overall_score: estimate.theta,
        result_kind: ResultKind::Placement,
        information_metric: Some(serde_json::json!({
            "termination_reason": reason,
            "standard_error": estimate.standard_error,
            "questions_answered": questions_answered,
        })),
    };
    let rows = super::recommendations_for(
        conn,
        settings,
        ctx.snapshot.pathway_id,
        &skill_scores,
        overall,
        &adaptive.proficiency_range,
    )
    .await?;
    Ok(Decision::Finish { new_result, rows })
}

/// The in-memory image of the response row the transaction is about to
/// write, used for skill slicing before commit.
fn answered_response_row(
    ctx: &SessionContext,
    command: &AnswerCommand,
    is_correct: bool,
    raw_score: f64,
    now: DateTime<Utc>,
) -> windward_entity::response::Model {
    windward_entity::response::Model {
        session_id: ctx.session.id,
        item_id: command.item_id,
        position: command.current_index,
        response_data: Some(command.response_data.clone()),
        is_correct: Some(is_correct),
        raw_score: Some(raw_score),
        presented_at: now,
        submitted_at: Some(now),
        time_taken: command.time_taken,
        media_key: command.media_key.clone(),
        asr_transcript: None,
    }
}

fn coverage_counts(
    pairs: &[(windward_entity::response::Model, windward_entity::item::Model)],
) -> BTreeMap<String, u32> {
    let mut counts = BTreeMap::new();
    for (_, item) in pairs {
        for skill in item.skills() {
            *counts.entry(skill).or_insert(0) += 1;
        }
    }
    counts
}

async fn diagnostic_answer<C: ConnectionTrait + TransactionTrait>(
    conn: &C,
    _settings: &EngineSettings,
    actor: &EngineActor,
    ctx: &SessionContext,
    command: AnswerCommand,
    now: DateTime<Utc>,
) -> Result<AnswerOutcome, EngineError> {
    let session_id = ctx.session.id;
    if !command.response_data.is_object() {
        return Err(EngineError::InvalidResponse("response payload must be an object".to_owned()));
    }

    let items = template::Query::ordered_items(conn, ctx.snapshot.template_id).await?;
    let total = items.len() as u32;
    let next_entry = items.get(command.current_index as usize + 1).map(|entry| entry.item_id);

    let expected_index = command.current_index;
    let questions_answered = ctx.session.questions_answered + 1;
    let current_ability = ctx.session.current_ability;
    let standard_error = ctx.session.standard_error;
    let item_id = command.item_id;
    let response_data = command.response_data.clone();
    let time_taken = command.time_taken;
    let media_key = command.media_key.clone();
    let actor = *actor;

    conn.transaction(move |tx| {
        Box::pin(async move {
            session::Mutation::submit_response(
                tx,
                session_id,
                item_id,
                response_data,
                None,
                None,
                time_taken,
                media_key,
                now,
            )
            .await?;
            // Ability estimation is skipped for fixed-form templates; the
            // index still advances under the optimistic check.
            session::Mutation::advance_progress(
                tx,
                session_id,
                expected_index,
                current_ability,
                standard_error,
                questions_answered,
            )
            .await?;
            if let Some(next_item) = next_entry {
                session::Mutation::present_item(tx, session_id, next_item, expected_index + 1, now).await?;
            }
            audit::Mutation::append(
                tx,
                Some(actor.user_id),
                actor.kind,
                "assessment.answered",
                "session",
                session_id.to_string(),
                Some(serde_json::json!({"index": expected_index})),
                now,
            )
            .await?;
            Ok::<_, EngineError>(())
        })
    })
    .await?;

    let progress = Progress {
        questions_completed: questions_answered,
        max_questions: total,
        current_ability,
        standard_error,
    };
    match next_entry {
        Some(next_item) => {
            let question: PublicItem = item::Query::require(conn, next_item).await?.into_model();
            Ok(AnswerOutcome::Next(NextQuestion {
                session_id,
                question,
                progress,
            }))
        }
        None => Ok(AnswerOutcome::AwaitingCompletion { session_id, progress }),
    }
}
