use chrono::{TimeZone, Utc};
use sea_orm::{DatabaseBackend, DbErr, MockDatabase, MockExecResult};
use serde_json::json;
use test_log::test;
use uuid::Uuid;
use windward_db::session::{Mutation, Query, SessionWriteError};
use windward_entity::response;
use windward_entity::session::{Model as Session, SessionStatus};

fn session_row(session_id: Uuid, current_index: i32) -> Session {
    Session {
        id: session_id,
        assigned_id: Uuid::from_u128(7),
        current_ability: 0.3,
        standard_error: Some(0.8),
        questions_answered: current_index,
        current_index,
        status: SessionStatus::InProgress,
        template_snapshot: json!({"template_id": Uuid::from_u128(1)}),
        rubric_snapshot: None,
        started_at: Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap(),
        completed_at: None,
        expires_at: Utc.with_ymd_and_hms(2026, 3, 2, 11, 0, 0).unwrap(),
    }
}

#[test(tokio::test)]
async fn load_returns_the_stored_session() -> Result<(), DbErr> {
    let session_id = Uuid::from_u128(42);
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[session_row(session_id, 3)]])
        .into_connection();

    let loaded = Query::load(&db, session_id).await?.unwrap();
    assert_eq!(loaded.id, session_id);
    assert_eq!(loaded.current_index, 3);
    Ok(())
}

#[test(tokio::test)]
async fn require_maps_missing_rows_to_record_not_found() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<Session>::new()])
        .into_connection();

    let result = Query::require(&db, Uuid::from_u128(9)).await;
    assert!(matches!(result, Err(DbErr::RecordNotFound(_))));
}

#[tokio::test]
async fn advance_progress_succeeds_when_the_index_matches() -> Result<(), SessionWriteError> {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_exec_results([MockExecResult {
            last_insert_id: 0,
            rows_affected: 1,
        }])
        .into_connection();

    Mutation::advance_progress(&db, Uuid::from_u128(42), 2, 0.5, Some(0.6), 3).await
}

#[tokio::test]
async fn advance_progress_with_a_stale_index_is_a_conflict() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_exec_results([MockExecResult {
            last_insert_id: 0,
            rows_affected: 0,
        }])
        .into_connection();

    let result = Mutation::advance_progress(&db, Uuid::from_u128(42), 2, 0.5, Some(0.6), 3).await;
    assert!(matches!(result, Err(SessionWriteError::Conflict)));
}

#[tokio::test]
async fn duplicate_submit_touches_no_rows_and_surfaces_already_answered() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_exec_results([MockExecResult {
            last_insert_id: 0,
            rows_affected: 0,
        }])
        .into_connection();

    let result = Mutation::submit_response(
        &db,
        Uuid::from_u128(42),
        Uuid::from_u128(1),
        json!({"selected_option": "a"}),
        Some(true),
        Some(1.0),
        Some(12),
        None,
        Utc::now(),
    )
    .await;
    assert!(matches!(result, Err(SessionWriteError::AlreadyAnswered)));
}

#[tokio::test]
async fn expire_stale_reports_the_swept_row_count() -> Result<(), DbErr> {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_exec_results([MockExecResult {
            last_insert_id: 0,
            rows_affected: 4,
        }])
        .into_connection();

    let swept = Mutation::expire_stale(&db, Utc::now()).await?;
    assert_eq!(swept, 4);
    Ok(())
}

#[test(tokio::test)]
async fn pending_response_returns_the_unsubmitted_row() -> Result<(), DbErr> {
    let session_id = Uuid::from_u128(42);
    let pending = response::Model {
        session_id,
        item_id: Uuid::from_u128(5),
        position: 2,
        response_data: None,
        is_correct: None,
        raw_score: None,
        presented_at: Utc.with_ymd_and_hms(2026, 3, 2, 9, 10, 0).unwrap(),
        submitted_at: None,
        time_taken: None,
        media_key: None,
        asr_transcript: None,
    };
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[pending]])
        .into_connection();

    let loaded = Query::pending_response(&db, session_id).await?.unwrap();
    assert!(loaded.is_pending());
    assert_eq!(loaded.position, 2);
    Ok(())
}
