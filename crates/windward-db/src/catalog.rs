use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ActiveValue, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder};
use std::error::Error;
use uuid::Uuid;
use windward_entity::catalog::course::{ActiveModel as ActiveCourse, Model as Course};
use windward_entity::catalog::lesson::{ActiveModel as ActiveLesson, Model as Lesson};
use windward_entity::catalog::{course, lesson};

pub struct Query;

impl Query {
    /// Active courses of a pathway ordered by difficulty, the candidate
    /// pool for recommendations.
    pub async fn active_courses<C: ConnectionTrait>(conn: &C, pathway_id: Uuid) -> Result<Vec<Course>, DbErr> {
        course::Entity::find()
            .filter(course::Column::PathwayId.eq(pathway_id))
            .filter(course::Column::Active.eq(true))
            .order_by_asc(course::Column::DifficultyOrder)
            .order_by_asc(course::Column::Title)
            .all(conn)
            .await
            .inspect_err(|error| tracing::error!(error = error as &dyn Error, %pathway_id, "failed to load courses"))
    }

    pub async fn active_lessons<C: ConnectionTrait>(conn: &C, course_id: Uuid) -> Result<Vec<Lesson>, DbErr> {
        lesson::Entity::find()
            .filter(lesson::Column::CourseId.eq(course_id))
            .filter(lesson::Column::Active.eq(true))
            .order_by_asc(lesson::Column::LessonOrder)
            .all(conn)
            .await
    }

    pub async fn course_by_id<C: ConnectionTrait>(conn: &C, course_id: Uuid) -> Result<Option<Course>, DbErr> {
        course::Entity::find_by_id(course_id).one(conn).await
    }

    pub async fn lesson_by_id<C: ConnectionTrait>(conn: &C, lesson_id: Uuid) -> Result<Option<Lesson>, DbErr> {
        lesson::Entity::find_by_id(lesson_id).one(conn).await
    }
}

pub struct Mutation;

impl Mutation {
    #[allow(clippy::too_many_arguments)]
    pub async fn create_course<C: ConnectionTrait>(
        conn: &C,
        pathway_id: Uuid,
        title: String,
        description: Option<String>,
        target_cefr: String,
        primary_skill: String,
        secondary_skills: Vec<String>,
        difficulty_order: i32,
        prerequisites: serde_json::Value,
        now: DateTime<Utc>,
    ) -> Result<Course, DbErr> {
        let row = ActiveCourse {
            id: ActiveValue::Set(Uuid::new_v4()),
            pathway_id: ActiveValue::Set(pathway_id),
            title: ActiveValue::Set(title),
            description: ActiveValue::Set(description),
            target_cefr: ActiveValue::Set(target_cefr),
            primary_skill: ActiveValue::Set(primary_skill),
            secondary_skills: ActiveValue::Set(serde_json::json!(secondary_skills)),
            difficulty_order: ActiveValue::Set(difficulty_order),
            prerequisites: ActiveValue::Set(prerequisites),
            active: ActiveValue::Set(true),
            created_at: ActiveValue::Set(now),
        };
        row.insert(conn)
            .await
            .inspect_err(|error| tracing::error!(error = error as &dyn Error, "failed to create course"))
    }

    pub async fn create_lesson<C: ConnectionTrait>(
        conn: &C,
        course_id: Uuid,
        title: String,
        lesson_order: i32,
        target_skills: Vec<String>,
        now: DateTime<Utc>,
    ) -> Result<Lesson, DbErr> {
        let row = ActiveLesson {
            id: ActiveValue::Set(Uuid::new_v4()),
            course_id: ActiveValue::Set(course_id),
            title: ActiveValue::Set(title),
            lesson_order: ActiveValue::Set(lesson_order),
            target_skills: ActiveValue::Set(serde_json::json!(target_skills)),
            active: ActiveValue::Set(true),
            created_at: ActiveValue::Set(now),
        };
        row.insert(conn)
            .await
            .inspect_err(|error| tracing::error!(error = error as &dyn Error, "failed to create lesson"))
    }

    pub async fn archive_course<C: ConnectionTrait>(conn: &C, course_id: Uuid) -> Result<(), DbErr> {
        course::Entity::update_many()
            .col_expr(course::Column::Active, Expr::value(false))
            .filter(course::Column::Id.eq(course_id))
            .exec(conn)
            .await?;
        Ok(())
    }
}
