use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

pub mod config;
pub mod template_item;

#[derive(Debug, Copy, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum AssessmentType {
    #[sea_orm(string_value = "PLACEMENT")]
    Placement,
    #[sea_orm(string_value = "SPEAKING")]
    Speaking,
    #[sea_orm(string_value = "WRITING")]
    Writing,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "assessment_template")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub pathway_id: Uuid,
    pub name: String,
    pub assessment_type: AssessmentType,
    pub rubric: Option<Json>,
    pub version: i32,
    pub published_at: Option<DateTime<Utc>>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "crate::pathway::Entity",
        from = "Column::PathwayId",
        to = "crate::pathway::Column::Id"
    )]
    Pathway,
    #[sea_orm(has_many = "config::Entity")]
    Configs,
    #[sea_orm(has_many = "template_item::Entity")]
    Items,
}

impl Related<crate::pathway::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Pathway.def()
    }
}

impl Related<config::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Configs.def()
    }
}

impl Related<template_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
