use crate::user::{ExtractRole, Role};
use axum::RequestExt;
use axum::extract::Request;
use axum::response::{IntoResponse, Response};
use serde_derive::Serialize;
use std::collections::HashSet;

#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug, Serialize)]
pub(crate) enum Permission {
    Student,
    Teacher,
    Admin,
}

impl From<Role> for HashSet<Permission> {
    fn from(role: Role) -> Self {
        match role {
            Role::Student => HashSet::from([Permission::Student]),
            Role::Teacher => HashSet::from([Permission::Student, Permission::Teacher]),
            Role::Admin => HashSet::from([Permission::Student, Permission::Teacher, Permission::Admin]),
        }
    }
}

pub(crate) async fn extract(request: &mut Request) -> Result<HashSet<Permission>, Response> {
    request
        .extract_parts::<ExtractRole>()
        .await
        .map(|ExtractRole(role)| role.into())
        .map_err(IntoResponse::into_response)
}
