use axum::extract::FromRequestParts;
use http::StatusCode;
use http::request::Parts;
use std::str::FromStr;
use uuid::Uuid;
use windward_core::EngineActor;
use windward_entity::audit::ActorKind;

pub(crate) const USER_ID_HEADER: &str = "x-user-id";
pub(crate) const USER_ROLE_HEADER: &str = "x-user-role";

type Rejection = (StatusCode, &'static str);

/// Identity asserted by the portal BFF. The core trusts these headers; the
/// bearer token was already validated upstream.
#[derive(Clone, Copy)]
pub(crate) struct ExtractUserId(pub Uuid);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Role {
    Student,
    Teacher,
    Admin,
}

#[derive(Clone, Copy)]
pub(crate) struct ExtractRole(pub Role);

#[derive(Clone, Copy)]
pub(crate) struct ExtractActor(pub EngineActor);

impl FromStr for Role {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_uppercase().as_str() {
            "STUDENT" => Ok(Self::Student),
            "TEACHER" => Ok(Self::Teacher),
            "ADMIN" => Ok(Self::Admin),
            _ => Err(()),
        }
    }
}

impl From<Role> for ActorKind {
    fn from(role: Role) -> Self {
        match role {
            Role::Student => Self::Student,
            Role::Teacher => Self::Teacher,
            Role::Admin => Self::Admin,
        }
    }
}

impl<S> FromRequestParts<S> for ExtractUserId
where
    S: Send + Sync,
{
    type Rejection = Rejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or((StatusCode::UNAUTHORIZED, "missing identity header"))?;
        let user_id =
            Uuid::parse_str(header).map_err(|_| (StatusCode::UNAUTHORIZED, "malformed identity header"))?;
        Ok(Self(user_id))
    }
}

impl<S> FromRequestParts<S> for ExtractRole
where
    S: Send + Sync,
{
    type Rejection = Rejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // An absent role header downgrades to the least-privileged role.
        let role = parts
            .headers
            .get(USER_ROLE_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(Role::from_str)
            .transpose()
            .map_err(|()| (StatusCode::UNAUTHORIZED, "unknown role header"))?
            .unwrap_or(Role::Student);
        Ok(Self(role))
    }
}

impl<S> FromRequestParts<S> for ExtractActor
where
    S: Send + Sync,
{
    type Rejection = Rejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let ExtractUserId(user_id) = ExtractUserId::from_request_parts(parts, state).await?;
        let ExtractRole(role) = ExtractRole::from_request_parts(parts, state).await?;
        Ok(Self(EngineActor {
            user_id,
            kind: role.into(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parsing_is_case_insensitive() {
        assert_eq!(Role::from_str("admin"), Ok(Role::Admin));
        assert_eq!(Role::from_str("TEACHER"), Ok(Role::Teacher));
        assert!(Role::from_str("root").is_err());
    }
}
