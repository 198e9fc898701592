//! Authenticated actor and role checks
//!
//! Authentication itself happens upstream (an API gateway or auth proxy).
//! This service trusts the identity headers it forwards and only decides
//! whether the supplied role may perform an operation.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::Error;

/// Header carrying the authenticated actor's identifier
pub const ACTOR_ID_HEADER: &str = "x-actor-id";
/// Header carrying the authenticated actor's role
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

/// Role assigned to an authenticated actor
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Editor,
    Viewer,
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "editor" => Ok(Role::Editor),
            "viewer" => Ok(Role::Viewer),
            other => Err(Error::Unauthorized(format!("unknown role '{}'", other))),
        }
    }
}

/// An authenticated caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub role: Role,
}

impl Actor {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            role,
        }
    }

    /// Starting and cancelling ingestions requires admin or editor
    pub fn ensure_can_ingest(&self) -> Result<(), Error> {
        match self.role {
            Role::Admin | Role::Editor => Ok(()),
            Role::Viewer => Err(Error::Forbidden(format!(
                "actor {} with role viewer cannot modify ingestions",
                self.id
            ))),
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };

        let id = header(ACTOR_ID_HEADER)
            .ok_or_else(|| Error::Unauthorized("missing actor identity".to_string()))?;
        let role = header(ACTOR_ROLE_HEADER)
            .ok_or_else(|| Error::Unauthorized("missing actor role".to_string()))?
            .parse()?;

        Ok(Actor::new(id, role))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[test]
    fn test_role_parsing() {
        assert_eq!("ADMIN".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!(" editor ".parse::<Role>().unwrap(), Role::Editor);
        assert!("root".parse::<Role>().is_err());
    }

    #[test]
    fn test_viewer_cannot_ingest() {
        assert!(Actor::new("a", Role::Admin).ensure_can_ingest().is_ok());
        assert!(Actor::new("e", Role::Editor).ensure_can_ingest().is_ok());
        assert!(matches!(
            Actor::new("v", Role::Viewer).ensure_can_ingest(),
            Err(Error::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_extract_from_headers() {
        let (mut parts, _) = Request::builder()
            .header(ACTOR_ID_HEADER, "user-7")
            .header(ACTOR_ROLE_HEADER, "editor")
            .body(())
            .unwrap()
            .into_parts();

        let actor = Actor::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(actor, Actor::new("user-7", Role::Editor));
    }

    #[tokio::test]
    async fn test_missing_headers_rejected() {
        let (mut parts, _) = Request::builder().body(()).unwrap().into_parts();
        let result = Actor::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(Error::Unauthorized(_))));
    }
}
