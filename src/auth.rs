use std::collections::HashMap;

use axum_extra::headers::Authorization;
use axum_extra::headers::authorization::Bearer;
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::Role;

/// Same digest scheme as the original system. Hardening the password storage
/// is out of scope.
pub fn hash_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: Uuid,
    pub name: String,
    pub role: Role,
}

/// In-process map of opaque bearer tokens to logged-in users. Tokens live
/// until logout or restart.
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn issue(&self, session: Session) -> String {
        let token = Uuid::new_v4().to_string();
        self.sessions.write().await.insert(token.clone(), session);
        token
    }

    pub async fn revoke(&self, token: &str) -> bool {
        self.sessions.write().await.remove(token).is_some()
    }

    pub async fn resolve(&self, token: &str) -> Option<Session> {
        self.sessions.read().await.get(token).cloned()
    }
}

/// Resolves the caller's session from a Bearer header or a `?token=` query
/// parameter.
pub async fn authenticate(
    sessions: &SessionStore,
    auth: Option<Authorization<Bearer>>,
    query_token: Option<&str>,
) -> Result<Session, ApiError> {
    let provided_token = auth
        .map(|a| a.token().to_string())
        .or_else(|| query_token.map(|s| s.to_string()));
    match provided_token {
        Some(token) => sessions.resolve(&token).await.ok_or_else(|| {
            ApiError::Unauthorized("Invalid authentication token".into())
        }),
        None => Err(ApiError::Unauthorized(
            "Missing authentication token".into(),
        )),
    }
}

pub fn require_role(session: &Session, role: Role) -> Result<(), ApiError> {
    if session.role == role {
        Ok(())
    } else {
        let msg = match role {
            Role::Admin => "only administrators may perform this action",
            Role::Student => "only students may perform this action",
        };
        Err(ApiError::Forbidden(msg.into()))
    }
}
