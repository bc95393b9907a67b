//! Bearer token verification and role checks.
//!
//! Tokens are HS512-signed by the identity service with a shared secret.
//! Once the signature verifies, the claim set is normalized into a list of
//! authorities (`ROLE_*` entries plus plain permissions) and every handler
//! checks the caller's roles against the roles its operation requires.

use crate::error::StallError;
use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, warn};

const ROLE_PREFIX: &str = "ROLE_";
const SCOPE_PREFIX: &str = "SCOPE_";

/// Roles ordered by privilege; a higher role satisfies any lower requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Role {
    Viewer,
    Manager,
    Admin,
}

pub const READ_ROLES: &[Role] = &[Role::Viewer, Role::Manager, Role::Admin];
pub const WRITE_ROLES: &[Role] = &[Role::Manager, Role::Admin];
pub const ADMIN_ROLES: &[Role] = &[Role::Admin];

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Viewer => "VIEWER",
            Self::Manager => "MANAGER",
            Self::Admin => "ADMIN",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "VIEWER" => Some(Self::Viewer),
            "MANAGER" => Some(Self::Manager),
            "ADMIN" => Some(Self::Admin),
            _ => None,
        }
    }

    pub fn satisfies(self, required: Role) -> bool {
        self >= required
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScopeClaim {
    Joined(String),
    List(Vec<String>),
}

impl ScopeClaim {
    fn entries(&self) -> Vec<&str> {
        match self {
            Self::Joined(scopes) => scopes.split_whitespace().collect(),
            Self::List(scopes) => scopes.iter().map(String::as_str).collect(),
        }
    }
}

/// Claims issued by the identity service. Only the fields this service reads
/// are modelled; anything else in the token is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorities: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scp: Option<ScopeClaim>,
}

/// Flattens the claim set into authorities.
///
/// `roles` entries gain the `ROLE_` prefix, `permissions` and `authorities`
/// are taken as-is. Only when all three are absent or empty do the generic
/// `scope`/`scp` claims contribute, as `SCOPE_` entries.
pub fn authorities_from_claims(claims: &Claims) -> BTreeSet<String> {
    let mut authorities = BTreeSet::new();

    for role in claims.roles.iter().flatten() {
        if role.starts_with(ROLE_PREFIX) {
            authorities.insert(role.clone());
        } else {
            authorities.insert(format!("{ROLE_PREFIX}{role}"));
        }
    }
    authorities.extend(claims.permissions.iter().flatten().cloned());
    authorities.extend(claims.authorities.iter().flatten().cloned());

    if authorities.is_empty() {
        let scopes = claims
            .scope
            .as_deref()
            .map(|scope| ScopeClaim::Joined(scope.to_string()))
            .or_else(|| claims.scp.clone());
        if let Some(scopes) = scopes {
            authorities.extend(
                scopes
                    .entries()
                    .into_iter()
                    .map(|scope| format!("{SCOPE_PREFIX}{scope}")),
            );
        }
    }

    authorities
}

/// The verified caller of a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Principal {
    pub subject: Option<String>,
    pub roles: BTreeSet<Role>,
    pub permissions: BTreeSet<String>,
}

impl Principal {
    pub fn from_claims(claims: &Claims) -> Self {
        let mut roles = BTreeSet::new();
        let mut permissions = BTreeSet::new();

        for authority in authorities_from_claims(claims) {
            match authority.strip_prefix(ROLE_PREFIX) {
                Some(name) => {
                    if let Some(role) = Role::from_name(name) {
                        roles.insert(role);
                    }
                }
                None => {
                    permissions.insert(authority);
                }
            }
        }

        Self {
            subject: claims.sub.clone(),
            roles,
            permissions,
        }
    }

    pub fn authorize(&self, required: &[Role]) -> Result<(), StallError> {
        authorize(&self.roles, required).map_err(|err| {
            warn!(
                subject = self.subject.as_deref().unwrap_or("<anonymous>"),
                required = %role_names(required.iter()),
                held = %role_names(self.roles.iter()),
                permissions = ?self.permissions,
                "Access denied"
            );
            err
        })
    }
}

fn role_names<'a>(roles: impl Iterator<Item = &'a Role>) -> String {
    roles.map(|role| role.as_str()).collect::<Vec<_>>().join(",")
}

/// Allows the call when any held role satisfies any of the required roles.
pub fn authorize(held: &BTreeSet<Role>, required: &[Role]) -> Result<(), StallError> {
    let allowed = held
        .iter()
        .any(|role| required.iter().any(|needed| role.satisfies(*needed)));
    if allowed {
        Ok(())
    } else {
        Err(StallError::Forbidden)
    }
}

pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    /// Checks signature and expiry only; `aud` and `iss` are not enforced.
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS512);
        validation.validate_aud = false;
        Self {
            key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    pub fn verify(&self, token: &str) -> Result<Principal, StallError> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.key, &self.validation).map_err(|e| {
            debug!("Rejected bearer token: {}", e);
            StallError::Unauthorized("Invalid or expired token".to_string())
        })?;
        Ok(Principal::from_claims(&data.claims))
    }
}

/// Extracts and verifies the `Authorization: Bearer <token>` header.
#[derive(Debug, Clone)]
pub struct Caller(pub Principal);

impl Caller {
    pub fn authorize(&self, required: &[Role]) -> Result<(), StallError> {
        self.0.authorize(required)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
    Arc<JwtVerifier>: FromRef<S>,
{
    type Rejection = StallError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| StallError::Unauthorized("Missing bearer token".to_string()))?;

        let token = header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                StallError::Unauthorized("Expected 'Bearer <token>' authorization".to_string())
            })?;

        let verifier = Arc::<JwtVerifier>::from_ref(state);
        verifier.verify(token).map(Self)
    }
}
