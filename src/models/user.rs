//! User roles, joined user summaries and bearer-token claims
//!
//! Accounts themselves are managed by the external identity service; this
//! server only reads ids, names and roles.

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::policy::Actor;

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Role {
    #[serde(rename = "administrateur")]
    Administrator,
    #[serde(rename = "gestionnaire")]
    Manager,
    #[serde(rename = "formateur")]
    Trainer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Administrator => "administrateur",
            Role::Manager => "gestionnaire",
            Role::Trainer => "formateur",
        }
    }

    /// Administrators and managers
    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Administrator | Role::Manager)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "administrateur" => Ok(Role::Administrator),
            "gestionnaire" => Ok(Role::Manager),
            "formateur" => Ok(Role::Trainer),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

text_enum_sqlx!(Role);

/// Short user representation embedded in checkout responses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UserShort {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub role: Role,
}

/// JWT claims issued by the identity service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub user_id: i32,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    /// Claims for `actor`, valid for `ttl` from now
    pub fn for_actor(actor: &Actor, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            sub: actor.id.to_string(),
            user_id: actor.id,
            role: actor.role,
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        }
    }

    /// Sign the claims into a token
    pub fn encode(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse and verify a token
    pub fn decode(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    pub fn actor(&self) -> Actor {
        Actor {
            id: self.user_id,
            role: self.role,
        }
    }
}
