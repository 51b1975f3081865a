// ================
// common/src/lib.rs
// ================
//! Common types and structures
//! shared by the `Kalenderium` gateway and the account service.
//! This module defines the account RPC protocol messages and the token
//! record that travels between the services and the session store.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Numeric user identifier assigned by the user database
pub type UserId = u64;

/// Intended use of a token
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Session token issued by signup or login
    #[default]
    Authentication,
}

impl Scope {
    /// Wire name of the scope
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Authentication => "authentication",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque bearer token.
///
/// `plaintext` is handed to the client once; `hash` (hex SHA-256 of the
/// plaintext) is the session store key. On the request path only
/// `plaintext` is populated.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    /// Base-32 plaintext, empty inside stored session records
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub plaintext: String,
    /// Hex SHA-256 digest of the plaintext
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub hash: String,
    /// Owner of the session
    #[serde(default)]
    pub user_id: UserId,
    /// Absolute expiry, set on issued tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
    /// Token scope
    #[serde(default)]
    pub scope: Scope,
}

impl Token {
    /// Request-path token carrying only the plaintext
    pub fn bearer(plaintext: impl Into<String>) -> Self {
        Self {
            plaintext: plaintext.into(),
            ..Self::default()
        }
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("plaintext", &"<redacted>")
            .field("hash", &self.hash)
            .field("user_id", &self.user_id)
            .field("expiry", &self.expiry)
            .field("scope", &self.scope)
            .finish()
    }
}

/// Email/password pair submitted on signup and login
#[derive(Serialize, Deserialize, Clone, Default)]
pub struct Credentials {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Field-keyed validation failures. Every violation for a field is kept.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a violation for `field`
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of fields with at least one violation
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Messages recorded for `field`
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            first = false;
            write!(f, "{field}: {}", messages.join(", "))?;
        }
        Ok(())
    }
}

/// Messages sent from the gateway to the account service
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "msgType")]
pub enum AccountRequest {
    /// Resolve a bearer token to its live session
    IsAuth { token: Token },
    /// Register a user and open a first session
    SignUp { user: Credentials },
    /// Open a new session for an existing user
    Login { user: Credentials },
    /// Drop the session behind a token
    Logout { token: Token },
    /// Health probe of the account service and its stores
    ServiceStatus,
}

/// Messages sent from the account service back to the gateway
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "msgType")]
pub enum AccountResponse {
    /// Live session for the presented token
    Authenticated { token: Token },
    /// Response to a successful signup
    SignedUp {
        #[serde(rename = "userId")]
        user_id: UserId,
        token: Token,
    },
    /// Response to a successful login
    LoggedIn {
        #[serde(rename = "userId")]
        user_id: UserId,
        token: Token,
    },
    /// Acknowledgment of logout
    LoggedOut,
    /// Health probe result
    Status { healthy: bool },
    /// Any failure; internal details never cross this boundary
    Error(RpcError),
}

/// Failure category carried across the RPC boundary
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum RpcErrorKind {
    Validation,
    Authentication,
    Duplicate,
    NotFound,
    Internal,
}

/// Error payload of an RPC response
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RpcError {
    pub kind: RpcErrorKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "FieldErrors::is_empty")]
    pub fields: FieldErrors,
}

impl RpcError {
    pub fn new(kind: RpcErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            fields: FieldErrors::default(),
        }
    }
}
