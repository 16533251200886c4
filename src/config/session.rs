//! Session configuration: who is calling the backend and in which context.
//!
//! The [`RequestContext`] is read once from the environment at startup and
//! handed to the API client; nothing re-reads it per request.

use std::fmt;

/// Environment variable holding the bearer token.
pub const TOKEN_ENV: &str = "LEDGER_API_TOKEN";
/// Environment variable holding the user's role.
pub const ROLE_ENV: &str = "LEDGER_USER_ROLE";
/// Environment variable holding the active department context.
pub const DEPARTMENT_CONTEXT_ENV: &str = "LEDGER_DEPARTMENT_CONTEXT";

/// Role of the signed-in user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Role {
    /// Sees every department and may switch department context
    SuperAdmin,
    /// Administers a single department
    DepartmentAdmin,
    /// Regular user
    #[default]
    User,
}

impl Role {
    /// Wire value of the role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SuperAdmin => "super_admin",
            Self::DepartmentAdmin => "admin_departamento",
            Self::User => "usuario",
        }
    }
}

impl From<&str> for Role {
    fn from(value: &str) -> Self {
        match value.trim() {
            "super_admin" => Self::SuperAdmin,
            "admin_departamento" => Self::DepartmentAdmin,
            _ => Self::User,
        }
    }
}

/// Credentials and department context attached to every backend request.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct RequestContext {
    /// Bearer token
    pub token: Option<String>,
    /// Role of the user the token belongs to
    pub role: Role,
    /// Department a super admin is currently working in
    pub department_context_id: Option<String>,
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("role", &self.role)
            .field("department_context_id", &self.department_context_id)
            .finish()
    }
}

impl RequestContext {
    /// Context for a signed-in user without a department context.
    #[must_use]
    pub fn new(token: impl Into<String>, role: Role) -> Self {
        Self {
            token: Some(token.into()),
            role,
            department_context_id: None,
        }
    }

    /// Same context, working inside `department_id`.
    #[must_use]
    pub fn with_department_context(mut self, department_id: impl Into<String>) -> Self {
        self.department_context_id = Some(department_id.into());
        self
    }

    /// Same context, outside any department.
    #[must_use]
    pub fn without_department_context(mut self) -> Self {
        self.department_context_id = None;
        self
    }

    /// Builds a context from raw values; blank values count as absent.
    #[must_use]
    pub fn from_values(
        token: Option<String>,
        role: Option<String>,
        department_context_id: Option<String>,
    ) -> Self {
        Self {
            token: non_blank(token),
            role: role.as_deref().map(Role::from).unwrap_or_default(),
            department_context_id: non_blank(department_context_id),
        }
    }

    /// Reads the context from [`TOKEN_ENV`], [`ROLE_ENV`] and
    /// [`DEPARTMENT_CONTEXT_ENV`].
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_values(
            std::env::var(TOKEN_ENV).ok(),
            std::env::var(ROLE_ENV).ok(),
            std::env::var(DEPARTMENT_CONTEXT_ENV).ok(),
        )
    }

    /// Token to send, if any.
    #[must_use]
    pub fn bearer_token(&self) -> Option<&str> {
        self.token.as_deref().filter(|token| !token.is_empty())
    }

    /// Whether the user may switch department context.
    #[must_use]
    pub fn is_super_admin(&self) -> bool {
        self.role == Role::SuperAdmin
    }

    /// Value of the department context header. Only super admins send it.
    #[must_use]
    pub fn department_header(&self) -> Option<&str> {
        if !self.is_super_admin() {
            return None;
        }
        self.department_context_id
            .as_deref()
            .filter(|id| !id.is_empty())
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
