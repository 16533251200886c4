//! Departments, projects and the super admin's department context.

use crate::{
    api::{
        client::ApiClient,
        wire::{DepartmentContextStatus, Department, LIST_KEYS, Page, Project, ScopeOption, decode_list},
    },
    core::accounts::ScopeType,
    errors::{Error, Result},
};
use serde_json::Value;
use tracing::{debug, info, warn};

impl ApiClient {
    /// Departments visible to the current user.
    pub async fn list_departments(&self) -> Result<Page<Department>> {
        let value: Value = self
            .get(&["departamentos"], &[("limit", "100".to_string())], "departments")
            .await?;
        decode_list(value, &LIST_KEYS)
    }

    /// Projects visible to the current user.
    pub async fn list_projects(&self) -> Result<Page<Project>> {
        let query = [("page", "0".to_string()), ("limit", "200".to_string())];
        let value: Value = self.get(&["mostrar_proyectos"], &query, "projects").await?;
        decode_list(value, &LIST_KEYS)
    }

    /// Picker entries for a scope. The global scope has none.
    pub async fn scope_options(&self, scope: ScopeType) -> Result<Vec<ScopeOption>> {
        let options: Vec<ScopeOption> = match scope {
            ScopeType::Department => self
                .list_departments()
                .await?
                .items
                .iter()
                .filter_map(Department::scope_option)
                .collect(),
            ScopeType::Project => self
                .list_projects()
                .await?
                .items
                .iter()
                .filter_map(Project::scope_option)
                .collect(),
            ScopeType::Global => Vec::new(),
        };
        debug!(scope = scope.as_str(), count = options.len(), "Scope options loaded");
        Ok(options)
    }

    /// Department context the backend applies to this client's requests.
    pub async fn department_context(&self) -> Result<DepartmentContextStatus> {
        self.get(&["contexto_departamento"], &[], "department context")
            .await
    }

    /// Client working inside `department_id`.
    ///
    /// Only super admins can switch context; anyone else gets a copy of this
    /// client back unchanged.
    ///
    /// # Errors
    /// Returns [`Error::DepartmentContext`] when the backend does not confirm
    /// the new context.
    pub async fn enter_department(&self, department_id: &str) -> Result<Self> {
        if !self.context().is_super_admin() {
            debug!("Department context ignored for non super admin");
            return Ok(self.clone());
        }

        let candidate = self.with_context(
            self.context()
                .clone()
                .with_department_context(department_id.trim()),
        );
        let status = candidate.department_context().await?;
        if !status.is_active() {
            warn!(%department_id, "Backend did not accept department context");
            return Err(Error::DepartmentContext {
                department_id: department_id.to_string(),
            });
        }

        let confirmed = status
            .department_id
            .filter(|id| !id.is_empty())
            .map_or_else(|| department_id.trim().to_string(), |id| id.to_string());
        info!(department_id = %confirmed, "Entered department context");
        Ok(self.with_context(self.context().clone().with_department_context(confirmed)))
    }

    /// Client outside any department context.
    #[must_use]
    pub fn leave_department(&self) -> Self {
        self.with_context(self.context().clone().without_department_context())
    }

    /// Re-checks the department context carried over from a previous session.
    ///
    /// A context the backend no longer accepts is dropped and a client
    /// without one is returned.
    ///
    /// # Errors
    /// Propagates transport and authorization failures from the check.
    pub async fn restore_department_context(&self) -> Result<Self> {
        let Some(saved) = self.context().department_header().map(str::to_string) else {
            return Ok(self.clone());
        };

        match self.leave_department().enter_department(&saved).await {
            Ok(client) => Ok(client),
            Err(Error::DepartmentContext { department_id }) => {
                warn!(%department_id, "Saved department context is no longer valid; clearing it");
                Ok(self.leave_department())
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::config::session::{RequestContext, Role};
    use crate::test_utils::{client_for, spawn_json_server};

    #[tokio::test]
    async fn test_list_departments_bare_array() -> Result<()> {
        let body = r#"[{"_id": {"$oid": "d1"}, "nombre": "Finanzas"}, {"_id": "d2", "descripcion": "Obras"}]"#;
        let (base_url, server) = spawn_json_server(200, body).await;
        let api = client_for(&base_url, RequestContext::new("tok", Role::SuperAdmin));

        let page = api.list_departments().await?;
        assert_eq!(page.total, 2);
        assert_eq!(page.items[1].id.as_str(), "d2");

        let request = server.await.unwrap();
        assert!(request.starts_with("GET /departamentos?limit=100 "));
        Ok(())
    }

    #[tokio::test]
    async fn test_project_scope_options() -> Result<()> {
        let body = r#"{"request_list": [
            {"_id": {"$oid": "p1"}, "nombre": "Puente"},
            {"_id": null, "nombre": "Sin id"},
            {"_id": "p3"}
        ], "count": 3}"#;
        let (base_url, server) = spawn_json_server(200, body).await;
        let api = client_for(&base_url, RequestContext::new("tok", Role::SuperAdmin));

        let options = api.scope_options(ScopeType::Project).await?;
        assert_eq!(
            options,
            vec![
                ScopeOption {
                    id: "p1".to_string(),
                    label: "Puente".to_string()
                },
                ScopeOption {
                    id: "p3".to_string(),
                    label: "p3".to_string()
                },
            ]
        );

        let request = server.await.unwrap();
        assert!(request.starts_with("GET /mostrar_proyectos?page=0&limit=200 "));
        Ok(())
    }

    #[tokio::test]
    async fn test_global_scope_has_no_options() -> Result<()> {
        let api = client_for("http://127.0.0.1:9/", RequestContext::default());
        assert!(api.scope_options(ScopeType::Global).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_enter_department_confirmed() -> Result<()> {
        let body = r#"{"usando_contexto": true, "departamento_id": "d1", "departamento": {"_id": "d1", "nombre": "Finanzas"}}"#;
        let (base_url, server) = spawn_json_server(200, body).await;
        let api = client_for(&base_url, RequestContext::new("tok", Role::SuperAdmin));

        let scoped = api.enter_department("d1").await?;
        assert_eq!(scoped.context().department_header(), Some("d1"));
        assert_eq!(api.context().department_header(), None);
        assert_eq!(scoped.leave_department().context().department_header(), None);

        let request = server.await.unwrap().to_lowercase();
        assert!(request.contains("x-department-context: d1"));
        Ok(())
    }

    #[tokio::test]
    async fn test_enter_department_rejected() {
        let (base_url, server) = spawn_json_server(200, r#"{"usando_contexto": false}"#).await;
        let api = client_for(&base_url, RequestContext::new("tok", Role::SuperAdmin));

        let result = api.enter_department("d7").await;
        assert!(matches!(
            result,
            Err(Error::DepartmentContext { department_id }) if department_id == "d7"
        ));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_enter_department_ignored_for_regular_users() -> Result<()> {
        let api = client_for("http://127.0.0.1:9/", RequestContext::new("tok", Role::User));
        let same = api.enter_department("d1").await?;
        assert_eq!(same.context(), api.context());
        Ok(())
    }

    #[tokio::test]
    async fn test_restore_department_context_confirmed() -> Result<()> {
        let body = r#"{"usando_contexto": true, "departamento_id": "d1", "departamento": {"_id": "d1"}}"#;
        let (base_url, server) = spawn_json_server(200, body).await;
        let saved = RequestContext::new("tok", Role::SuperAdmin).with_department_context("d1");
        let api = client_for(&base_url, saved);

        let restored = api.restore_department_context().await?;
        assert_eq!(restored.context().department_header(), Some("d1"));

        let request = server.await.unwrap().to_lowercase();
        assert!(request.starts_with("get /contexto_departamento "));
        assert!(request.contains("x-department-context: d1"));
        Ok(())
    }

    #[tokio::test]
    async fn test_restore_department_context_rejected_clears_it() -> Result<()> {
        let (base_url, server) = spawn_json_server(200, r#"{"usando_contexto": false}"#).await;
        let saved = RequestContext::new("tok", Role::SuperAdmin).with_department_context("d7");
        let api = client_for(&base_url, saved);

        let restored = api.restore_department_context().await?;
        assert_eq!(restored.context().department_header(), None);
        assert_eq!(restored.context().bearer_token(), Some("tok"));
        server.await.unwrap();
        Ok(())
    }

    #[tokio::test]
    async fn test_restore_department_context_propagates_auth_failure() {
        let (base_url, server) = spawn_json_server(401, r#"{"message": "Token expirado"}"#).await;
        let saved = RequestContext::new("tok", Role::SuperAdmin).with_department_context("d1");
        let api = client_for(&base_url, saved);

        let result = api.restore_department_context().await;
        assert!(result.is_err_and(|e| e.requires_sign_in()));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_restore_without_saved_context_skips_request() -> Result<()> {
        let api = client_for("http://127.0.0.1:9/", RequestContext::new("tok", Role::SuperAdmin));
        let restored = api.restore_department_context().await?;
        assert_eq!(restored.context(), api.context());
        Ok(())
    }
}
