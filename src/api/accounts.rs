//! Account endpoints of the backend API.
//!
//! The admin endpoints (`api/admin/...`) list and create accounts per fiscal
//! year and scope. The per-account endpoints (`accounts/...`) require a
//! token and are rejected locally when none is configured.

use crate::{
    api::{
        client::ApiClient,
        wire::{LIST_KEYS, Page, decode_list},
    },
    core::accounts::{Account, AccountGroup, ProjectAccounts, ScopeType},
    errors::{Error, Result},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info, instrument};

/// Filters for the admin account listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountQuery {
    /// Fiscal year
    pub year: i32,
    /// Zero-based page
    pub page: u32,
    /// Rows per page
    pub limit: u32,
    /// Free-text filter on code or description
    pub search: Option<String>,
    /// Restrict to one accounting group
    pub group: Option<AccountGroup>,
    /// Scope partition to read balances from
    pub scope_type: Option<ScopeType>,
    /// Department or project id within the scope
    pub scope_id: Option<String>,
}

impl AccountQuery {
    /// First page of `year` with the default page size.
    #[must_use]
    pub const fn new(year: i32) -> Self {
        Self {
            year,
            page: 0,
            limit: 20,
            search: None,
            group: None,
            scope_type: None,
            scope_id: None,
        }
    }

    /// Query string pairs; blank filters are left out.
    #[must_use]
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("year", self.year.to_string()),
            ("page", self.page.to_string()),
            ("limit", self.limit.to_string()),
        ];
        pairs.extend(scope_filters(
            self.search.as_deref(),
            self.group,
            self.scope_type,
            self.scope_id.as_deref(),
        ));
        pairs
    }
}

/// Parameters of the account picker search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountSearch {
    /// Fiscal year
    pub year: i32,
    /// Maximum number of results
    pub limit: u32,
    /// Text typed by the user
    pub search: Option<String>,
    /// Restrict to one accounting group
    pub group: Option<AccountGroup>,
    /// Scope partition
    pub scope_type: Option<ScopeType>,
    /// Department or project id within the scope
    pub scope_id: Option<String>,
    /// Keep header accounts in the results
    pub allow_headers: bool,
}

impl AccountSearch {
    /// Search in `year` for detail accounts matching `search`.
    #[must_use]
    pub fn new(year: i32, search: impl Into<String>) -> Self {
        Self {
            year,
            limit: 50,
            search: Some(search.into()),
            group: None,
            scope_type: None,
            scope_id: None,
            allow_headers: false,
        }
    }

    fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("year", self.year.to_string()),
            ("limit", self.limit.to_string()),
        ];
        pairs.extend(scope_filters(
            self.search.as_deref(),
            self.group,
            self.scope_type,
            self.scope_id.as_deref(),
        ));
        pairs
    }
}

fn scope_filters(
    search: Option<&str>,
    group: Option<AccountGroup>,
    scope_type: Option<ScopeType>,
    scope_id: Option<&str>,
) -> Vec<(&'static str, String)> {
    let mut pairs = Vec::new();
    if let Some(q) = search.map(str::trim).filter(|q| !q.is_empty()) {
        pairs.push(("q", q.to_string()));
    }
    if let Some(group) = group.map(AccountGroup::as_str).filter(|g| !g.is_empty()) {
        pairs.push(("group", group.to_string()));
    }
    if let Some(scope_type) = scope_type {
        pairs.push(("scopeType", scope_type.as_str().to_string()));
    }
    if let Some(id) = scope_id.map(str::trim).filter(|id| !id.is_empty()) {
        pairs.push(("scopeId", id.to_string()));
    }
    pairs
}

/// Payload for creating an account.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewAccount {
    /// Unique hierarchical code
    pub code: String,
    /// Description shown in tables
    pub description: String,
    /// Accounting group
    pub group: AccountGroup,
    /// Depth in the hierarchy, starting at 1
    pub level: u32,
    /// Parent code; serialized as `null` for top-level accounts
    pub parent_code: Option<String>,
    /// Whether the account aggregates children
    pub is_header: bool,
    /// Fiscal year the account is opened in
    pub year: i32,
}

impl NewAccount {
    /// Top-level detail account in the expense group.
    #[must_use]
    pub fn new(code: impl Into<String>, description: impl Into<String>, year: i32) -> Self {
        Self {
            code: code.into(),
            description: description.into(),
            group: AccountGroup::Egreso,
            level: 1,
            parent_code: None,
            is_header: false,
            year,
        }
    }

    /// Trims the text fields and checks the required ones.
    ///
    /// # Errors
    /// Returns [`Error::Validation`] when `code` or `description` is blank.
    pub fn normalized(&self) -> Result<Self> {
        let code = self.code.trim();
        let description = self.description.trim();
        if code.is_empty() || description.is_empty() {
            return Err(Error::Validation {
                message: "Código y descripción son obligatorios".to_string(),
            });
        }
        Ok(Self {
            code: code.to_string(),
            description: description.to_string(),
            parent_code: non_blank(self.parent_code.as_deref()),
            ..self.clone()
        })
    }
}

/// Changes sent from the admin account editor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountUpdate {
    /// Description shown in tables
    pub description: String,
    /// Accounting group
    pub group: AccountGroup,
    /// Depth in the hierarchy, starting at 1
    pub level: u32,
    /// Parent code; serialized as `null` for top-level accounts
    pub parent_code: Option<String>,
    /// Whether the account aggregates children
    pub is_header: bool,
}

impl From<&Account> for AccountUpdate {
    fn from(account: &Account) -> Self {
        Self {
            description: account.description.clone(),
            group: account.group.unwrap_or(AccountGroup::Egreso),
            level: account.level.unwrap_or(1),
            parent_code: account.parent_code.clone(),
            is_header: account.is_header,
        }
    }
}

impl AccountUpdate {
    /// Trims the description and blank parent code.
    ///
    /// # Errors
    /// Returns [`Error::Validation`] when the description is blank.
    pub fn normalized(&self) -> Result<Self> {
        let description = self.description.trim();
        if description.is_empty() {
            return Err(Error::Validation {
                message: "La descripción es obligatoria".to_string(),
            });
        }
        Ok(Self {
            description: description.to_string(),
            parent_code: non_blank(self.parent_code.as_deref()),
            ..self.clone()
        })
    }
}

/// Balance transfer between two accounts of the same scope.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountTransfer {
    /// Fiscal year
    pub year: i32,
    /// Scope partition the balances live in
    pub scope_type: ScopeType,
    /// Department or project id
    pub scope_id: String,
    /// Account the amount leaves
    pub from_account_code: String,
    /// Account the amount goes to
    pub to_account_code: String,
    /// Description of the source account, for the ledger entry
    pub from_account_description: String,
    /// Description of the target account, for the ledger entry
    pub to_account_description: String,
    /// Amount moved
    pub amount: f64,
    /// Free-text note
    pub description: String,
}

impl AccountTransfer {
    /// Trims the ids and codes and checks that everything required is set.
    ///
    /// # Errors
    /// Returns [`Error::Validation`] when the scope id, either account code or
    /// the amount is missing.
    pub fn normalized(&self) -> Result<Self> {
        let scope_id = self.scope_id.trim();
        if scope_id.is_empty() {
            return Err(Error::Validation {
                message: "scopeId es obligatorio para transferir".to_string(),
            });
        }
        let from = self.from_account_code.trim();
        let to = self.to_account_code.trim();
        if from.is_empty() || to.is_empty() || !is_present(self.amount) {
            return Err(Error::Validation {
                message: "Completa cuenta origen, destino y monto".to_string(),
            });
        }
        Ok(Self {
            scope_id: scope_id.to_string(),
            from_account_code: from.to_string(),
            to_account_code: to.to_string(),
            ..self.clone()
        })
    }
}

/// Description used when a balance load carries none.
pub const INITIAL_BALANCE_DESCRIPTION: &str = "Carga inicial de saldo";

/// Balance loaded into an account, e.g. an opening balance.
#[derive(Debug, Clone, PartialEq)]
pub struct BalanceMovement {
    /// Fiscal year
    pub year: i32,
    /// Scope partition the balance lands in
    pub scope_type: ScopeType,
    /// Department or project id; ignored for the global scope
    pub scope_id: String,
    /// Account receiving the balance
    pub account_code: String,
    /// Account description, kept in the movement reference
    pub account_description: Option<String>,
    /// Amount, strictly positive
    pub amount: f64,
    /// Free-text note
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
struct MovementPayload {
    year: i32,
    scope_type: ScopeType,
    scope_id: String,
    account_code: String,
    #[serde(rename = "type")]
    kind: &'static str,
    amount: f64,
    description: String,
    reference: MovementReference,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
struct MovementReference {
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    account_description: Option<String>,
}

impl BalanceMovement {
    fn payload(&self) -> Result<MovementPayload> {
        let scope_id = match self.scope_type {
            ScopeType::Global => "global".to_string(),
            _ => non_blank(Some(&self.scope_id)).ok_or_else(|| Error::Validation {
                message: "scopeId es obligatorio para cargar saldo".to_string(),
            })?,
        };
        let account_code = non_blank(Some(&self.account_code)).ok_or_else(|| Error::Validation {
            message: "Selecciona una cuenta contable".to_string(),
        })?;
        if !(self.amount.is_finite() && self.amount > 0.0) {
            return Err(Error::Validation {
                message: "El monto debe ser mayor que 0".to_string(),
            });
        }

        Ok(MovementPayload {
            year: self.year,
            scope_type: self.scope_type,
            scope_id,
            account_code,
            kind: "debit",
            amount: self.amount,
            description: non_blank(self.description.as_deref())
                .unwrap_or_else(|| INITIAL_BALANCE_DESCRIPTION.to_string()),
            reference: MovementReference {
                kind: "initial_balance",
                account_description: self
                    .account_description
                    .clone()
                    .filter(|text| !text.is_empty()),
            },
        })
    }
}

fn non_blank(text: Option<&str>) -> Option<String> {
    text.map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

// A zero or NaN amount counts as not filled in.
fn is_present(amount: f64) -> bool {
    amount.is_finite() && amount != 0.0
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<Account>,
}

impl ApiClient {
    /// One page of the admin account listing.
    #[instrument(skip(self))]
    pub async fn list_accounts(&self, query: &AccountQuery) -> Result<Page<Account>> {
        let value: Value = self
            .get(&["api", "admin", "accounts"], &query.query_pairs(), "accounts")
            .await?;
        let page = decode_list(value, &LIST_KEYS)?;
        debug!(rows = page.items.len(), total = page.total, "Accounts listed");
        Ok(page)
    }

    /// Accounts matching a picker search. Header accounts are dropped unless
    /// `allow_headers` is set.
    #[instrument(skip(self))]
    pub async fn search_accounts(&self, search: &AccountSearch) -> Result<Vec<Account>> {
        let response: SearchResponse = self
            .get(&["api", "accounts", "search"], &search.query_pairs(), "accounts")
            .await?;
        Ok(response
            .results
            .into_iter()
            .filter(|account| search.allow_headers || !account.is_header)
            .collect())
    }

    /// Account by document id.
    pub async fn get_account_by_id(&self, id: &str) -> Result<Account> {
        self.require_token()?;
        self.get(&["accounts", id], &[], &format!("Account {id}")).await
    }

    /// Account by code. The code is percent-encoded into the path.
    pub async fn get_account_by_code(&self, code: &str) -> Result<Account> {
        self.require_token()?;
        self.get(&["accounts", "code", code], &[], &format!("Account {code}"))
            .await
    }

    /// Creates an account after trimming and validating it.
    ///
    /// # Errors
    /// Returns [`Error::Validation`] without contacting the backend when the
    /// code or description is blank.
    pub async fn create_account(&self, account: &NewAccount) -> Result<Value> {
        let payload = account.normalized()?;
        let created = self
            .post(&["api", "admin", "accounts"], &[], &payload, "accounts")
            .await?;
        info!(code = %payload.code, year = payload.year, "Account created");
        Ok(created)
    }

    /// Sends a partial update for the account with `id`.
    pub async fn update_account(&self, id: &str, changes: &Value) -> Result<Value> {
        self.require_token()?;
        self.put(&["accounts", id], &[], changes, &format!("Account {id}"))
            .await
    }

    /// Deactivates the account with `id`.
    pub async fn deactivate_account(&self, id: &str) -> Result<Value> {
        self.require_token()?;
        let response = self.delete(&["accounts", id], &format!("Account {id}")).await?;
        info!(%id, "Account deactivated");
        Ok(response)
    }

    /// Reactivates the account with `id`.
    pub async fn activate_account(&self, id: &str) -> Result<Value> {
        self.update_account(id, &json!({ "active": true })).await
    }

    /// Saves the admin editor's changes to the account with `code` in `year`.
    ///
    /// # Errors
    /// Returns [`Error::Validation`] without contacting the backend when the
    /// description is blank.
    pub async fn update_admin_account(
        &self,
        code: &str,
        year: i32,
        changes: &AccountUpdate,
    ) -> Result<Value> {
        let payload = changes.normalized()?;
        let code = code.trim();
        let updated = self
            .put(
                &["api", "admin", "accounts", code],
                &[("year", year.to_string())],
                &payload,
                &format!("Account {code}"),
            )
            .await?;
        info!(%code, year, "Account updated");
        Ok(updated)
    }

    /// Moves an amount between two accounts of one scope.
    ///
    /// # Errors
    /// Returns [`Error::Validation`] without contacting the backend when the
    /// transfer is incomplete.
    #[instrument(skip(self))]
    pub async fn transfer_between_accounts(&self, transfer: &AccountTransfer) -> Result<Value> {
        let payload = transfer.normalized()?;
        let response = self
            .post(&["api", "admin", "accounts", "transfer"], &[], &payload, "transfer")
            .await?;
        info!(
            from = %payload.from_account_code,
            to = %payload.to_account_code,
            amount = payload.amount,
            "Transfer recorded"
        );
        Ok(response)
    }

    /// Loads a balance into an account.
    ///
    /// Global movements go to the admin endpoint; department and project
    /// movements go to the scope's own endpoint with the year in the query.
    ///
    /// # Errors
    /// Returns [`Error::Validation`] without contacting the backend when the
    /// scope id or account is missing, or the amount is not positive.
    #[instrument(skip(self))]
    pub async fn record_movement(&self, movement: &BalanceMovement) -> Result<Value> {
        let payload = movement.payload()?;
        let year = || vec![("year", payload.year.to_string())];
        let (segments, query) = match payload.scope_type {
            ScopeType::Global => (vec!["api", "admin", "accounts", "movements"], Vec::new()),
            ScopeType::Project => (
                vec!["api", "projects", payload.scope_id.as_str(), "movements"],
                year(),
            ),
            ScopeType::Department => (
                vec!["api", "departments", payload.scope_id.as_str(), "movements"],
                year(),
            ),
        };
        let response = self.post(&segments, &query, &payload, "movements").await?;
        info!(
            account = %payload.account_code,
            scope = payload.scope_type.as_str(),
            amount = payload.amount,
            "Balance recorded"
        );
        Ok(response)
    }

    /// Account tree assigned to a project, with its totals.
    #[instrument(skip(self))]
    pub async fn project_accounts(
        &self,
        project_id: &str,
        year: i32,
        include_zero: bool,
    ) -> Result<ProjectAccounts> {
        let project_id = project_id.trim();
        let query = [
            ("year", year.to_string()),
            ("assignedOnly", "true".to_string()),
            ("includeZero", include_zero.to_string()),
        ];
        self.get(
            &["api", "projects", project_id, "accounts"],
            &query,
            &format!("Project {project_id}"),
        )
        .await
    }
}
