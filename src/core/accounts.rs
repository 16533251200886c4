//! Account hierarchy handling.
//!
//! The backend returns the chart of accounts either flat (every account
//! carries its `parent_code`) or already nested through `children`. Screens
//! show it as a single indented table, which is what
//! [`flatten_account_tree`] produces.

use crate::core::{
    dates::DateValue,
    money::MonetaryAmount,
    values::{MongoId, lenient_string, or_default},
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::warn;

/// Accounting group an account belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccountGroup {
    /// Liabilities
    Pasivo,
    /// Income
    Ingreso,
    /// Expenses
    Egreso,
    /// Any group this crate does not know about
    #[serde(other)]
    Other,
}

/// Partition under which accounts and movements are isolated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeType {
    /// Scoped to a department
    Department,
    /// Scoped to a project
    Project,
    /// Shared across the organization
    Global,
}

impl AccountGroup {
    /// Value used in query strings; empty for unknown groups.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pasivo => "PASIVO",
            Self::Ingreso => "INGRESO",
            Self::Egreso => "EGRESO",
            Self::Other => "",
        }
    }
}

impl ScopeType {
    /// Query-string value used by the backend.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Department => "department",
            Self::Project => "project",
            Self::Global => "global",
        }
    }

    /// Spanish label shown in scope pickers.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Department => "Departamento",
            Self::Project => "Proyecto",
            Self::Global => "Global",
        }
    }
}

/// A ledger account as received from the backend.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Account {
    /// Backend document id
    #[serde(default, rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<MongoId>,
    /// Hierarchical code such as `1.2.03`
    #[serde(default, deserialize_with = "lenient_string")]
    pub code: String,
    /// Account description shown in tables
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: String,
    /// Short name, used by some endpoints instead of `description`
    #[serde(default, deserialize_with = "or_default", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Accounting group
    #[serde(default, deserialize_with = "or_default", skip_serializing_if = "Option::is_none")]
    pub group: Option<AccountGroup>,
    /// Header (titular) accounts aggregate; detail accounts take postings
    #[serde(default, deserialize_with = "or_default")]
    pub is_header: bool,
    /// Depth hint from the backend
    #[serde(default, deserialize_with = "or_default", skip_serializing_if = "Option::is_none")]
    pub level: Option<u32>,
    /// Code of the parent account
    #[serde(default, deserialize_with = "or_default", skip_serializing_if = "Option::is_none")]
    pub parent_code: Option<String>,
    /// Balance as sent by the backend, aggregated server-side for headers
    #[serde(default)]
    pub balance: MonetaryAmount,
    /// Number of movements posted to this account
    #[serde(default, rename = "movementsCount", deserialize_with = "or_default")]
    pub movements_count: u64,
    /// Timestamp of the most recent movement
    #[serde(default, rename = "lastMovementAt", skip_serializing_if = "Option::is_none")]
    pub last_movement_at: Option<DateValue>,
    /// Whether the account is active
    #[serde(default, deserialize_with = "or_default", skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    /// Departments the account is restricted to; empty means all
    #[serde(default, deserialize_with = "or_default", skip_serializing_if = "Vec::is_empty")]
    pub departments: Vec<String>,
    /// Nested children, only present in tree-shaped responses
    #[serde(default, deserialize_with = "or_default", skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Account>,
}

impl Account {
    /// `"Titular"` for header accounts, `"Detalle"` otherwise.
    #[must_use]
    pub const fn type_label(&self) -> &'static str {
        if self.is_header { "Titular" } else { "Detalle" }
    }

    /// Description, falling back to the name and then the code.
    #[must_use]
    pub fn display_name(&self) -> &str {
        if !self.description.is_empty() {
            return &self.description;
        }
        match self.name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => &self.code,
        }
    }
}

/// Header totals of the project accounts view.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectAccountsMeta {
    /// Accounts assigned to the project
    #[serde(deserialize_with = "or_default")]
    pub total_assigned: u64,
    /// Accounts included in the tree
    #[serde(deserialize_with = "or_default")]
    pub total_visible: u64,
    /// Sum of the visible balances
    pub total_balance_visible: MonetaryAmount,
}

/// Account tree of a project together with its totals.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProjectAccounts {
    /// Root accounts, children nested
    #[serde(default, deserialize_with = "or_default")]
    pub tree: Vec<Account>,
    /// Totals, when the backend sends them
    #[serde(default, deserialize_with = "or_default")]
    pub meta: Option<ProjectAccountsMeta>,
}

/// One line of the flattened table: an account and its depth (roots are 0).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlattenedRow<'a> {
    /// The account shown on this row
    pub account: &'a Account,
    /// Indentation level
    pub depth: usize,
}

/// Flattens a nested hierarchy into depth-annotated rows.
///
/// Siblings are ordered by plain string comparison of `code` (so `"1.10"`
/// comes before `"1.2"`; equal codes keep their input order). Each account is
/// immediately followed by its own flattened subtree. The walk uses an explicit
/// stack, so nesting depth is not limited by the call stack.
///
/// # Examples
/// ```
/// use ledger_dashboard::core::accounts::{Account, flatten_account_tree};
///
/// let child = Account { code: "1.1".into(), ..Default::default() };
/// let root = Account { code: "1".into(), is_header: true, children: vec![child], ..Default::default() };
/// let rows = flatten_account_tree(std::slice::from_ref(&root));
/// assert_eq!(rows.iter().map(|r| (r.account.code.as_str(), r.depth)).collect::<Vec<_>>(),
///            vec![("1", 0), ("1.1", 1)]);
/// ```
#[must_use]
pub fn flatten_account_tree(roots: &[Account]) -> Vec<FlattenedRow<'_>> {
    let mut rows = Vec::with_capacity(roots.len());
    let mut stack: Vec<FlattenedRow<'_>> = sorted_by_code(roots)
        .into_iter()
        .rev()
        .map(|account| FlattenedRow { account, depth: 0 })
        .collect();

    while let Some(row) = stack.pop() {
        if !row.account.is_header && !row.account.children.is_empty() {
            warn!(
                code = %row.account.code,
                children = row.account.children.len(),
                "Detail account carries children"
            );
        }
        stack.extend(
            sorted_by_code(&row.account.children)
                .into_iter()
                .rev()
                .map(|account| FlattenedRow {
                    account,
                    depth: row.depth + 1,
                }),
        );
        rows.push(row);
    }

    rows
}

fn sorted_by_code(accounts: &[Account]) -> Vec<&Account> {
    let mut sorted: Vec<&Account> = accounts.iter().collect();
    sorted.sort_by(|a, b| a.code.cmp(&b.code));
    sorted
}

/// Total number of accounts in a hierarchy, children included.
#[must_use]
pub fn count_accounts(roots: &[Account]) -> usize {
    let mut count = 0;
    let mut stack: Vec<&Account> = roots.iter().collect();
    while let Some(account) = stack.pop() {
        count += 1;
        stack.extend(account.children.iter());
    }
    count
}

/// Nests a flat list of accounts under their `parent_code`.
///
/// Accounts whose parent is not in the list become roots, and so do accounts
/// caught in a parent cycle, so no account is ever dropped. Existing
/// `children` are kept.
#[must_use]
pub fn build_account_tree(accounts: Vec<Account>) -> Vec<Account> {
    let mut by_parent: HashMap<String, Vec<Account>> = HashMap::new();
    let mut roots = Vec::new();
    let known: HashSet<String> =
        accounts.iter().map(|account| account.code.clone()).collect();

    for account in accounts {
        match account.parent_code.as_deref() {
            Some(parent) if parent != account.code && known.contains(parent) => {
                by_parent.entry(parent.to_string()).or_default().push(account);
            }
            _ => roots.push(account),
        }
    }

    let mut tree: Vec<Account> = roots
        .into_iter()
        .map(|root| attach_children(root, &mut by_parent))
        .collect();

    // Whatever is left hangs off a cycle with no way back to a root.
    while let Some(code) = by_parent.keys().next().cloned() {
        let stranded = by_parent.remove(&code).unwrap_or_default();
        warn!(parent = %code, count = stranded.len(), "Accounts on a parent cycle promoted to roots");
        tree.extend(
            stranded
                .into_iter()
                .map(|account| attach_children(account, &mut by_parent)),
        );
    }

    tree
}

fn attach_children(mut account: Account, by_parent: &mut HashMap<String, Vec<Account>>) -> Account {
    if let Some(children) = by_parent.remove(&account.code) {
        account.children.extend(
            children
                .into_iter()
                .map(|child| attach_children(child, by_parent)),
        );
    }
    account
}
