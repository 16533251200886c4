//! Text rendering of account tables.
//!
//! This module turns flattened account rows and project totals into display
//! lines. All functions are framework-agnostic and only depend on the
//! formatting helpers in [`crate::core::money`] and [`crate::core::dates`].

use crate::{
    config::app::DisplayConfig,
    core::{
        accounts::{Account, AccountGroup, FlattenedRow, ProjectAccountsMeta, flatten_account_tree},
        dates::format_safe_date_with,
        money::format_monto,
    },
};

/// Indentation added per hierarchy level.
pub const INDENT: &str = "  ";

/// Placeholder shown when an account has no movements yet.
pub const NO_MOVEMENT: &str = "-";

/// Placeholder shown for accounts without a known group.
pub const NO_GROUP: &str = "-";

/// Formats one table row.
///
/// Columns: indented name, code, group, type, balance, movement count and
/// date of the last movement.
///
/// # Returns
/// Formatted row like
/// `"  Caja | 1.1 | EGRESO | Detalle | Bs. 10,00 | 3 | 02/01/2025"`
#[must_use]
pub fn format_account_row(row: &FlattenedRow<'_>, display: &DisplayConfig) -> String {
    let account = row.account;
    let indent = INDENT.repeat(row.depth);
    let last_movement = account.last_movement_at.as_ref().map_or_else(
        || NO_MOVEMENT.to_string(),
        |date| format_safe_date_with(Some(date), &display.date_format, &display.date_fallback),
    );
    let group = account
        .group
        .map(AccountGroup::as_str)
        .filter(|group| !group.is_empty())
        .unwrap_or(NO_GROUP);

    format!(
        "{indent}{} | {} | {group} | {} | {} | {} | {last_movement}",
        account.display_name(),
        account.code,
        account.type_label(),
        format_monto(&account.balance),
        account.movements_count,
    )
}

/// Flattens `tree` and formats every row.
#[must_use]
pub fn format_account_table(tree: &[Account], display: &DisplayConfig) -> Vec<String> {
    flatten_account_tree(tree)
        .iter()
        .map(|row| format_account_row(row, display))
        .collect()
}

/// Summary line for the project totals.
#[must_use]
pub fn format_meta_summary(meta: &ProjectAccountsMeta) -> String {
    format!(
        "Cuentas asignadas: {} | Visibles: {} | Saldo visible: {}",
        meta.total_assigned,
        meta.total_visible,
        format_monto(&meta.total_balance_visible)
    )
}
