//! The key naming scheme of the `kv` table.
//!
//! Internal only; nothing outside this crate reads these keys. UUIDs are
//! hyphenated lowercase, dates are `YYYY-MM-DD`.

use chrono::NaiveDate;
use uuid::Uuid;

/// Every registered user, as one list (email uniqueness is checked against it).
pub const USERS: &str = "users";

pub const INSIGHTS_PREFIX: &str = "insights:";
pub const GOALS_PREFIX: &str = "goals:";

pub fn biomarkers(user_id: Uuid) -> String { format!("biomarkers:{user_id}") }

pub fn wearables(user_id: Uuid) -> String { format!("wearables:{user_id}") }

/// Shared by every daily row of one user.
pub fn daily_prefix(user_id: Uuid) -> String { format!("daily:{user_id}:") }

pub fn daily(user_id: Uuid, date: NaiveDate) -> String {
  format!("{}{}", daily_prefix(user_id), date.format("%Y-%m-%d"))
}

pub fn hourly(user_id: Uuid) -> String { format!("hourly:{user_id}") }

pub fn supplements(user_id: Uuid) -> String { format!("supplements:{user_id}") }

pub fn supplement_logs(user_id: Uuid) -> String { format!("supplement_logs:{user_id}") }

pub fn twin(user_id: Uuid) -> String { format!("twin:{user_id}") }

pub fn insights(user_id: Uuid) -> String { format!("{INSIGHTS_PREFIX}{user_id}") }

pub fn goals(user_id: Uuid) -> String { format!("{GOALS_PREFIX}{user_id}") }

pub fn labs(user_id: Uuid) -> String { format!("labs:{user_id}") }

/// `LIKE` pattern matching every key that starts with `prefix`.
///
/// The prefixes used here contain no `%` or `_`, so no escaping is needed.
pub fn like_prefix(prefix: &str) -> String { format!("{prefix}%") }
