//! Query-string filters in the backend's `field=op.value` syntax.

use std::fmt;

use strum::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Order {
  Asc,
  Desc,
}

/// An ordered list of query parameters.
///
/// Repeating a field is allowed and meaningful: `date=gte.X&date=lte.Y`
/// bounds a range.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
  pairs: Vec<(String, String)>,
}

impl Query {
  pub fn new() -> Self { Self::default() }

  fn push(mut self, key: &str, value: String) -> Self {
    self.pairs.push((key.to_owned(), value));
    self
  }

  pub fn eq(self, field: &str, value: impl fmt::Display) -> Self {
    self.push(field, format!("eq.{value}"))
  }

  pub fn gte(self, field: &str, value: impl fmt::Display) -> Self {
    self.push(field, format!("gte.{value}"))
  }

  pub fn lte(self, field: &str, value: impl fmt::Display) -> Self {
    self.push(field, format!("lte.{value}"))
  }

  pub fn order(self, field: &str, order: Order) -> Self {
    self.push("order", format!("{field}.{order}"))
  }

  pub fn limit(self, n: usize) -> Self { self.push("limit", n.to_string()) }

  pub fn select(self, columns: &str) -> Self { self.push("select", columns.to_owned()) }

  /// The unique columns an upsert merges on.
  pub fn on_conflict(self, columns: &[&str]) -> Self {
    self.push("on_conflict", columns.join(","))
  }

  pub fn pairs(&self) -> &[(String, String)] { &self.pairs }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn as_strs(q: &Query) -> Vec<(&str, &str)> {
    q.pairs().iter().map(|(k, v)| (k.as_str(), v.as_str())).collect()
  }

  #[test]
  fn range_filters_keep_both_bounds_in_order() {
    let q = Query::new()
      .eq("user_id", "u1")
      .gte("date", "2026-03-01")
      .lte("date", "2026-03-07")
      .order("date", Order::Desc);

    assert_eq!(as_strs(&q), vec![
      ("user_id", "eq.u1"),
      ("date", "gte.2026-03-01"),
      ("date", "lte.2026-03-07"),
      ("order", "date.desc"),
    ]);
  }

  #[test]
  fn limit_select_and_conflict_columns() {
    let q = Query::new()
      .select("id")
      .limit(1)
      .on_conflict(&["user_id", "provider"]);

    assert_eq!(as_strs(&q), vec![
      ("select", "id"),
      ("limit", "1"),
      ("on_conflict", "user_id,provider"),
    ]);
  }

  #[test]
  fn booleans_render_lowercase() {
    let q = Query::new().eq("is_read", false).order("generated_at", Order::Asc);
    assert_eq!(as_strs(&q), vec![
      ("is_read", "eq.false"),
      ("order", "generated_at.asc"),
    ]);
  }
}
