//! Users, the owner of every other record.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Fields;

/// A registered user. Created once, updated in place, never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
  pub id:            Uuid,
  pub email:         String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub full_name:     Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub date_of_birth: Option<NaiveDate>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub gender:        Option<String>,
  pub created_at:    DateTime<Utc>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub updated_at:    Option<DateTime<Utc>>,
  #[serde(flatten)]
  pub extra:         Fields,
}

/// Input for [`HealthStore::create_user`](crate::store::HealthStore::create_user).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewUser {
  pub email:         String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub full_name:     Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub date_of_birth: Option<NaiveDate>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub gender:        Option<String>,
  #[serde(flatten)]
  pub extra:         Fields,
}

impl NewUser {
  pub fn new(email: impl Into<String>) -> Self {
    Self { email: email.into(), ..Self::default() }
  }
}

/// A partial update. `None` fields are left as they are.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserUpdate {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub full_name:     Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub date_of_birth: Option<NaiveDate>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub gender:        Option<String>,
  #[serde(flatten)]
  pub extra:         Fields,
}

impl User {
  /// Apply `update` in place and stamp `updated_at`.
  pub fn apply(&mut self, update: UserUpdate, at: DateTime<Utc>) {
    if let Some(name) = update.full_name {
      self.full_name = Some(name);
    }
    if let Some(dob) = update.date_of_birth {
      self.date_of_birth = Some(dob);
    }
    if let Some(gender) = update.gender {
      self.gender = Some(gender);
    }
    self.extra.extend(update.extra);
    self.updated_at = Some(at);
  }

  /// Whether `email` belongs to this user, ignoring case and surrounding
  /// whitespace.
  pub fn has_email(&self, email: &str) -> bool {
    self.email.trim().eq_ignore_ascii_case(email.trim())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn unknown_columns_survive_roundtrip() {
    let raw = serde_json::json!({
      "id": "6f1c1d36-98e4-4a7e-9c55-0c5d0e0bd2a1",
      "email": "ada@example.com",
      "created_at": "2026-01-02T03:04:05Z",
      "timezone": "America/New_York"
    });
    let user: User = serde_json::from_value(raw).unwrap();
    assert_eq!(user.extra.get("timezone").unwrap(), "America/New_York");
    assert!(user.full_name.is_none());

    let back = serde_json::to_value(&user).unwrap();
    assert_eq!(back["timezone"], "America/New_York");
    assert!(back.get("full_name").is_none());
  }

  #[test]
  fn apply_keeps_unset_fields() {
    let mut user = User {
      id:            Uuid::new_v4(),
      email:         "ada@example.com".into(),
      full_name:     Some("Ada".into()),
      date_of_birth: None,
      gender:        Some("female".into()),
      created_at:    Utc::now(),
      updated_at:    None,
      extra:         Fields::new(),
    };
    let at = Utc::now();
    user.apply(
      UserUpdate { full_name: Some("Ada Lovelace".into()), ..Default::default() },
      at,
    );
    assert_eq!(user.full_name.as_deref(), Some("Ada Lovelace"));
    assert_eq!(user.gender.as_deref(), Some("female"));
    assert_eq!(user.updated_at, Some(at));
  }

  #[test]
  fn email_match_is_case_insensitive() {
    let user = User {
      id:            Uuid::new_v4(),
      email:         "Ada@Example.com".into(),
      full_name:     None,
      date_of_birth: None,
      gender:        None,
      created_at:    Utc::now(),
      updated_at:    None,
      extra:         Fields::new(),
    };
    assert!(user.has_email(" ada@example.com "));
    assert!(!user.has_email("grace@example.com"));
  }
}
