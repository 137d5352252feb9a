//! Supplements and their dose log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Fields;

fn active_by_default() -> bool { true }

/// A supplement a user takes. Deactivated rather than deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Supplement {
  pub id:         Uuid,
  pub user_id:    Uuid,
  pub name:       String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub dosage:     Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub frequency:  Option<String>,
  #[serde(default = "active_by_default")]
  pub is_active:  bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub created_at: Option<DateTime<Utc>>,
  #[serde(flatten)]
  pub extra:      Fields,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewSupplement {
  pub name:      String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub dosage:    Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub frequency: Option<String>,
  #[serde(flatten)]
  pub extra:     Fields,
}

impl NewSupplement {
  pub fn into_supplement(self, id: Uuid, user_id: Uuid, now: DateTime<Utc>) -> Supplement {
    Supplement {
      id,
      user_id,
      name: self.name,
      dosage: self.dosage,
      frequency: self.frequency,
      is_active: true,
      created_at: Some(now),
      extra: self.extra,
    }
  }
}

/// One recorded dose. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplementLog {
  pub id:            Uuid,
  pub user_id:       Uuid,
  pub supplement_id: Uuid,
  pub taken_at:      DateTime<Utc>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub dosage_taken:  Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub notes:         Option<String>,
  #[serde(flatten)]
  pub extra:         Fields,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewSupplementLog {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub dosage_taken: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub notes:        Option<String>,
  #[serde(flatten)]
  pub extra:        Fields,
}

impl NewSupplementLog {
  pub fn into_log(
    self,
    id: Uuid,
    user_id: Uuid,
    supplement_id: Uuid,
    now: DateTime<Utc>,
  ) -> SupplementLog {
    SupplementLog {
      id,
      user_id,
      supplement_id,
      taken_at: now,
      dosage_taken: self.dosage_taken,
      notes: self.notes,
      extra: self.extra,
    }
  }
}
