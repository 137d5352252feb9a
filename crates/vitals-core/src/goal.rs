//! Health goals.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Fields, null_as_default};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthGoal {
  pub id:                  Uuid,
  pub user_id:             Uuid,
  #[serde(default, deserialize_with = "null_as_default")]
  pub title:               String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub unit:                Option<String>,
  #[serde(default)]
  pub target_value:        Option<f64>,
  #[serde(default)]
  pub current_value:       Option<f64>,
  #[serde(default)]
  pub progress_percentage: Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub created_at:          Option<DateTime<Utc>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub updated_at:          Option<DateTime<Utc>>,
  #[serde(flatten)]
  pub extra:               Fields,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewGoal {
  pub title:         String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub unit:          Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub target_value:  Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub current_value: Option<f64>,
  #[serde(flatten)]
  pub extra:         Fields,
}

impl NewGoal {
  pub fn into_goal(self, id: Uuid, user_id: Uuid, now: DateTime<Utc>) -> HealthGoal {
    HealthGoal {
      id,
      user_id,
      title: self.title,
      unit: self.unit,
      target_value: self.target_value,
      current_value: self.current_value,
      progress_percentage: None,
      created_at: Some(now),
      updated_at: None,
      extra: self.extra,
    }
  }
}

impl HealthGoal {
  pub fn record_progress(&mut self, current_value: f64, progress_percentage: f64, at: DateTime<Utc>) {
    self.current_value = Some(current_value);
    self.progress_percentage = Some(progress_percentage);
    self.updated_at = Some(at);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn untitled_goal_row_reads_as_empty_title() {
    let row = serde_json::json!({
      "id": Uuid::nil(),
      "user_id": Uuid::nil(),
      "title": null,
      "target_value": 8,
    });
    let goal: HealthGoal = serde_json::from_value(row).unwrap();
    assert_eq!(goal.title, "");
    assert_eq!(goal.target_value, Some(8.0));
  }
}
