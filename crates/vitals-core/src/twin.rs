//! Digital twin: a per-user snapshot of organ-level health scores.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Fields;

/// Organ health on a 0–100 scale.
///
/// Read leniently: a fractional score is rounded, an out-of-range one is
/// clamped, and a missing or `null` one takes its default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ScoreColumns")]
pub struct OrganScores {
  pub heart_health:  u8,
  pub lung_health:   u8,
  pub liver_health:  u8,
  pub kidney_health: u8,
  pub brain_health:  u8,
  pub gut_health:    u8,
}

impl Default for OrganScores {
  fn default() -> Self {
    Self {
      heart_health:  95,
      lung_health:   90,
      liver_health:  85,
      kidney_health: 88,
      brain_health:  92,
      gut_health:    80,
    }
  }
}

#[derive(Deserialize)]
struct ScoreColumns {
  #[serde(default)]
  heart_health:  Option<f64>,
  #[serde(default)]
  lung_health:   Option<f64>,
  #[serde(default)]
  liver_health:  Option<f64>,
  #[serde(default)]
  kidney_health: Option<f64>,
  #[serde(default)]
  brain_health:  Option<f64>,
  #[serde(default)]
  gut_health:    Option<f64>,
}

fn score(value: Option<f64>, fallback: u8) -> u8 {
  match value {
    Some(v) if v.is_finite() => v.round().clamp(0.0, 100.0) as u8,
    _ => fallback,
  }
}

impl From<ScoreColumns> for OrganScores {
  fn from(c: ScoreColumns) -> Self {
    let d = Self::default();
    Self {
      heart_health:  score(c.heart_health, d.heart_health),
      lung_health:   score(c.lung_health, d.lung_health),
      liver_health:  score(c.liver_health, d.liver_health),
      kidney_health: score(c.kidney_health, d.kidney_health),
      brain_health:  score(c.brain_health, d.brain_health),
      gut_health:    score(c.gut_health, d.gut_health),
    }
  }
}

/// Unique per user. Updated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DigitalTwin {
  /// `None` for the default twin returned before one has been stored.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub id:           Option<Uuid>,
  pub user_id:      Uuid,
  #[serde(flatten)]
  pub scores:       OrganScores,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub last_updated: Option<DateTime<Utc>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub created_at:   Option<DateTime<Utc>>,
  #[serde(flatten)]
  pub extra:        Fields,
}

impl DigitalTwin {
  /// The unsaved default twin for `user_id`.
  pub fn with_defaults(user_id: Uuid) -> Self {
    Self {
      id: None,
      user_id,
      scores: OrganScores::default(),
      last_updated: None,
      created_at: None,
      extra: Fields::new(),
    }
  }

  pub fn apply(&mut self, update: TwinUpdate, at: DateTime<Utc>) {
    let s = &mut self.scores;
    let pairs = [
      (&mut s.heart_health, update.heart_health),
      (&mut s.lung_health, update.lung_health),
      (&mut s.liver_health, update.liver_health),
      (&mut s.kidney_health, update.kidney_health),
      (&mut s.brain_health, update.brain_health),
      (&mut s.gut_health, update.gut_health),
    ];
    for (slot, value) in pairs {
      if let Some(v) = value {
        *slot = v;
      }
    }
    self.extra.extend(update.extra);
    self.last_updated = Some(at);
  }
}

/// A partial update of a twin's scores.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TwinUpdate {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub heart_health:  Option<u8>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub lung_health:   Option<u8>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub liver_health:  Option<u8>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub kidney_health: Option<u8>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub brain_health:  Option<u8>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub gut_health:    Option<u8>,
  #[serde(flatten)]
  pub extra:         Fields,
}
