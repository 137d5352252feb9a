//! Biological-age estimation from phenotypic and lifestyle markers.
//!
//! Two estimates are blended: a modified Klemera–Doubal estimate driven by
//! body composition (weight 0.4) and a modified phenotypic-age estimate
//! driven by self-reported lifestyle (weight 0.6).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{Fields, biomarker::NewBiomarkerAnalysis};

pub const ALGORITHM_VERSION: &str = "1.0.0";

const KLEMERA_WEIGHT: f64 = 0.4;
const PHENOTYPIC_WEIGHT: f64 = 0.6;

/// Added to the phenotypic score per smoking status: never, former, light,
/// heavy.
const SMOKING_PENALTY: [f64; 4] = [0.0, 1.5, 3.0, 5.0];

/// Required input: the waist-hip thresholds depend on it. `Other` is scored
/// on the female thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
  Male,
  Female,
  Other,
}

/// Biometric and lifestyle inputs. Scales are noted per field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Biometrics {
  pub chronological_age:  u32,
  pub gender:             Gender,
  pub weight_kg:          f64,
  pub height_cm:          f64,
  #[serde(default)]
  pub waist_cm:           Option<f64>,
  #[serde(default)]
  pub hip_cm:             Option<f64>,
  /// 0 = never … 4 = daily.
  #[serde(default)]
  pub exercise_frequency: u8,
  /// 0 = none … 3 = high.
  #[serde(default)]
  pub exercise_intensity: u8,
  #[serde(default = "Biometrics::default_sleep_hours")]
  pub sleep_hours:        f64,
  /// 1–5.
  #[serde(default = "Biometrics::default_mid_scale")]
  pub sleep_quality:      u8,
  /// 1–5.
  #[serde(default = "Biometrics::default_mid_scale")]
  pub stress_level:       u8,
  /// 1–5.
  #[serde(default = "Biometrics::default_mid_scale")]
  pub diet_quality:       u8,
  /// 0 = never, 1 = former, 2 = light, 3 = heavy.
  #[serde(default)]
  pub smoking_status:     u8,
  /// 0 = none … 4 = heavy.
  #[serde(default)]
  pub alcohol_intake:     u8,
}

impl Biometrics {
  fn default_sleep_hours() -> f64 { 7.0 }

  fn default_mid_scale() -> u8 { 3 }

  pub fn bmi(&self) -> f64 {
    let height_m = self.height_cm / 100.0;
    self.weight_kg / (height_m * height_m)
  }

  /// Waist-to-hip ratio; a missing waist counts as 0 and a missing hip as 1.
  pub fn waist_hip_ratio(&self) -> f64 {
    let waist = self.waist_cm.unwrap_or(0.0);
    let hip = self.hip_cm.unwrap_or(1.0);
    if hip > 0.0 { waist / hip } else { 0.0 }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComponentScores {
  pub lifestyle:      u8,
  pub metabolic:      u8,
  pub cardiovascular: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BioAgeReport {
  pub chronological_age:   u32,
  pub biological_age:      f64,
  pub age_difference:      f64,
  pub aging_velocity:      f64,
  pub longevity_score:     u8,
  pub component_scores:    ComponentScores,
  pub klemera_estimate:    f64,
  pub phenotypic_estimate: f64,
  pub algorithm_version:   String,
  pub interpretation:      String,
}

impl BioAgeReport {
  /// A biomarker analysis row recording this report.
  pub fn to_analysis(&self, analysis_date: DateTime<Utc>) -> NewBiomarkerAnalysis {
    let mut extra = Fields::new();
    extra.insert("age_difference".into(), json!(self.age_difference));
    extra.insert("aging_velocity".into(), json!(self.aging_velocity));
    extra.insert("component_scores".into(), json!(self.component_scores));
    extra.insert(
      "algorithm_details".into(),
      json!({
        "version": self.algorithm_version,
        "klemera_estimate": self.klemera_estimate,
        "phenotypic_estimate": self.phenotypic_estimate,
      }),
    );
    extra.insert("interpretation".into(), json!(self.interpretation));

    NewBiomarkerAnalysis {
      analysis_date:     Some(analysis_date),
      biological_age:    Some(self.biological_age),
      chronological_age: Some(i64::from(self.chronological_age)),
      longevity_score:   Some(i64::from(self.longevity_score)),
      extra,
    }
  }
}

fn round2(x: f64) -> f64 { (x * 100.0).round() / 100.0 }

fn klemera_doubal(data: &Biometrics) -> f64 {
  let bmi = data.bmi();
  let whr = data.waist_hip_ratio();
  let mut age = f64::from(data.chronological_age);

  if bmi < 18.5 {
    age += 1.5;
  } else if bmi > 30.0 {
    age += 3.0;
  } else if bmi > 25.0 {
    age += 1.0;
  } else if bmi >= 22.0 {
    age -= 1.0;
  }

  let (high, low) = match data.gender {
    Gender::Male => (0.95, 0.90),
    Gender::Female | Gender::Other => (0.85, 0.80),
  };
  if whr > high {
    age += 1.5;
  } else if whr < low {
    age -= 0.5;
  }

  round2(age)
}

fn phenotypic(data: &Biometrics) -> f64 {
  let mut score = f64::from(data.chronological_age) * 0.1;

  let exercise = f64::from(data.exercise_frequency) * f64::from(data.exercise_intensity) / 12.0;
  score -= exercise * 2.5;

  let sleep_optimal = (7.0..=9.0).contains(&data.sleep_hours);
  if sleep_optimal && data.sleep_quality >= 4 {
    score -= 1.5;
  } else if data.sleep_hours < 6.0 || data.sleep_quality <= 2 {
    score += 1.5;
  }

  if data.stress_level >= 4 {
    score += 1.0;
  } else if data.stress_level <= 2 {
    score -= 0.5;
  }

  if data.diet_quality >= 4 {
    score -= 1.0;
  } else if data.diet_quality <= 2 {
    score += 1.0;
  }

  score += SMOKING_PENALTY[usize::from(data.smoking_status.min(3))];

  if data.alcohol_intake >= 3 {
    score += 1.0;
  }

  round2(score * 10.0)
}

/// Lifestyle score on a 0–100 scale.
pub fn lifestyle_score(data: &Biometrics) -> u8 {
  let mut score = 50.0;

  let exercise = f64::from(data.exercise_frequency) * f64::from(data.exercise_intensity) * 1.5;
  score += exercise.min(20.0);

  if (7.0..=9.0).contains(&data.sleep_hours) {
    score += 10.0;
  }
  if data.sleep_quality >= 4 {
    score += 5.0;
  }

  score += (f64::from(data.diet_quality) - 3.0) * 3.0;
  score += (5.0 - f64::from(data.stress_level)) * 2.0;

  match data.smoking_status {
    0 => score += 15.0,
    1 => score += 5.0,
    _ => {}
  }

  if data.alcohol_intake <= 1 {
    score += 5.0;
  }

  score.trunc().clamp(0.0, 100.0) as u8
}

fn metabolic_score(bmi: f64) -> u8 {
  if !(18.5..=30.0).contains(&bmi) {
    80
  } else if bmi > 25.0 {
    90
  } else {
    100
  }
}

fn cardiovascular_score(smoking_status: u8) -> u8 {
  100_u8.saturating_sub(smoking_status.saturating_mul(15))
}

fn interpret(age_difference: f64) -> &'static str {
  if age_difference < -3.0 {
    "Your biological age is significantly younger than your chronological age. \
     Excellent lifestyle habits!"
  } else if age_difference < 0.0 {
    "Your biological age is younger than your chronological age. Keep up the good work!"
  } else if age_difference < 3.0 {
    "Your biological age is close to your chronological age. Small improvements can \
     make a big difference."
  } else {
    "Your biological age is older than your chronological age. Don't worry - lifestyle \
     changes can reverse this."
  }
}

/// Run the ensemble estimate.
pub fn calculate(data: &Biometrics) -> BioAgeReport {
  let klemera = klemera_doubal(data);
  let pheno = phenotypic(data);

  let biological_age = klemera * KLEMERA_WEIGHT + pheno * PHENOTYPIC_WEIGHT;
  let chronological = f64::from(data.chronological_age);
  let age_difference = biological_age - chronological;
  let aging_velocity = if data.chronological_age > 0 {
    biological_age / chronological
  } else {
    1.0
  };

  let lifestyle = lifestyle_score(data);
  let metabolic = metabolic_score(data.bmi());
  let cardiovascular = cardiovascular_score(data.smoking_status);
  let longevity =
    (u32::from(lifestyle) + u32::from(metabolic) + u32::from(cardiovascular)) / 3;

  BioAgeReport {
    chronological_age:   data.chronological_age,
    biological_age:      round2(biological_age),
    age_difference:      round2(age_difference),
    aging_velocity:      round2(aging_velocity),
    longevity_score:     longevity as u8,
    component_scores:    ComponentScores { lifestyle, metabolic, cardiovascular },
    klemera_estimate:    klemera,
    phenotypic_estimate: pheno,
    algorithm_version:   ALGORITHM_VERSION.to_owned(),
    interpretation:      interpret(age_difference).to_owned(),
  }
}
