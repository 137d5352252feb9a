//! `vitals`: command-line access to a Vitals health store.
//!
//! Talks to the hosted backend when `remote_url` and `remote_api_key` are
//! configured and reachable, and to a local SQLite file otherwise.
//!
//! # Usage
//!
//! ```
//! vitals init --email ada@example.com --demo
//! VITALS_REMOTE_URL=https://db.example.com VITALS_REMOTE_API_KEY=... vitals summary <USER_ID>
//! vitals --local bio-age biometrics.json --save <USER_ID>
//! ```

mod backend;
mod settings;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use serde::{Serialize, de::DeserializeOwned};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;
use vitals_core::{
  bioage::{self, Biometrics},
  metrics::{self, WEEK_DAYS},
  store::HealthStore,
  user::NewUser,
  wearable::WearableSample,
  workflow::{self, Provisioned, SeedSummary},
};

use crate::{backend::Backend, settings::Settings};

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "vitals", version, about = "Personal health data from the command line")]
struct Cli {
  /// Path to a TOML settings file. Missing files are ignored.
  #[arg(short, long, value_name = "FILE", default_value = "vitals.toml")]
  config: PathBuf,

  /// Use the local store even if a remote backend is configured.
  #[arg(long)]
  local: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Create a user with a default digital twin and a welcome insight.
  Init {
    #[arg(long)]
    email: String,
    #[arg(long)]
    name:  Option<String>,
    /// Also seed demo metrics, supplements, a goal and a lab result.
    #[arg(long)]
    demo:  bool,
    /// Days of demo metrics to seed.
    #[arg(long, default_value_t = 30, value_parser = days_arg())]
    days:  u32,
  },
  /// Show a user.
  User { user_id: Uuid },
  /// Averages over the last week.
  Summary { user_id: Uuid },
  /// Daily score points, oldest first.
  History {
    user_id: Uuid,
    #[arg(long, default_value_t = 30, value_parser = days_arg())]
    days:    u32,
  },
  /// Daily metric rows in a date range (default: the last week).
  Metrics {
    user_id: Uuid,
    #[arg(long)]
    from:    Option<NaiveDate>,
    #[arg(long)]
    to:      Option<NaiveDate>,
  },
  /// Record today's metrics from a wearable sample (JSON file).
  Sync {
    user_id:  Uuid,
    #[arg(long)]
    provider: String,
    file:     PathBuf,
  },
  /// Show the user's digital twin.
  Twin { user_id: Uuid },
  /// List insights, newest first.
  Insights {
    user_id: Uuid,
    #[arg(long)]
    unread:  bool,
  },
  /// Mark an insight as read.
  ReadInsight { insight_id: Uuid },
  /// Estimate biological age from a biometrics JSON file.
  BioAge {
    file: PathBuf,
    /// Store the result as a biomarker analysis for this user.
    #[arg(long, value_name = "USER_ID")]
    save: Option<Uuid>,
  },
  /// List active supplements.
  Supplements { user_id: Uuid },
  /// List health goals.
  Goals { user_id: Uuid },
}

/// Upper bound for `--days`: ten years of daily rows.
const MAX_DAYS: u32 = 3_650;

fn days_arg() -> clap::builder::RangedI64ValueParser<u32> {
  clap::value_parser!(u32).range(1..=i64::from(MAX_DAYS))
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  // Logs go to stderr; stdout carries the JSON output.
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = Settings::load(&cli.config)
    .with_context(|| format!("failed to load settings from {}", cli.config.display()))?;

  let backend = Backend::select(&settings, cli.local)
    .await
    .context("failed to open local store")?;
  tracing::debug!(backend = backend.name(), "store selected");

  run(&backend, cli.command).await
}

async fn run<S: HealthStore>(store: &S, command: Command) -> Result<()> {
  match command {
    Command::Init { email, name, demo, days } => {
      let input = NewUser { full_name: name, ..NewUser::new(email) };
      let provisioned = workflow::provision_user(store, input)
        .await
        .context("provisioning user")?;

      let seeded = if demo {
        let today = Utc::now().date_naive();
        let summary = workflow::seed_demo_data(store, provisioned.user.id, today, days)
          .await
          .context("seeding demo data")?;
        Some(summary)
      } else {
        None
      };

      print_json(&InitOutput { provisioned, seeded })
    }

    Command::User { user_id } => {
      let user = store.get_user(user_id).await.context("fetching user")?;
      match user {
        Some(user) => print_json(&user),
        None => bail!("no user with id {user_id}"),
      }
    }

    Command::Summary { user_id } => {
      let summary = store.weekly_summary(user_id).await.context("fetching weekly summary")?;
      print_json(&summary)
    }

    Command::History { user_id, days } => {
      let points = store
        .health_score_history(user_id, days)
        .await
        .context("fetching score history")?;
      print_json(&points)
    }

    Command::Metrics { user_id, from, to } => {
      let end = to.unwrap_or_else(|| Utc::now().date_naive());
      let start = from.unwrap_or_else(|| metrics::trailing_window(end, WEEK_DAYS).0);
      let rows = store
        .get_daily_metrics(user_id, start, end)
        .await
        .context("fetching daily metrics")?;
      print_json(&rows)
    }

    Command::Sync { user_id, provider, file } => {
      let sample: WearableSample = read_json(&file)?;
      let report = workflow::sync_wearable(store, user_id, &provider, sample)
        .await
        .context("syncing wearable")?;
      print_json(&report)
    }

    Command::Twin { user_id } => {
      let twin = store.get_digital_twin(user_id).await.context("fetching digital twin")?;
      print_json(&twin)
    }

    Command::Insights { user_id, unread } => {
      let insights = store
        .get_insights(user_id, unread)
        .await
        .context("fetching insights")?;
      print_json(&insights)
    }

    Command::ReadInsight { insight_id } => {
      let insight = store
        .mark_insight_read(insight_id)
        .await
        .context("marking insight read")?;
      match insight {
        Some(insight) => print_json(&insight),
        None => bail!("no insight with id {insight_id}"),
      }
    }

    Command::BioAge { file, save } => {
      let biometrics: Biometrics = read_json(&file)?;
      let report = bioage::calculate(&biometrics);
      if let Some(user_id) = save {
        store
          .save_biomarker_analysis(user_id, report.to_analysis(Utc::now()))
          .await
          .context("saving biomarker analysis")?;
      }
      print_json(&report)
    }

    Command::Supplements { user_id } => {
      let supplements = store.get_supplements(user_id).await.context("fetching supplements")?;
      print_json(&supplements)
    }

    Command::Goals { user_id } => {
      let goals = store.get_goals(user_id).await.context("fetching goals")?;
      print_json(&goals)
    }
  }
}

// ─── Output helpers ───────────────────────────────────────────────────────────

#[derive(Serialize)]
struct InitOutput {
  #[serde(flatten)]
  provisioned: Provisioned,
  #[serde(skip_serializing_if = "Option::is_none")]
  seeded:      Option<SeedSummary>,
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
  let raw = std::fs::read_to_string(path)
    .with_context(|| format!("reading {}", path.display()))?;
  serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
  let out = serde_json::to_string_pretty(value).context("serialising output")?;
  println!("{out}");
  Ok(())
}

#[cfg(test)]
mod tests {
  use clap::error::ErrorKind;

  use super::*;

  #[test]
  fn days_are_bounded() {
    let cli = Cli::try_parse_from(["vitals", "history", &Uuid::nil().to_string()]).unwrap();
    assert!(matches!(cli.command, Command::History { days: 30, .. }));

    let id = Uuid::nil().to_string();
    let err = Cli::try_parse_from(["vitals", "history", &id, "--days", "4294967295"]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValueValidation);

    let err = Cli::try_parse_from(["vitals", "init", "--email", "a@b.c", "--days", "0"]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValueValidation);

    let cli = Cli::try_parse_from(["vitals", "init", "--email", "a@b.c", "--days", "3650"]).unwrap();
    assert!(matches!(cli.command, Command::Init { days: MAX_DAYS, .. }));
  }
}
