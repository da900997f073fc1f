use anyhow::Context;
use chrono::{Local, NaiveDate};
use clap::Parser;
use tracing::info;

use raspisanie::cli::{Args, Command};
use raspisanie::config::Config;
use raspisanie::data::snapshot;
use raspisanie::logging::setup_logging;
use raspisanie::schedule::project::{day_schedule, week_schedule_from};
use raspisanie::schedule::teachers::{teacher_week_schedule, TeacherIndex};
use raspisanie::scrape::ScrapeRunner;

fn today() -> NaiveDate {
    Local::now().date_naive()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();
    let config = Config::load()?;
    setup_logging(&config);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        semester_start = %config.semester_start,
        "starting raspisanie"
    );

    match args.command {
        Command::Scrape => {
            let report = ScrapeRunner::new(config)?.run().await?;
            info!(ok = report.ok, failed = report.failed, "scrape finished");
        }
        Command::Day { group, date, subgroup } => {
            let data = snapshot::load(&config.snapshot_path, &config.institution)?;
            let schedule = data
                .find_group(&group)
                .with_context(|| format!("no schedule for group {group:?}"))?;
            let day = day_schedule(
                schedule,
                date.unwrap_or_else(today),
                config.semester_start,
                subgroup,
            );
            println!("{}", serde_json::to_string_pretty(&day)?);
        }
        Command::Week { group, from, subgroup } => {
            let data = snapshot::load(&config.snapshot_path, &config.institution)?;
            let schedule = data
                .find_group(&group)
                .with_context(|| format!("no schedule for group {group:?}"))?;
            let week = week_schedule_from(
                schedule,
                from.unwrap_or_else(today),
                config.semester_start,
                subgroup,
            );
            println!("{}", serde_json::to_string_pretty(&week)?);
        }
        Command::Teachers => {
            let data = snapshot::load(&config.snapshot_path, &config.institution)?;
            for name in TeacherIndex::build(&data).names() {
                println!("{name}");
            }
        }
        Command::Teacher { name, from } => {
            let data = snapshot::load(&config.snapshot_path, &config.institution)?;
            let week = teacher_week_schedule(
                &data,
                &name,
                from.unwrap_or_else(today),
                config.semester_start,
            );
            println!("{}", serde_json::to_string_pretty(&week)?);
        }
    }

    Ok(())
}
