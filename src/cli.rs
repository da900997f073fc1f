use chrono::NaiveDate;
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "raspisanie", about = "University timetable scraper and schedule queries")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run one full batch scrape and replace the snapshot.
    Scrape,
    /// One day's schedule for a group.
    Day {
        group: String,
        /// Defaults to today.
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        subgroup: Option<u8>,
    },
    /// Seven days of a group's schedule.
    Week {
        group: String,
        /// First day; defaults to today.
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        subgroup: Option<u8>,
    },
    /// All known teachers, normalized and deduplicated.
    Teachers,
    /// Seven days of one teacher's aggregated schedule.
    Teacher {
        name: String,
        /// First day; defaults to today.
        #[arg(long)]
        from: Option<NaiveDate>,
    },
}
