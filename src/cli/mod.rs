pub mod render;

use std::{fmt::Display, path::PathBuf, time::Duration};

use anyhow::Result;
use chrono::{Local, NaiveDate};
use chrono_english::parse_date_string;
use clap::{error::ErrorKind, CommandFactory, Parser, Subcommand, ValueEnum};
use tracing::level_filters::LevelFilter;

use crate::{
    ledger::{Ledger, RecordId, TimeField},
    storage::{JsonLedgerStore, LedgerStore},
    utils::{
        clock::DefaultClock,
        dir::create_application_default_path,
        logging::{enable_logging, CLI_PREFIX, WATCH_PREFIX},
        time::date_key,
    },
    watch::{start_watch, DEFAULT_POLL_INTERVAL},
};

#[derive(Parser, Debug)]
#[command(name = "Taplog", version, long_about = None)]
#[command(about = "Attendance tracker for daily tap in/tap out with activity notes", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(
        long,
        global = true,
        help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
    )]
    dir: Option<PathBuf>,
    #[arg(long, global = true, help = "Echo logs to the console")]
    log: bool,
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
enum Commands {
    #[command(about = "Tap in, starting today's record")]
    In,
    #[command(about = "Tap out, closing today's record")]
    Out,
    #[command(about = "Show today's record and tap state")]
    Status,
    #[command(about = "List records, optionally filtered by year and month")]
    Log {
        #[arg(long, help = "Keep only records of this year, e.g. 2024")]
        year: Option<i32>,
        #[arg(long, help = "Keep only records of this month, 1 through 12")]
        month: Option<u32>,
    },
    #[command(about = "Show which years and months hold records")]
    Months,
    #[command(about = "Manage activity notes on a day")]
    Note {
        #[command(subcommand)]
        command: NoteCommands,
    },
    #[command(about = "Overwrite the tap-in or tap-out time of a record")]
    Edit {
        #[arg(help = "Record id, as shown by the log command")]
        id: String,
        field: TimeField,
        #[arg(help = "New time text, stored as given")]
        time: String,
    },
    #[command(about = "Delete a record entirely")]
    Delete {
        #[arg(help = "Record id, as shown by the log command")]
        id: String,
    },
    #[command(about = "Run the day-rollover monitor in the foreground until interrupted")]
    Watch {
        #[arg(long, default_value_t = DEFAULT_POLL_INTERVAL.as_millis() as u64, help = "Poll interval in milliseconds")]
        interval_ms: u64,
    },
}

#[derive(Subcommand, Debug)]
enum NoteCommands {
    #[command(about = "Append a note to a day that has a tap-in")]
    Add {
        text: String,
        #[arg(
            long,
            help = "Day to attach the note to, today if omitted. Examples are \"yesterday\", \"15/03/2025\""
        )]
        date: Option<String>,
        #[arg(long, default_value_t = DateStyle::Uk, help = "Style of dates used during parsing. For Uk it's day/month/year. For Us it's month/day/year")]
        date_style: DateStyle,
    },
    #[command(about = "Replace a note, addressed by record id and note number")]
    Edit {
        id: String,
        #[arg(help = "Note number, starting at 1")]
        index: usize,
        text: String,
    },
    #[command(about = "Remove a note, addressed by record id and note number")]
    Del {
        id: String,
        #[arg(help = "Note number, starting at 1")]
        index: usize,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DateStyle {
    Uk,
    Us,
}

impl From<DateStyle> for chrono_english::Dialect {
    fn from(value: DateStyle) -> Self {
        match value {
            DateStyle::Uk => Self::Uk,
            DateStyle::Us => Self::Us,
        }
    }
}

impl Display for DateStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateStyle::Uk => write!(f, "uk"),
            DateStyle::Us => write!(f, "us"),
        }
    }
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let app_dir = args
        .dir
        .clone()
        .map_or_else(create_application_default_path, Ok)?;
    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };
    let prefix = if matches!(args.commands, Commands::Watch { .. }) {
        WATCH_PREFIX
    } else {
        CLI_PREFIX
    };
    enable_logging(prefix, &app_dir, logging_level, args.log)?;

    match args.commands {
        Commands::Watch { interval_ms } => {
            start_watch(app_dir, Duration::from_millis(interval_ms)).await
        }
        commands => run_ledger_command(commands, app_dir).await,
    }
}

/// Loads the ledger, applies one command and persists the snapshot back when
/// the command actually changed something.
async fn run_ledger_command(command: Commands, app_dir: PathBuf) -> Result<()> {
    let store = JsonLedgerStore::new(app_dir)?;
    let (records, tapped_in) = store.load().await?;
    let mut ledger = Ledger::from_parts(records, tapped_in, Box::new(DefaultClock));

    let changed = apply_command(&mut ledger, command)?;
    if changed {
        store.save(ledger.records(), ledger.is_tapped_in()).await?;
    }
    Ok(())
}

fn apply_command(ledger: &mut Ledger, command: Commands) -> Result<bool> {
    match command {
        Commands::In => {
            let tapped = ledger.tap_in();
            if tapped {
                if let Some(record) = ledger.today_record() {
                    render::confirm(&format!("Tapped in at {}.", record.tap_in));
                }
            } else {
                render::notice("Today already has a record, nothing to do.");
            }
            Ok(tapped)
        }
        Commands::Out => {
            let tapped_out = ledger.tap_out();
            if tapped_out {
                if let Some(record) = ledger.today_record() {
                    render::confirm(&format!("Tapped out at {}.", record.tap_out));
                }
            } else {
                render::notice("No open record for today, nothing to do.");
            }
            Ok(tapped_out)
        }
        Commands::Status => {
            render::status(ledger);
            Ok(false)
        }
        Commands::Log { year, month } => {
            let month0 = parse_month(month)?;
            render::log_table(ledger.filtered(year, month0));
            Ok(false)
        }
        Commands::Months => {
            render::months(&ledger.years_and_months());
            Ok(false)
        }
        Commands::Note { command } => apply_note_command(ledger, command),
        Commands::Edit { id, field, time } => {
            let edited = ledger.edit_time(&RecordId::from(id.as_str()), field, &time);
            if edited {
                render::confirm(&format!("Updated the {field} time of record {id}."));
            } else {
                render::notice(&format!("No record with id {id}."));
            }
            Ok(edited)
        }
        Commands::Delete { id } => {
            let deleted = ledger.delete_record(&RecordId::from(id.as_str()));
            if deleted {
                render::confirm(&format!("Deleted record {id}."));
            } else {
                render::notice(&format!("No record with id {id}."));
            }
            Ok(deleted)
        }
        Commands::Watch { .. } => unreachable!("watch runs before the ledger is loaded"),
    }
}

fn apply_note_command(ledger: &mut Ledger, command: NoteCommands) -> Result<bool> {
    match command {
        NoteCommands::Add {
            text,
            date,
            date_style,
        } => {
            let date = parse_note_date(date, date_style, ledger.today())?;
            let added = ledger.add_activity(date, &text);
            if added {
                render::confirm(&format!("Added a note to {}.", date_key(date)));
            } else {
                render::notice("Note rejected, the day needs a tap-in and the text can't be blank.");
            }
            Ok(added)
        }
        NoteCommands::Edit { id, index, text } => {
            let edited =
                ledger.edit_activity(&RecordId::from(id.as_str()), note_index(index)?, &text);
            if edited {
                render::confirm(&format!("Replaced note {index} of record {id}."));
            } else {
                render::notice(&format!("Record {id} has no note {index}."));
            }
            Ok(edited)
        }
        NoteCommands::Del { id, index } => {
            let deleted =
                ledger.delete_activity(&RecordId::from(id.as_str()), note_index(index)?);
            if deleted {
                render::confirm(&format!("Removed note {index} of record {id}."));
            } else {
                render::notice(&format!("Record {id} has no note {index}."));
            }
            Ok(deleted)
        }
    }
}

fn parse_note_date(
    input: Option<String>,
    date_style: DateStyle,
    today: NaiveDate,
) -> Result<NaiveDate> {
    let Some(input) = input else {
        return Ok(today);
    };
    match parse_date_string(&input, Local::now(), date_style.into()) {
        Ok(parsed) => Ok(parsed.date_naive()),
        Err(e) => Err(Args::command()
            .error(
                ErrorKind::ValueValidation,
                format!("Failed to parse date {e}"),
            )
            .into()),
    }
}

fn parse_month(month: Option<u32>) -> Result<Option<u32>> {
    match month {
        None => Ok(None),
        Some(month @ 1..=12) => Ok(Some(month - 1)),
        Some(month) => Err(Args::command()
            .error(
                ErrorKind::ValueValidation,
                format!("Month must be between 1 and 12, got {month}"),
            )
            .into()),
    }
}

fn note_index(index: usize) -> Result<usize> {
    index.checked_sub(1).ok_or_else(|| {
        Args::command()
            .error(ErrorKind::ValueValidation, "Note numbers start at 1")
            .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_are_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn parse_month_shifts_to_zero_based() {
        assert_eq!(parse_month(None).unwrap(), None);
        assert_eq!(parse_month(Some(1)).unwrap(), Some(0));
        assert_eq!(parse_month(Some(12)).unwrap(), Some(11));
    }

    #[test]
    fn parse_month_rejects_out_of_range() {
        assert!(parse_month(Some(0)).is_err());
        assert!(parse_month(Some(13)).is_err());
    }

    #[test]
    fn note_index_shifts_to_zero_based() {
        assert_eq!(note_index(1).unwrap(), 0);
        assert_eq!(note_index(3).unwrap(), 2);
        assert!(note_index(0).is_err());
    }
}
