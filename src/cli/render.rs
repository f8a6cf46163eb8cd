//! Console output for the ledger commands. Everything here is display only,
//! state changes stay in the ledger.

use std::collections::{BTreeMap, BTreeSet};

use ansi_term::{Colour, Style};

use crate::{
    ledger::{DayRecord, Ledger},
    utils::time::long_date,
};

const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

pub fn confirm(message: &str) {
    println!("{}", Colour::Green.paint(message));
}

/// Used for rejected operations. They are not errors, so the process still
/// exits cleanly, but the user should see why nothing changed.
pub fn notice(message: &str) {
    println!("{}", Style::new().dimmed().paint(message));
}

pub fn status(ledger: &Ledger) {
    println!("{}", Style::new().bold().paint(long_date(ledger.today())));
    if let Some(record) = ledger.today_record() {
        if record.is_open() {
            println!(
                "{}",
                Colour::Green.paint(format!("Tapped in at {}.", record.tap_in))
            );
        } else {
            println!(
                "Tapped in at {}, tapped out at {}.",
                tap_cell(&record.tap_in),
                tap_cell(&record.tap_out)
            );
        }
        print_activities(record);
        println!(
            "{}",
            Style::new().dimmed().paint(format!("Record id {}", record.id))
        );
    } else {
        println!("Not tapped in today.");
    }
    if ledger.can_tap_in() {
        notice("Tap in is available.");
    } else if ledger.can_tap_out() {
        notice("Tap out is available.");
    }
}

pub fn log_table<'a>(records: impl Iterator<Item = &'a DayRecord>) {
    let mut printed_any = false;
    for record in records {
        printed_any = true;
        println!(
            "{}\t{}\t{} - {}",
            record.id,
            Style::new().bold().paint(long_date(record.date)),
            tap_cell(&record.tap_in),
            tap_cell(&record.tap_out),
        );
        print_activities(record);
    }
    if !printed_any {
        notice("No records match.");
    }
}

pub fn months(years_and_months: &BTreeMap<i32, BTreeSet<u32>>) {
    if years_and_months.is_empty() {
        notice("No records yet.");
        return;
    }
    for (year, months0) in years_and_months.iter().rev() {
        println!("{}", Style::new().bold().paint(year.to_string()));
        for month0 in months0 {
            println!("\t{}", MONTHS[*month0 as usize]);
        }
    }
}

/// Notes are addressed by these one-based indexes in the note commands.
fn print_activities(record: &DayRecord) {
    for (index, activity) in record.activities.iter().enumerate() {
        println!("\t{}. {}", index + 1, activity);
    }
}

fn tap_cell(time: &str) -> String {
    if time.is_empty() {
        Colour::Yellow.paint("--:--").to_string()
    } else {
        time.to_string()
    }
}
