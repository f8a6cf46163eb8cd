use chrono::{DateTime, Local, NaiveDate};

/// This is the standard way of keying a record by its date in taplog.
pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Clock reading the way it is stored on a record, zero padded 24-hour time.
pub fn clock_time(time: DateTime<Local>) -> String {
    time.format("%H:%M").to_string()
}

/// Long display form of a date, e.g. "Friday, 1 March 2024".
pub fn long_date(date: NaiveDate) -> String {
    date.format("%A, %-d %B %Y").to_string()
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone};

    use super::*;

    #[test]
    fn date_key_is_iso_with_padding() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(date_key(date), "2024-03-01");
    }

    #[test]
    fn clock_time_pads_hours_and_minutes() {
        let time = Local.with_ymd_and_hms(2024, 3, 1, 9, 5, 33).unwrap();
        assert_eq!(clock_time(time), "09:05");
    }

    #[test]
    fn long_date_spells_out_weekday_and_month() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(long_date(date), "Friday, 1 March 2024");
    }
}
