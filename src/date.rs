//! Calendar dates as found in cells and as date stamps in file names.
use time::format_description::FormatItem;
use time::macros::format_description;
use time::{Date, PrimitiveDateTime, Time};

static DAY_FIRST: &[FormatItem<'static>] =
    format_description!("[day padding:none]/[month padding:none]/[year]");
static ISO: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");
static ISO_DATE_TIME: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

static YEAR_MONTH_DAY: &[FormatItem<'static>] = format_description!("[year][month][day]");
static DAY_MONTH_YEAR: &[FormatItem<'static>] = format_description!("[day][month][year]");
static SHORT_YEAR_MONTH_DAY: &[FormatItem<'static>] =
    format_description!("[year repr:last_two][month][day]");

/// Parse a date cell written as `DD/MM/YYYY` or `YYYY-MM-DD`, the latter optionally followed by a
/// midnight time as spreadsheet exports tend to add.
pub fn parse_cell(value: &str) -> Option<Date> {
    let value = value.trim();
    Date::parse(value, DAY_FIRST)
        .or_else(|_| Date::parse(value, ISO))
        .ok()
        .or_else(|| {
            PrimitiveDateTime::parse(value, ISO_DATE_TIME)
                .ok()
                .filter(|date_time| date_time.time() == Time::MIDNIGHT)
                .map(|date_time| date_time.date())
        })
}

/// The ways a date is stamped into input file names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stamp {
    /// `YYYYMMDD`, as used by flow files.
    YearMonthDay,
    /// `DDMMYYYY`, as used by estimate files.
    DayMonthYear,
    /// `YYMMDD`, as used by report files.
    ShortYearMonthDay,
}

impl Stamp {
    pub fn pattern(self) -> &'static str {
        match self {
            Stamp::YearMonthDay => "YYYYMMDD",
            Stamp::DayMonthYear => "DDMMYYYY",
            Stamp::ShortYearMonthDay => "YYMMDD",
        }
    }

    pub fn len(self) -> usize {
        self.pattern().len()
    }

    pub fn format(self, date: Date) -> String {
        date.format(match self {
            Stamp::YearMonthDay => YEAR_MONTH_DAY,
            Stamp::DayMonthYear => DAY_MONTH_YEAR,
            Stamp::ShortYearMonthDay => SHORT_YEAR_MONTH_DAY,
        })
        .expect("a date has all components needed to format it")
    }

    /// Parse `stamp`, which must consist of exactly the digits of this stamp.
    /// Two-digit years are taken to be in the 21st century.
    pub fn parse(self, stamp: &str) -> Option<Date> {
        if stamp.len() != self.len() || !stamp.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        match self {
            Stamp::YearMonthDay => Date::parse(stamp, YEAR_MONTH_DAY).ok(),
            Stamp::DayMonthYear => Date::parse(stamp, DAY_MONTH_YEAR).ok(),
            Stamp::ShortYearMonthDay => Date::parse(&format!("20{stamp}"), YEAR_MONTH_DAY).ok(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn cells_in_either_notation_denote_the_same_day() {
        for value in [
            "03/06/2025",
            "3/6/2025",
            "2025-06-03",
            " 2025-06-03 ",
            "2025-06-03 00:00:00",
        ] {
            assert_eq!(parse_cell(value), Some(date!(2025 - 06 - 03)), "{value}");
        }
        for value in ["", "2025/06/03", "32/01/2025", "2025-06-03 12:00:00", "03-06-2025"] {
            assert_eq!(parse_cell(value), None, "{value}");
        }
    }

    #[test]
    fn stamps_format_and_parse() {
        let day = date!(2025 - 06 - 03);
        for (stamp, text) in [
            (Stamp::YearMonthDay, "20250603"),
            (Stamp::DayMonthYear, "03062025"),
            (Stamp::ShortYearMonthDay, "250603"),
        ] {
            assert_eq!(stamp.format(day), text);
            assert_eq!(stamp.parse(text), Some(day), "{text}");
        }
        assert_eq!(Stamp::YearMonthDay.parse("20251301"), None);
        assert_eq!(Stamp::YearMonthDay.parse("2025063"), None);
        assert_eq!(Stamp::DayMonthYear.parse("3106202a"), None);
        assert_eq!(Stamp::ShortYearMonthDay.parse("250631"), None);
        assert_eq!(Stamp::DayMonthYear.parse("29022024"), Some(date!(2024 - 02 - 29)));
        assert_eq!(Stamp::DayMonthYear.parse("29022025"), None);
        assert_eq!(Stamp::YearMonthDay.parse("+2025061"), None);
    }
}
