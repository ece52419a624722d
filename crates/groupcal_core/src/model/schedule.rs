//! Task scheduling representations.
//!
//! # Responsibility
//! - Model the two mutually exclusive ways a task is placed on a calendar:
//!   an all-day date or a timed span.
//! - Resolve loose `(date, time_span)` input pairs into one authoritative
//!   representation.
//!
//! # Invariants
//! - A `Schedule` is always exactly one representation.
//! - A `TimeSpan` with an end never ends before it begins.
//! - A missing end means an open-ended (instant) span.

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Calendar date wire/storage format.
pub const DATE_FORMAT: &str = "%Y-%m-%d";
/// Canonical timestamp wire/storage format.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

const ACCEPTED_TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Timed placement with a begin and optional end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeSpan {
    pub begin: NaiveDateTime,
    pub end: Option<NaiveDateTime>,
}

impl TimeSpan {
    /// Builds a span, rejecting an end earlier than the begin.
    pub fn new(begin: NaiveDateTime, end: Option<NaiveDateTime>) -> Result<Self, ScheduleError> {
        let span = Self { begin, end };
        span.validate()?;
        Ok(span)
    }

    /// Builds an open-ended span (duration unknown).
    pub fn instant(begin: NaiveDateTime) -> Self {
        Self { begin, end: None }
    }

    /// Checks the range shape.
    pub fn validate(&self) -> Result<(), ScheduleError> {
        match self.end {
            Some(end) if end < self.begin => Err(ScheduleError::EndBeforeBegin {
                begin: self.begin,
                end,
            }),
            _ => Ok(()),
        }
    }

    pub fn is_open_ended(&self) -> bool {
        self.end.is_none()
    }
}

/// Authoritative calendar placement of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Schedule {
    /// Positioned by calendar date only.
    AllDay(NaiveDate),
    /// Positioned by begin timestamp and optional end.
    Timed(TimeSpan),
}

impl Schedule {
    /// Resolves the loose pair used at the request boundary.
    ///
    /// # Errors
    /// - `BothRepresentations` when both values are present.
    /// - `MissingRepresentation` when neither is present.
    /// - `EndBeforeBegin` for a reversed span.
    pub fn from_parts(
        date: Option<NaiveDate>,
        time_span: Option<TimeSpan>,
    ) -> Result<Self, ScheduleError> {
        match (date, time_span) {
            (Some(_), Some(_)) => Err(ScheduleError::BothRepresentations),
            (None, None) => Err(ScheduleError::MissingRepresentation),
            (Some(date), None) => Ok(Self::AllDay(date)),
            (None, Some(span)) => {
                span.validate()?;
                Ok(Self::Timed(span))
            }
        }
    }

    pub fn validate(&self) -> Result<(), ScheduleError> {
        match self {
            Self::AllDay(_) => Ok(()),
            Self::Timed(span) => span.validate(),
        }
    }

    /// All-day date, `None` for timed schedules.
    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            Self::AllDay(date) => Some(*date),
            Self::Timed(_) => None,
        }
    }

    /// Time span, `None` for all-day schedules.
    pub fn time_span(&self) -> Option<&TimeSpan> {
        match self {
            Self::AllDay(_) => None,
            Self::Timed(span) => Some(span),
        }
    }

    pub fn is_all_day(&self) -> bool {
        matches!(self, Self::AllDay(_))
    }

    /// First calendar day the task occupies.
    pub fn start_day(&self) -> NaiveDate {
        match self {
            Self::AllDay(date) => *date,
            Self::Timed(span) => span.begin.date(),
        }
    }

    /// Last calendar day the task occupies.
    pub fn end_day(&self) -> NaiveDate {
        match self {
            Self::AllDay(date) => *date,
            Self::Timed(span) => span.end.unwrap_or(span.begin).date(),
        }
    }
}

/// Inclusive calendar-date window used by list queries.
///
/// `None` bounds are unbounded in that direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Result<Self, ScheduleError> {
        if let (Some(from), Some(to)) = (from, to) {
            if to < from {
                return Err(ScheduleError::RangeReversed { from, to });
            }
        }
        Ok(Self { from, to })
    }

    pub fn unbounded() -> Self {
        Self::default()
    }

    /// The whole calendar month, as the month view requests it.
    pub fn month(year: i32, month: u32) -> Option<Self> {
        let from = NaiveDate::from_ymd_opt(year, month, 1)?;
        let next = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)?
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)?
        };
        Some(Self {
            from: Some(from),
            to: next.pred_opt(),
        })
    }

    /// Returns whether a schedule's occupied days overlap this window.
    pub fn overlaps(&self, schedule: &Schedule) -> bool {
        let after_from = self.from.map_or(true, |from| schedule.end_day() >= from);
        let before_to = self.to.map_or(true, |to| schedule.start_day() <= to);
        after_from && before_to
    }
}

/// Schedule shape violations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    /// Both `date` and `time_span` were supplied.
    BothRepresentations,
    /// Neither `date` nor `time_span` would remain.
    MissingRepresentation,
    /// `time_span.end` precedes `time_span.begin`.
    EndBeforeBegin {
        begin: NaiveDateTime,
        end: NaiveDateTime,
    },
    /// Range filter `to` precedes `from`.
    RangeReversed { from: NaiveDate, to: NaiveDate },
    /// Text value cannot be parsed as a date or timestamp.
    Malformed { field: &'static str, value: String },
}

impl ScheduleError {
    /// Name of the offending field.
    pub fn field(&self) -> &'static str {
        match self {
            Self::BothRepresentations | Self::MissingRepresentation => "schedule",
            Self::EndBeforeBegin { .. } => "time_span.end",
            Self::RangeReversed { .. } => "range",
            Self::Malformed { field, .. } => field,
        }
    }
}

impl Display for ScheduleError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BothRepresentations => {
                write!(f, "date and time_span are mutually exclusive; supply exactly one")
            }
            Self::MissingRepresentation => {
                write!(f, "schedule requires either date or time_span")
            }
            Self::EndBeforeBegin { begin, end } => write!(
                f,
                "time_span.end {} is earlier than time_span.begin {}",
                end.format(TIMESTAMP_FORMAT),
                begin.format(TIMESTAMP_FORMAT)
            ),
            Self::RangeReversed { from, to } => write!(
                f,
                "range end {} is earlier than range start {}",
                to.format(DATE_FORMAT),
                from.format(DATE_FORMAT)
            ),
            Self::Malformed { field, value } => {
                write!(f, "{field} has malformed value `{value}`")
            }
        }
    }
}

impl Error for ScheduleError {}

/// Parses a `YYYY-MM-DD` calendar date.
pub fn parse_date(field: &'static str, value: &str) -> Result<NaiveDate, ScheduleError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|_| ScheduleError::Malformed {
        field,
        value: value.to_string(),
    })
}

/// Parses a local timestamp; seconds and the `T` separator are optional.
///
/// Sub-second precision is dropped to match the storage format.
pub fn parse_timestamp(field: &'static str, value: &str) -> Result<NaiveDateTime, ScheduleError> {
    let trimmed = value.trim();
    ACCEPTED_TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
        .and_then(|parsed| parsed.with_nanosecond(0))
        .ok_or_else(|| ScheduleError::Malformed {
            field,
            value: value.to_string(),
        })
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn format_timestamp(value: NaiveDateTime) -> String {
    value.format(TIMESTAMP_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::{parse_date, parse_timestamp, DateRange, Schedule, ScheduleError, TimeSpan};
    use chrono::NaiveDate;

    fn ts(value: &str) -> chrono::NaiveDateTime {
        parse_timestamp("test", value).expect("valid timestamp")
    }

    #[test]
    fn from_parts_requires_exactly_one_representation() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 10);
        let span = Some(TimeSpan::instant(ts("2026-01-10T09:00")));

        assert_eq!(
            Schedule::from_parts(date, span),
            Err(ScheduleError::BothRepresentations)
        );
        assert_eq!(
            Schedule::from_parts(None, None),
            Err(ScheduleError::MissingRepresentation)
        );
        assert!(Schedule::from_parts(date, None)
            .expect("all-day")
            .is_all_day());
    }

    #[test]
    fn reversed_span_is_rejected_with_end_field() {
        let err = TimeSpan::new(ts("2026-01-10T10:00"), Some(ts("2026-01-10T09:00")))
            .expect_err("reversed span");
        assert_eq!(err.field(), "time_span.end");
    }

    #[test]
    fn zero_length_span_is_valid() {
        let at = ts("2026-01-10T10:00");
        assert!(TimeSpan::new(at, Some(at)).is_ok());
    }

    #[test]
    fn timestamp_parser_accepts_minute_precision() {
        assert_eq!(ts("2026-01-10T09:00"), ts("2026-01-10T09:00:00"));
        assert_eq!(ts("2026-01-10 09:00"), ts("2026-01-10T09:00:00"));
        assert!(parse_timestamp("time_span.begin", "10/01/2026").is_err());
    }

    #[test]
    fn date_parser_reports_field_on_failure() {
        let err = parse_date("date", "2026-13-01").expect_err("invalid month");
        assert_eq!(err.field(), "date");
    }

    #[test]
    fn month_range_covers_whole_month() {
        let range = DateRange::month(2026, 2).expect("valid month");
        assert_eq!(range.from, NaiveDate::from_ymd_opt(2026, 2, 1));
        assert_eq!(range.to, NaiveDate::from_ymd_opt(2026, 2, 28));

        let december = DateRange::month(2025, 12).expect("valid month");
        assert_eq!(december.to, NaiveDate::from_ymd_opt(2025, 12, 31));
    }

    #[test]
    fn range_overlap_uses_occupied_days() {
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2026, 1, 10),
            NaiveDate::from_ymd_opt(2026, 1, 12),
        )
        .expect("valid range");

        let overnight = Schedule::Timed(
            TimeSpan::new(ts("2026-01-09T22:00"), Some(ts("2026-01-10T02:00")))
                .expect("valid span"),
        );
        let before = Schedule::AllDay(NaiveDate::from_ymd_opt(2026, 1, 9).expect("date"));

        assert!(range.overlaps(&overnight));
        assert!(!range.overlaps(&before));
        assert!(DateRange::unbounded().overlaps(&before));
    }

    #[test]
    fn reversed_range_is_rejected() {
        let err = DateRange::new(
            NaiveDate::from_ymd_opt(2026, 1, 12),
            NaiveDate::from_ymd_opt(2026, 1, 10),
        )
        .expect_err("reversed range");
        assert_eq!(err.field(), "range");
    }
}
