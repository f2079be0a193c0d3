use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};

/// Day value of a grid slot that falls outside the month.
pub const SENTINEL: u32 = 0;

/// One Monday-first calendar week; out-of-month slots hold [`SENTINEL`].
pub type Week = [u32; 7];

/// The week rows of a single month, Monday first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthGrid {
    first: NaiveDate,
    next_first: NaiveDate,
    weeks: Vec<Week>,
}

impl MonthGrid {
    /// Builds the grid for `year`/`month`.
    ///
    /// Returns `None` when `month` is outside `1..=12` or the month (or the
    /// one after it) cannot be represented by chrono.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        let first = NaiveDate::from_ymd_opt(year, month, 1)?;
        let next_first = if month == 12 {
            NaiveDate::from_ymd_opt(year.checked_add(1)?, 1, 1)?
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)?
        };
        let days = u32::try_from(next_first.signed_duration_since(first).num_days()).ok()?;

        let mut weeks = Vec::with_capacity(6);
        let mut week = [SENTINEL; 7];
        let mut slot = first.weekday().num_days_from_monday() as usize;

        for day in 1..=days {
            week[slot] = day;
            slot += 1;
            if slot == 7 {
                weeks.push(week);
                week = [SENTINEL; 7];
                slot = 0;
            }
        }
        if slot > 0 {
            weeks.push(week);
        }

        Some(Self {
            first,
            next_first,
            weeks,
        })
    }

    pub fn year(&self) -> i32 {
        self.first.year()
    }

    pub fn month(&self) -> u32 {
        self.first.month()
    }

    pub fn weeks(&self) -> &[Week] {
        &self.weeks
    }

    pub fn days_in_month(&self) -> u32 {
        self.next_first.pred_opt().map_or(0, |last| last.day())
    }

    /// Half-open UTC range `[start, end)` covering the month as seen in `tz`.
    ///
    /// This is the one store read a render needs. `None` if local midnight
    /// does not exist in `tz` on either boundary.
    pub fn utc_bounds<Tz: TimeZone>(&self, tz: &Tz) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        Some((
            local_midnight(tz, self.first)?,
            local_midnight(tz, self.next_first)?,
        ))
    }
}

fn local_midnight<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> Option<DateTime<Utc>> {
    let midnight = date.and_hms_opt(0, 0, 0)?;
    tz.from_local_datetime(&midnight)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
}
