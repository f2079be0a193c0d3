use std::collections::BTreeMap;
use std::fmt::Write;

use chrono::{DateTime, Datelike, TimeZone, Utc};
use super::grid::{MonthGrid, SENTINEL};

/// Placeholder shown for an appointment when details are hidden.
pub const REDACTED_LABEL: &str = "Termin zajęty";

const MONTH_NAMES: [&str; 12] = [
    "Styczeń",
    "Luty",
    "Marzec",
    "Kwiecień",
    "Maj",
    "Czerwiec",
    "Lipiec",
    "Sierpień",
    "Wrzesień",
    "Październik",
    "Listopad",
    "Grudzień",
];

const WEEKDAYS: [(&str, &str); 7] = [
    ("mon", "Pon"),
    ("tue", "Wt"),
    ("wed", "Śr"),
    ("thu", "Czw"),
    ("fri", "Pt"),
    ("sat", "Sob"),
    ("sun", "Nie"),
];

/// Anything that occupies a calendar day.
pub trait Scheduled {
    fn date(&self) -> DateTime<Utc>;
    fn description(&self) -> &str;
}

/// Whether a public calendar reveals what an appointment is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CalendarVisibility {
    #[default]
    Redacted,
    Detailed,
}

/// Appointments of one month keyed by local day of month.
pub struct MonthAppointments<'a, A> {
    by_day: BTreeMap<u32, Vec<&'a A>>,
}

impl<'a, A: Scheduled> MonthAppointments<'a, A> {
    /// Groups `appointments` by their local calendar date in `tz`, dropping
    /// anything outside the grid's month.
    pub fn group<Tz: TimeZone>(grid: &MonthGrid, appointments: &'a [A], tz: &Tz) -> Self {
        let mut by_day: BTreeMap<u32, Vec<&'a A>> = BTreeMap::new();

        for appointment in appointments {
            let local = appointment.date().with_timezone(tz);
            if local.year() == grid.year() && local.month() == grid.month() {
                by_day.entry(local.day()).or_default().push(appointment);
            }
        }
        for day in by_day.values_mut() {
            day.sort_by_key(|appointment| appointment.date());
        }

        Self { by_day }
    }

    pub fn on_day(&self, day: u32) -> &[&'a A] {
        self.by_day
            .get(&day)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// Renders a month as an HTML table with the appointments of each day.
#[derive(Debug, Clone)]
pub struct CalendarRenderer<Tz: TimeZone> {
    tz: Tz,
    visibility: CalendarVisibility,
}

impl<Tz: TimeZone> CalendarRenderer<Tz> {
    pub fn new(tz: Tz, visibility: CalendarVisibility) -> Self {
        Self { tz, visibility }
    }

    pub fn tz(&self) -> &Tz {
        &self.tz
    }

    /// Returns the markup for `year`/`month`, or `None` for a month that does
    /// not exist.
    ///
    /// `appointments` should be the result of a single range read for the
    /// month (see [`MonthGrid::utc_bounds`]); entries outside it are ignored.
    pub fn render_month<A: Scheduled>(
        &self,
        year: i32,
        month: u32,
        appointments: &[A],
    ) -> Option<String> {
        let grid = MonthGrid::new(year, month)?;
        let month_appointments = MonthAppointments::group(&grid, appointments, &self.tz);

        let mut html = String::with_capacity(4096);
        html.push_str(r#"<table border="0" cellpadding="0" cellspacing="0" class="calendar">"#);
        html.push('\n');

        let month_name = MONTH_NAMES[grid.month() as usize - 1];
        let _ = writeln!(
            html,
            r#"<tr><th colspan="7" class="month">{month_name} {}</th></tr>"#,
            grid.year()
        );

        html.push_str("<tr>");
        for (class, name) in WEEKDAYS {
            let _ = write!(html, r#"<th class="{class}">{name}</th>"#);
        }
        html.push_str("</tr>\n");

        for week in grid.weeks() {
            html.push_str("<tr>");
            for (weekday, &day) in week.iter().enumerate() {
                self.format_day(&mut html, day, WEEKDAYS[weekday].0, &month_appointments);
            }
            html.push_str("</tr>\n");
        }

        html.push_str("</table>\n");
        Some(html)
    }

    fn format_day<A: Scheduled>(
        &self,
        html: &mut String,
        day: u32,
        class: &str,
        appointments: &MonthAppointments<'_, A>,
    ) {
        if day == SENTINEL {
            html.push_str(r#"<td class="noday"></td>"#);
            return;
        }

        let _ = write!(html, r#"<td class="{class}"><span class="date">{day}</span><ul>"#);
        for appointment in appointments.on_day(day) {
            let label = match self.visibility {
                CalendarVisibility::Redacted => REDACTED_LABEL.to_owned(),
                CalendarVisibility::Detailed => tera::escape_html(appointment.description()),
            };
            let _ = write!(html, "<li>{label}</li>");
        }
        html.push_str("</ul></td>");
    }
}
