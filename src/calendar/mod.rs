//! Month calendar with an appointment overlay.
//!
//! The grid is Monday-first. Slots outside the month carry the sentinel day
//! `0` and render as empty cells so every week row has seven columns.

mod grid;
mod render;

pub use grid::{MonthGrid, Week, SENTINEL};
pub use render::{
    CalendarRenderer, CalendarVisibility, MonthAppointments, Scheduled, REDACTED_LABEL,
};
