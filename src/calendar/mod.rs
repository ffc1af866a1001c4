//! Google Calendar access: calendars and events.

pub mod client;
pub mod models;

pub use client::{CalendarApi, CalendarClient};
pub use models::{parse_event_date_time, parse_recurrence};
