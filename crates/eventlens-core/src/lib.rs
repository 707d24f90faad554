//! Core types: events, calendar map, token clock, tracing

pub mod calendars;
pub mod event;
pub mod time;
pub mod tracing;

pub use calendars::{CalendarEntry, CalendarMap};
pub use event::Event;
pub use time::{
    Clock, FixedClock, SystemClock, TOKEN_LIFETIME_MINUTES, expiration_from, is_expired,
};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
