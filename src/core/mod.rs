//! Core data structures: demand series, forecasts and calendar arithmetic.

pub mod calendar;
pub mod forecast;
pub mod series;

pub use calendar::{align_to_period, date_range, future_periods, next_period, HolidayCalendar};
pub use forecast::Forecast;
pub use series::DemandSeries;
