// Domain layer - Samples, timezones and chart data
pub mod chart;
pub mod sample;
pub mod timezone;
