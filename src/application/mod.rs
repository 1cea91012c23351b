// Application layer - Use cases and the ports they drive
pub mod chart_service;
pub mod chart_writer;
pub mod collection_service;
pub mod error;
pub mod sample_source;
pub mod series_processor;
pub mod series_store;

#[cfg(test)]
pub mod fakes;
