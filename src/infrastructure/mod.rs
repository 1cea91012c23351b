// Infrastructure layer - External dependencies and adapters
pub mod chart_document;
pub mod config;
pub mod diagnostics;
pub mod gist_store;
pub mod portal_source;
pub mod webdriver;
