//! State module for tracking batch progress
//!
//! # Components
//!
//! - `CountryState`: per-country state machine within one run
//! - `ScrapeProgress`: the resumable snapshot persisted between runs

mod country_state;
mod progress;

// Re-export main types
pub use country_state::CountryState;
pub use progress::ScrapeProgress;
