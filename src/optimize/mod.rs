//! Optimization methods
//!
//! Searches over position parameters by simulating each candidate against
//! the recorded pool history.
pub mod range_search;
