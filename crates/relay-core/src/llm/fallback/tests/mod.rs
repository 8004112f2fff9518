//! Fallback chain tests

mod complete;
