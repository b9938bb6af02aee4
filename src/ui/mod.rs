//! # UI Module
//!
//! Styling for the scanner window. The view itself lives in `app`.

pub mod styles;
