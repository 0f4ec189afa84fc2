//! UI module - plain-text rendering of the explorer views
//!
//! Views are built by the app module; everything here only formats them.

pub mod components;
