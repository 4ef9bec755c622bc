//! Time tracking against a CSV log kept inside a note.
//!
//! The note body is the only authoritative state. Every scan re-derives the
//! running tasks, completed aggregates, and autocomplete lists from it.

pub mod io;
pub mod model;
pub mod ops;
pub mod parse;
pub mod tracker;
