//! SQLite backend for the order store.
//!
//! This is the default backend. It is selected with the `sqlite` feature.
mod sqlite_impl;

pub mod db;
pub use sqlite_impl::SqliteDatabase;
