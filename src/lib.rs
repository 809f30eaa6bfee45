//! Bookshelf application library
//!
//! Wires the book catalog module onto the kernel, db and http crates.

pub mod bootstrap;
pub mod modules;

pub use bootstrap::{migrate, serve, App};
