//! Entity module - SeaORM entity definitions
//!
//! One table: the flat menu collection.

pub mod menu;
