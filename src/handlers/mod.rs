//! Request handlers module

pub mod menu;
