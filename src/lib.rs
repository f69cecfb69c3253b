pub mod config;
pub mod diagnostics;
pub mod input;
pub mod model;
pub mod motion;
pub mod persistence;
pub mod profile;
pub mod selection;
pub mod ui;
