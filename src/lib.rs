//! Terminal 3-D scatter of chargepol lightning charge layers over a Braille map.

pub mod app;
pub mod braille;
pub mod config;
pub mod data;
pub mod error;
pub mod event;
pub mod map;
pub mod ui;
