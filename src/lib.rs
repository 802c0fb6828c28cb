pub mod arena;
pub mod config;
pub mod entity;
pub mod error;
pub mod game;
pub mod generation;
pub mod logging;
pub mod observation;
pub mod render;
pub mod types;
pub mod utils;
