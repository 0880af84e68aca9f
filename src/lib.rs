pub mod arena;
pub mod board;
pub mod bot;
pub mod config;
pub mod game;
pub mod heuristics;
pub mod web;

pub use arena::*;
pub use board::*;
pub use bot::*;
pub use config::*;
pub use game::*;
pub use heuristics::*;
