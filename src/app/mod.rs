pub mod config;
pub mod output;
pub mod poster;
pub mod render;
pub mod styling;
pub mod theme;
