pub mod api;
pub mod config;
pub mod events;
pub mod persona;
pub mod task;
