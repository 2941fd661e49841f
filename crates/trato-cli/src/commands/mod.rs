pub mod auth;
pub mod chat;
pub mod common;
pub mod completions;
pub mod config;
pub mod conversations;
pub mod proposal;
