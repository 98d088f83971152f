//! Companion — terminal chat assistant with a typing reveal.

pub mod chat;
pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod llm;
pub mod screens;
pub mod store;
