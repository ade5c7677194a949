//! lectern - answers questions about course materials with tool-driven
//! retrieval
//!
//! This crate provides:
//! - A parser and chunker for structured course documents
//! - A dual-collection vector index (course catalog + content chunks) with
//!   fuzzy course-name resolution
//! - A retrieval tool surfaced to an LLM that decides for itself when to
//!   search, and the generation loop that drives it

pub mod chunk;
pub mod commands;
pub mod config;
pub mod embed;
pub mod engine;
pub mod error;
pub mod index;
pub mod llm;
pub mod models;
pub mod parse;
pub mod session;
pub mod tools;

pub use config::Config;
pub use error::{Error, Result};
