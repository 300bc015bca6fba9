//! # Case Context Core
//!
//! Shared, I/O-free logic for Case Context: byte decoding, bilingual keyword
//! extraction, relevance scoring, and budget-bounded context assembly.
//!
//! This crate never touches the filesystem or a clock. The application crate
//! discovers files, reads their bytes, and owns the snapshot cache. Everything
//! here is a pure function of its inputs.
//!
//! ```text
//! bytes ──▶ decode ──▶ keywords ──▶ score ──▶ assemble ──▶ context string
//! ```

pub mod assemble;
pub mod decode;
pub mod error;
pub mod keywords;
pub mod models;
pub mod score;
