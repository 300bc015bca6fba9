//! # Case Context
//!
//! Historical-reference retrieval and prompt-context assembly.
//!
//! Given a folder tree of prior reference documents (text and markdown,
//! saved in whatever encoding their authors' editors used) and a new
//! free-text case description, Case Context selects the most relevant
//! prior material and packs it into one length-bounded context string for
//! an external prompt composer.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐   ┌────────────┐   ┌──────────────┐
//! │  Scanner  │──▶│  Decode +  │──▶│ ContextCache │
//! │ (walkdir) │   │  Keywords  │   │ (per root)   │
//! └───────────┘   └────────────┘   └──────┬───────┘
//!                                         │ snapshot
//!                        query ──▶ score ─┴─▶ assemble ──▶ context
//!                                         │
//!                      ┌──────────────────┤
//!                      ▼                  ▼
//!                 ┌──────────┐      ┌──────────┐
//!                 │   CLI    │      │   HTTP   │
//!                 │(casectx) │      │  (axum)  │
//!                 └──────────┘      └──────────┘
//! ```
//!
//! The algorithms (decoding, keyword extraction, scoring, assembly) live in
//! the I/O-free `case-context-core` crate; this crate adds the filesystem,
//! caching, configuration and the CLI/HTTP surfaces.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`scanner`] | Corpus discovery and document loading |
//! | [`cache`] | Per-root snapshot cache with TTL |
//! | [`retrieve`] | Query path: score and assemble |
//! | [`search`] | `casectx search` |
//! | [`context`] | `casectx context` |
//! | [`stats`] | Corpus statistics and scan listing |
//! | [`server`] | JSON HTTP server |
//! | [`telemetry`] | Tracing subscriber setup |

pub mod cache;
pub mod config;
pub mod context;
pub mod retrieve;
pub mod scanner;
pub mod search;
pub mod server;
pub mod stats;
pub mod telemetry;
