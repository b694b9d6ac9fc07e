//! # cast-index
//!
//! Incremental full-text indexing and search for terminal session
//! recordings.
//!
//! cast-index watches a directory of timestamped event logs (optionally
//! gzip-compressed), maintains a versioned full-text index of their
//! textual content in SQLite, and answers substring/phrase queries
//! filtered by tag and date range, deduplicated within configurable time
//! windows.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────┐   ┌───────────┐
//! │  Discovery  │──▶│ Transactional│──▶│  SQLite   │
//! │ .cast / .gz │   │   Indexer    │   │ FTS5+meta │
//! └─────────────┘   └──────┬───────┘   └─────┬─────┘
//!                          │                 │
//!                   ┌──────┴──────┐    ┌─────┴─────┐
//!                   │  Extractor  │    │   Query   │
//!                   │ gunzip+strip│    │  Engine   │
//!                   └─────────────┘    └───────────┘
//! ```
//!
//! Each (artifact, strategy) pair is processed inside one transaction:
//! catalog refresh, fragment rewrite, and strategy completion either all
//! commit or all roll back, so a crash can never leave partial fragments
//! attributed to a completed recording.
//!
//! ## Quick Start
//!
//! ```bash
//! cdx init                          # create database
//! cdx reindex                       # index new and changed recordings
//! cdx search "cargo build" --tag work --window 10
//! cdx stats                         # index overview
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`extract`] | Event decoding and control-sequence stripping |
//! | [`catalog`] | Artifact registry and change detection |
//! | [`strategy`] | Versioned indexing strategies |
//! | [`indexer`] | Transactional reindex passes |
//! | [`search`] | Full-text query engine |
//! | [`stats`] | Index statistics |
//! | [`db`] | Database handle and version markers |
//! | [`migrate`] | Schema migrations |

pub mod catalog;
pub mod config;
pub mod db;
pub mod extract;
pub mod indexer;
pub mod migrate;
pub mod models;
pub mod search;
pub mod stats;
pub mod strategy;
