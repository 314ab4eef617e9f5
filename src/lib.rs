//! # Docket
//!
//! Group-scoped document ingestion and retrieval-augmented question
//! answering.
//!
//! Docket ingests documents into per-group corpora, splits them into
//! overlapping text chunks, embeds each chunk, and answers natural-language
//! questions by retrieving the nearest chunks for the asking group and
//! grounding a generative model on them.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐   ┌──────────────────┐   ┌──────────┐
//! │ Documents │──▶│  Ingest Worker    │──▶│  SQLite   │
//! │ (pdf/txt) │   │ Extract+Chunk+    │   │ chunks +  │
//! └───────────┘   │ Embed (per doc)  │   │ vectors   │
//!                 └──────────────────┘   └────┬─────┘
//!                                             │
//!                       ┌─────────────────────┤
//!                       ▼                     ▼
//!                 ┌───────────┐        ┌───────────┐
//!                 │ Retrieval │───────▶│  Answer    │
//!                 │  (top-k)  │        │ Synthesis  │
//!                 └───────────┘        └───────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! docket init                                   # create database
//! docket ingest --group g1 --file notes.txt \
//!     --content-type text/plain                 # ingest one document
//! docket ask --group g1 "What do the notes say?"
//! docket serve                                  # start the HTTP API
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`chunk`] | Sliding-window text chunking |
//! | [`extract`] | Plain-text extraction (txt, pdf, docx) |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`generation`] | Generative provider abstraction |
//! | [`store`] | Document/chunk storage and vector search |
//! | [`ingest`] | Per-document ingestion pipeline |
//! | [`worker`] | Background ingestion queue |
//! | [`retrieve`] | Group-scoped nearest-chunk retrieval |
//! | [`answer`] | Grounded answer synthesis |
//! | [`server`] | HTTP API |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod answer;
pub mod chunk;
pub mod config;
pub mod db;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod generation;
pub mod ingest;
pub mod migrate;
pub mod models;
pub mod retrieve;
pub mod server;
pub mod store;
pub mod worker;
