//! # RAG Assistant
//!
//! A command-line client for a remote retrieval-augmented-generation (RAG)
//! service. Documents are ingested (PDF upload or pasted text) and then
//! queried conversationally; retrieval, embedding and generation all happen
//! on the server.
//!
//! ## Architecture
//!
//! ```text
//!                 ┌───────────────────────────────┐
//!                 │            Session            │
//!                 │  workflow · status · health   │
//!                 └──┬──────────┬──────────┬──────┘
//!                    ▼          ▼          ▼
//!          ┌──────────────┐ ┌────────┐ ┌─────────────────┐
//!          │  Ingestion   │ │ Paste  │ │ QueryDispatcher │──▶ ChatTranscript
//!          │  Pipeline    │ │  form  │ └────────┬────────┘
//!          └──────┬───────┘ └────────┘          │
//!                 ▼                             ▼
//!          ┌────────────────────────────────────────────┐
//!          │       RagBackend (HTTP via reqwest)        │
//!          │  /health · /api/indexing/pdf · /api/...    │
//!          └────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! rag health                              # is the server reachable?
//! rag upload handbook.pdf policy.pdf      # index PDFs
//! rag ask "What is the refund policy?"    # one question
//! rag chat                                # interactive session
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Wire and domain data types |
//! | [`error`] | Transport and domain errors |
//! | [`backend`] | RAG service transport seam |
//! | [`health`] | Connection monitor and health signal |
//! | [`ingest`] | Batched PDF ingestion |
//! | [`paste`] | Pasted-text submission |
//! | [`query`] | Conversational query dispatch |
//! | [`transcript`] | Append-only chat log |
//! | [`session`] | Top-level workflow state |
//! | [`progress`] | Ingestion progress reporting |
//! | [`render`] | Plain-text views |
//! | [`shell`] | Interactive `rag chat` loop |

pub mod backend;
pub mod config;
pub mod error;
pub mod health;
pub mod ingest;
pub mod models;
pub mod paste;
pub mod progress;
pub mod query;
pub mod render;
pub mod session;
pub mod shell;
pub mod transcript;
