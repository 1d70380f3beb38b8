//! Shopmate backend: a retrieval-augmented shopping assistant over an
//! ingested product catalog.
//!
//! The crate is organized as:
//! - `catalog`: relational product storage and CSV ingestion
//! - `core`: paths, settings, errors, logging
//! - `llm`: the model backend abstraction and its OpenAI-compatible client
//! - `memory`: bounded per-session conversation memory
//! - `rag`: intent classification, retrieval and answer synthesis
//! - `server`: the HTTP surface
//! - `state`: shared application state and startup wiring

pub mod catalog;
pub mod core;
pub mod llm;
pub mod memory;
pub mod rag;
pub mod server;
pub mod state;
