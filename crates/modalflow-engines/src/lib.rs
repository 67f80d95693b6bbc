//! # Modalflow Engines
//!
//! Processing engine implementations.
//!
//! This crate provides:
//! - LendingEngine: per-intent routing over a LendingService capability trait
//! - TextGenerationEngine: generic LLM-backed TEXT -> TEXT engine
//! - InMemoryLendingService: seeded demo catalog for development and tests

mod lending;
mod text_gen;

pub use lending::{
    BorrowRequest, CatalogItem, InMemoryLendingService, LendingEngine, LendingError,
    LendingService, ReturnRequest,
};
pub use text_gen::TextGenerationEngine;
