//! # Modalflow Stores
//!
//! Storage implementations for the Modalflow runtime.
//!
//! This crate provides:
//! - TaskRepository implementations (InMemory)

mod task_repo;

pub use task_repo::InMemoryTaskRepository;

// Re-export core traits for convenience
pub use modalflow_core::repository::{StoreError, TaskRepository};
