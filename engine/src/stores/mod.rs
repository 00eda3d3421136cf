//! Store implementations.
//!
//! The engine ships an in-memory operation store suitable for tests and for
//! embedding in a single-process deployment. Database-backed stores live in
//! the embedding application and implement the same
//! [`crate::providers::OperationStore`] trait.

pub mod memory;

pub use memory::InMemoryOperationStore;
