//! Mock collaborator implementations for testing.
//!
//! Every provider trait has an in-memory mock here. The mocks record the
//! calls made against them so tests can assert on notification behavior.
//!
//! **WARNING**: Do NOT use these in production. They are for testing only!

pub mod anti_fraud;
pub mod data_adapter;
pub mod enablement;
pub mod signature;

pub use anti_fraud::MockAntiFraud;
pub use data_adapter::MockDataAdapter;
pub use enablement::MockEnablementStore;
pub use signature::MockSignatureVerifier;
