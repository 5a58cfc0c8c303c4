//! Lookup orchestration subsystem
//!
//! # Components
//! - `classifier.rs`: raw string -> typed, normalized indicator
//! - `keypool.rs`: provider credential rotation and quota windows
//! - `provider.rs`: outbound threat-intel client (VirusTotal v3 shape)
//! - `normalizer.rs`: vendor response -> canonical verdict model
//! - `store.rs`: persistence contract with identity uniqueness
//! - `orchestrator.rs`: cache-first dispatch tying the above together

pub mod classifier;
pub mod keypool;
pub mod normalizer;
pub mod orchestrator;
pub mod provider;
pub mod store;

pub use classifier::{classify, ClassificationError};
pub use keypool::{DispatchOutcome, KeyPool, RateLimits};
pub use orchestrator::{LookupError, LookupOrchestrator, LookupPolicy, ScanSummary};
pub use provider::{IntelProvider, VirusTotalProvider};
pub use store::{PgRecordStore, RecordStore, StoreError};
