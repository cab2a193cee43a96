//! Segment storage for the Roster segment engine
//!
//! This crate stores segment definitions (a named contact rule group) and
//! the ongoing emails attached to them, behind one interface with several
//! backends.
//!
//! # Features
//!
//! - **File System Repository**: one YAML file per segment
//! - **PostgreSQL Repository**: `segments` and `segment_ongoing_emails` tables
//!   (feature `postgres`)
//! - **Memory Repository**: for tests and demos
//! - **Async API**: Non-blocking I/O operations with Tokio
//!
//! # Quick Start
//!
//! ```no_run
//! use roster_repository::{RepositoryConfig, SegmentRepository};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let repo = RepositoryConfig::file_system("segments").open().await?;
//!
//!     for segment in repo.list_segments().await? {
//!         println!("{}: {}", segment.id, segment.name);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────┐
//! │   Synchronizer / Segment service       │
//! └──────────────┬─────────────────────────┘
//!                │ SegmentRepository / WritableSegmentRepository
//!       ┌────────┼─────────────┐
//!       ↓        ↓             ↓
//! ┌──────────┐ ┌────────────┐ ┌────────┐
//! │ YAML     │ │ PostgreSQL │ │ Memory │
//! └──────────┘ └────────────┘ └────────┘
//! ```

pub mod config;
pub mod error;
pub mod file_system;
pub mod memory;
pub mod models;
pub mod traits;

#[cfg(feature = "postgres")]
pub mod postgres;

// Re-exports - Configuration
pub use config::{ConfigError, RepositoryConfig, RepositorySource};

// Re-exports - Error
pub use error::{RepositoryError, RepositoryResult};

// Re-exports - Repositories
pub use file_system::FileSystemSegmentRepository;
pub use memory::MemorySegmentRepository;
pub use models::{EmailTrigger, Segment, SegmentOngoingEmail};
pub use traits::{SegmentRepository, WritableSegmentRepository};

#[cfg(feature = "postgres")]
pub use postgres::PostgresSegmentRepository;
