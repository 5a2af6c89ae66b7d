//! # Scorecard Sync
//!
//! Runtime half of the offline-tolerant scorecard: persistence, connectivity
//! tracking and remote submission around the pure `scorecard-engine` core.
//!
//! - [`store`]: key-value storage (`SqliteKvStore` on device, `MemoryKvStore`
//!   for ephemeral use and tests)
//! - [`loader`]: reads a round's scorecard, upgrading legacy blobs in place
//! - [`persister`]: debounced writes of the scorecard with a save indicator
//! - [`network`]: online/offline state and transition broadcasts
//! - [`router`]: sends a finalized hole to the API or the offline queue
//! - [`queue`] and [`drainer`]: the durable queue and its automatic drain
//! - [`session`]: a round being scored, wiring the above together

pub mod config;
pub mod drainer;
pub mod error;
pub mod loader;
pub mod network;
pub mod persister;
pub mod queue;
pub mod remote;
pub mod router;
pub mod session;
pub mod store;

pub use config::{ConfigError, SyncConfig};
pub use drainer::{drain_with_remote, QueueDrainer};
pub use error::{SyncError, SyncResult};
pub use loader::ScorecardLoader;
pub use network::{ConnectivitySource, HttpConnectivity, NetworkMonitor, Subscription};
pub use persister::{DebouncedPersister, SaveStatus};
pub use queue::OfflineQueue;
pub use remote::{HttpScoresClient, RemoteError, RemoteScores};
pub use router::{FinalizeOutcome, SubmissionRouter};
pub use session::ScorecardSession;
pub use store::{KvStore, MemoryKvStore, SharedKvStore, SqliteKvStore, StorageError};
