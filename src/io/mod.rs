pub mod cache_io;
pub mod journal;
pub mod lock;
pub mod queue;
pub mod vault;
pub mod watcher;

pub use cache_io::{CacheIoError, read_cache, write_cache};
pub use journal::{JournalCategory, JournalEntry, log_journal};
pub use lock::{LockError, VaultLock};
pub use queue::ScanQueue;
pub use vault::{VaultError, discover_vault, load_config};
pub use watcher::{ChangeEvent, Debouncer, VaultWatcher};
