//! Low-stock alerting: the debounced scanner, its notifiers and the periodic runner.

pub mod notifier;
pub mod runner;
pub mod scanner;

#[cfg(feature = "redis")]
pub use notifier::RedisNotifier;
pub use notifier::{InMemoryNotifier, LogNotifier, Notification, Notifier, NotifyError};
pub use runner::{LowStockRunner, LowStockRunnerHandle};
pub use scanner::{LowStockScanner, ScanError, ScanOutcome};
