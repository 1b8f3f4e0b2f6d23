pub mod migration;
mod session_storage;

pub use session_storage::{SessionStorage, StorageError};
