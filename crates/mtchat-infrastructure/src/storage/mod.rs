pub mod config_storage;
pub mod session_store;

pub use config_storage::{ConfigStorage, ConfigStorageError};
pub use session_store::{CookiePolicy, CookieSessionStore, MemoryTokenStore, cookie_value};
