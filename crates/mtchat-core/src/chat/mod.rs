//! Chat hand-off primitives: room ids, chat-service links and the loader page.

pub mod id;
pub mod links;
pub mod loader;

pub use id::{ChatId, generate_chat_id};
pub use links::{ChatLinks, ChatSession, DEFAULT_CHAT_BASE_URL};
pub use loader::{AUTO_OPEN_DELAY, LOADER_PATH, LoaderLink, LoaderParams};
