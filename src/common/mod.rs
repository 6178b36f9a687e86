pub mod commands;
pub mod events;
pub mod types;

pub use commands::NetworkCommand;
pub use events::ViewEvent;
pub use types::{ChatMessage, NewMessage, Order};
