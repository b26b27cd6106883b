pub mod coordinator;
pub mod deferred;
pub mod keyboard;
pub mod storage;

pub use coordinator::{ChatCoordinator, ChatSnapshot};
pub use keyboard::{KeyListeners, KeyOutcome, KeyboardRouter};
