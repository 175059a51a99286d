mod clipboard;
mod command;
mod events;
mod screen;
mod storage;

pub use clipboard::{ClipboardError, ClipboardSink, FallbackClipboard};
pub use command::{Command, Host, HostCommands, HostError};
pub use events::{EventBus, EventName, HostEvent, Listener};
pub use screen::{Screen, ScreenMetrics, SharedScreen};
pub use storage::{
    JsonFileStore, LocalStore, MemoryStore, OPTIMIZE_REQUEST_KEY, SELECTED_TEXT_KEY, StorageError,
};
