pub mod clipboard;
pub mod ws;

pub use clipboard::{CommandClipboard, SystemClipboard, system_clipboard};
pub use ws::{WsConnection, WsHost, connect};
