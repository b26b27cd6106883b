pub mod chat_panel;
pub mod chrome;
pub mod header;
pub mod intro;
pub mod launcher;
pub mod status_bar;
