#![deny(unsafe_code)]

pub mod bus;
pub mod compose;
pub mod logging;
pub mod settings;

pub use bus::{BusError, EventBus};
pub use compose::{ComposeContext, ComposeError, ComposeSession};
pub use notecraft_drafts as drafts;
pub use settings::{ComposeSettings, SettingsStore};
