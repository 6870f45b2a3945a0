pub mod state;

pub use state::{
    ComposeSettings, SecretGuardSettings, SettingsError, SettingsResult, SettingsStore,
};
