mod constants;
mod settings;

pub use constants::*;
pub use settings::{load_settings, DiagnosticsSettings, StorageSettings};
