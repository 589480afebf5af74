mod settings;

pub use settings::{ApiConfig, Settings, load_settings};
