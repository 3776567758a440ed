mod pool_settings;
mod secret;
mod settings;
pub mod uri;

pub use pool_settings::PoolSettings;
pub use secret::Secret;
pub use settings::{ExecutionSettings, FilterSettings};
pub use uri::ConnectionUri;
