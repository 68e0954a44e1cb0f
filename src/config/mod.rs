mod apply;
mod loader;
mod types;

pub use apply::build_config;
pub use loader::load_config;
pub use types::{AgentConfig, AuthToken, ConfigFile};
