mod cli;
mod parsers;

pub use cli::AgentArgs;
pub use parsers::parse_device_attribute;
