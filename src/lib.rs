pub mod cli;
pub mod config;
pub mod context;
pub mod emit;
pub mod expand;
pub mod export;
pub mod host;
pub mod model;
pub mod report;
pub mod resolve;
pub mod session;

pub use config::{Config, ConfigError, Shell};
pub use context::ContextEnv;
pub use emit::Emitter;
pub use host::{FixedHostname, HostnameSource, SystemHostname};
pub use model::{BaseConfig, ConfigKey, EnvMap, HostMatcher, HostProfile, HostTable};
pub use resolve::{resolve, resolve_with, ResolvedConfig};
pub use session::Session;
