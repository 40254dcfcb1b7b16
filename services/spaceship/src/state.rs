use groundlink_stream::{SessionRegistry, StreamResult};

use crate::config::Config;

pub struct AppState {
    pub config: Config,
    pub registry: SessionRegistry,
}

impl AppState {
    pub fn new(config: Config) -> StreamResult<Self> {
        let registry = SessionRegistry::new(config.max_concurrent_streams, config.session.clone())?;
        Ok(AppState { config, registry })
    }
}
