use groundlink_control::SessionControl;
use groundlink_ingest::{IngestionLoop, PacketBuffer, WindowScheduler};
use std::sync::Arc;

use crate::config::Config;

pub struct AppState {
    pub config: Config,
    pub control: Arc<dyn SessionControl>,
    pub buffer: Arc<dyn PacketBuffer>,
    pub scheduler: WindowScheduler,
}

impl AppState {
    /// The buffer and control client are built by the caller and shared with
    /// every scheduled ingestion run.
    pub fn new(
        config: Config,
        control: Arc<dyn SessionControl>,
        buffer: Arc<dyn PacketBuffer>,
    ) -> Self {
        let ingestion = IngestionLoop::new(
            Arc::clone(&control),
            Arc::clone(&buffer),
            config.ingest.clone(),
        );
        AppState {
            config,
            control,
            buffer,
            scheduler: WindowScheduler::new(ingestion),
        }
    }
}
