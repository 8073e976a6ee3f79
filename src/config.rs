use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Result;
use tracing::debug;

use crate::{
    api::TimeflowApi,
    store::{persistence::JsonFilePersistence, seed::Seed, DocumentStore},
    utils::{
        clock::Clock,
        dir::{create_application_default_path, ensure_dir},
        ids::UuidGenerator,
    },
};

pub const FRAME_INTERVAL: Duration = Duration::from_millis(16);
const LOGS_DIR: &str = "logs";

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub dir: PathBuf,
    pub latency: Duration,
    pub frame_interval: Duration,
    pub seed: Seed,
}

impl AppConfig {
    /// Uses `dir` when given, otherwise the platform state directory. Either way the directory
    /// exists afterwards.
    pub fn resolve(dir: Option<PathBuf>, latency_ms: u64, seed: Seed) -> Result<Self> {
        let dir = match dir {
            Some(dir) => ensure_dir(dir)?,
            None => create_application_default_path()?,
        };
        Ok(Self {
            dir,
            latency: Duration::from_millis(latency_ms),
            frame_interval: FRAME_INTERVAL,
            seed,
        })
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.dir.join(LOGS_DIR)
    }

    pub fn open_api(&self, clock: Arc<dyn Clock>) -> Result<TimeflowApi<JsonFilePersistence>> {
        let persistence = JsonFilePersistence::new(self.dir.clone())?;
        debug!("Opening store at {:?}", persistence.path());
        let store = DocumentStore::open(
            persistence,
            clock.clone(),
            Arc::new(UuidGenerator),
            self.seed,
        )?;
        Ok(TimeflowApi::new(store, clock, self.latency))
    }
}
