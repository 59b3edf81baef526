// Application state for HTTP handlers
use crate::application::relay::RelayHandle;
use std::path::PathBuf;

#[derive(Clone)]
pub struct AppState {
    pub relay: RelayHandle,
    pub static_dir: PathBuf,
    pub client_queue_capacity: usize,
}

impl AppState {
    pub fn new(relay: RelayHandle, static_dir: PathBuf, client_queue_capacity: usize) -> Self {
        Self {
            relay,
            static_dir,
            client_queue_capacity,
        }
    }
}
