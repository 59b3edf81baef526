// Telemetry relay: one sensor device in, many dashboards out, bounded history in between
pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod presentation;

pub use application::relay::{spawn_relay, Relay, RelayEvent, RelayHandle};
pub use domain::history::{HistoryBuffer, HistorySnapshot};
pub use domain::telemetry::{Reading, Sample};
pub use presentation::app_state::AppState;
pub use presentation::router::build_router;
