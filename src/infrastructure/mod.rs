// Infrastructure layer - External dependencies and adapters
pub mod clock;
pub mod config;
pub mod protocol;
pub mod ws_connection;
