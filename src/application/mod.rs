// Application layer - Relay actor and connection fan-out
pub mod clock;
pub mod connection;
pub mod error;
pub mod relay;
