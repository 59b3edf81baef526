// Domain layer - Telemetry samples and the bounded history store
pub mod history;
pub mod telemetry;
