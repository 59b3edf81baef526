// Wall clock for sample timestamps
use crate::application::clock::Clock;
use chrono::format::{Item, StrftimeItems};
use chrono::Local;
use std::fmt::Write;

/// Formats local time with a strftime pattern.
#[derive(Debug, Clone)]
pub struct LocalClock {
    format: String,
}

impl LocalClock {
    pub fn new(format: impl Into<String>) -> anyhow::Result<Self> {
        let format = format.into();
        if StrftimeItems::new(&format).any(|item| matches!(item, Item::Error)) {
            anyhow::bail!("invalid timestamp format: {}", format);
        }
        Ok(Self { format })
    }
}

impl Clock for LocalClock {
    fn timestamp(&self) -> String {
        let now = Local::now();
        let mut out = String::new();
        if write!(out, "{}", now.format(&self.format)).is_err() {
            return now.to_rfc3339();
        }
        out
    }
}
