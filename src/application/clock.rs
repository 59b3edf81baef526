// Time source for server-assigned sample timestamps

/// Produces the `captured_at` value for each ingested sample.
/// Device-side time is never used.
pub trait Clock: Send {
    fn timestamp(&self) -> String;
}
