use crate::error::LoadError;
use crate::source::LoadReport;
use async_trait::async_trait;

#[async_trait]
pub trait RecordSource {
    /// Fetches and decodes every transaction row the source holds.
    async fn load(&self) -> Result<LoadReport, LoadError>;

    /// Human-readable identifier for logs.
    fn describe(&self) -> String;
}
