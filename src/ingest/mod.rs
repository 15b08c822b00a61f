pub mod pipeline;
pub mod relay_client;
pub mod source;

pub use pipeline::IngestionLoop;
pub use relay_client::RelayClient;
pub use source::{HttpPageSource, PageSnapshot, SnapshotSource, StaticSource};
