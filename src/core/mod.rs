pub mod model;
pub mod paths;
pub mod snapshot;
pub mod sqlite;
pub mod store;

pub use model::{metadata, Edge, Metadata, MetadataValue, Node};
pub use snapshot::{JsonSnapshot, Snapshot};
pub use sqlite::SqliteSnapshot;
pub use store::{GraphStore, StoreStats, StoreView};
