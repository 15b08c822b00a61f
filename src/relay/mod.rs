pub mod hub;
pub mod server;
pub mod store;

pub use hub::{BroadcastHub, FeedMessage};
pub use server::{router, serve, AppState};
pub use store::RelayStore;
