pub mod handler;
pub mod mime;
pub mod store;

pub use handler::serve_asset;
pub use store::{AssetStore, ResolvedPath, StoredFile};
