pub mod resolve;
pub mod store;

pub use resolve::{DirectoryResolver, is_writable_dir, resolve_directory};
pub use store::{IndicatorStore, StoreError, ensure_directory};
