//! One-shot content-addressed file store and the response externalization
//! pipeline that feeds it (spec §4.6, §4.7).

pub mod error;
pub mod externalize;
pub mod mime;
pub mod store;

pub use error::StoreError;
pub use externalize::{externalize, ExternalizerConfig, DEFAULT_MAX_BYTES};
pub use store::{FileStore, StoredMeta};
