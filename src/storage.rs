pub mod fragment;

pub use fragment::{FragmentStore, Saved, StorageError};
