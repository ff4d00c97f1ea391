pub mod lake;

pub use lake::{LakeFileClient, StorageError};
