pub mod blob_store;
pub mod relay;

pub use blob_store::{
    BlobPutFuture, BlobStore, BlobStoreConfig, DEFAULT_BLOB_API_URL, HttpBlobStore, UploadError,
};
pub use relay::{AttachmentReference, AttachmentRelay};
