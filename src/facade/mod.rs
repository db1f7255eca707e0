pub mod writer;

pub use writer::{BulkCreateOptions, BulkWriter};
