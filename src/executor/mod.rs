pub mod insert;

pub use insert::BulkInsertExecutor;
