pub mod catalog;

pub use catalog::SqliteCatalog;
