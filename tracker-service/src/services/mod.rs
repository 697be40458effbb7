pub mod classifier;
pub mod database;
pub mod gmail;
pub mod ingest;
pub mod jwt;
pub mod providers;
pub mod spreadsheet;

pub use classifier::Categorizer;
pub use database::Database;
pub use ingest::{IngestService, IngestSummary, UploadMeta};
pub use jwt::JwtService;
