pub mod card_company;
pub mod category;
pub mod file;
pub mod transaction;
pub mod user;

pub use card_company::{CardCompany, IssuerCode};
pub use category::Category;
pub use file::FileRecord;
pub use transaction::Transaction;
pub use user::{User, UserResponse};
