pub mod auth;
pub mod card_companies;
pub mod categories;
pub mod files;
pub mod gmail;
pub mod health;
pub mod transactions;
pub mod users;
