pub mod auth;
pub mod reference;
pub mod transactions;
pub mod users;
