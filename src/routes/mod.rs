pub mod friend;
pub mod marker;
pub mod user;
