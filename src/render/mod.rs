pub mod coordinator;
pub mod request;
pub mod studio;
