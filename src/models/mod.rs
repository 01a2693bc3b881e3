pub mod address;
pub mod analytics;
pub mod driver;
pub mod notification;
pub mod package;
pub mod route;
pub mod user;
