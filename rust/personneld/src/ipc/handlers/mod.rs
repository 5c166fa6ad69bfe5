pub mod admin;
pub mod auth;
pub mod book;
pub mod core;
pub mod form;
pub mod setup;
pub mod uploads;
