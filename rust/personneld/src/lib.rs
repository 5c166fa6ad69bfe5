pub mod auth;
pub mod book;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod db;
pub mod ipc;
pub mod roster;
pub mod uploads;
