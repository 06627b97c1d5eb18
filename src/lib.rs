pub mod access;
pub mod admins;
pub mod app;
pub mod auth;
pub mod config;
pub mod console;
pub mod error;
pub mod identity;
mod payload;
pub mod roles;
pub mod state;
pub mod users;
mod validate;

#[cfg(test)]
mod testing;
