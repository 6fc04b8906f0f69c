pub mod auth;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod handlers;
pub mod invites;
pub mod messages;
pub mod models;
pub mod notify;
pub mod routes;
pub mod scheduler;

#[cfg(test)]
mod tests;
