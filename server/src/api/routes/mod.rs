//! API route handlers

pub mod applications;
pub mod auth;
pub mod health;
pub mod loans;
pub mod payments;
pub mod users;
