//! Read-only Gmail access: message search and retrieval.

pub mod client;
pub mod models;
pub mod truncate;

pub use client::{GmailApi, GmailClient};
pub use truncate::truncate_bodies;
