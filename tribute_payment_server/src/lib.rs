//! # Tribute payment server
//! This crate hosts the HTTP surface of the payment subsystem. It is responsible for:
//! Listening for incoming webhook events from Tribute and verifying their signatures.
//! Creating orders against the Tribute shop API and handing back payment links.
//! Answering order status queries, polling Tribute when the local record is still pending.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/api/tribute/create-order`: Creates a Tribute order for a token package.
//! * `/api/tribute/order/{uuid}/status`: Returns the order status, reconciling against Tribute if needed.
//! * `/api/tribute/webhook`: The HMAC-protected webhook endpoint for Tribute payment events.

pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;

pub mod helpers;
pub mod integrations;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod webhook_routes;

#[cfg(test)]
mod endpoint_tests;
