//! # Keyshop server
//! This crate hosts the HTTP server for the Keyshop digital goods store. It is responsible for:
//! * Authenticating buyers and admins with bearer tokens, and checking admin permissions.
//! * Exposing the cart, checkout, order, wallet and resource endpoints to buyers.
//! * Exposing the inventory, catalog, refund and wallet adjustment endpoints to admins.
//! * Receiving payment notifications from the payment provider and handing them to the engine.
//! * Running the background sweepers (expired deliveries, expired deposits and stock sync).
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/api/...`: Authenticated routes. Admin routes live under `/api/admin`.
//! * `/webhooks/sepay` and `/webhooks/deposit`: Payment notifications. These are signed rather than authenticated.

pub mod auth;
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod workers;

#[cfg(test)]
mod endpoint_tests;
