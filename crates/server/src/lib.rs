//! Sellor marketplace server library.
//!
//! The JSON API behind vendor storefronts, vendor tools, the admin panel,
//! checkout with Stripe Connect, and Stripe webhook reconciliation. Exposed
//! as a library so the binary, the CLI, and tests share one implementation.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod openai;
pub mod routes;
pub mod services;
pub mod state;
pub mod stripe;
