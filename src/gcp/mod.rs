//! GCP API interaction module
//!
//! This module provides the core functionality for talking to the Compute
//! Engine API: authentication, the HTTP client, typed payloads, and the
//! identifier utilities shared by the resource tasks.
//!
//! # Module Structure
//!
//! - [`auth`] - GCP authentication using Application Default Credentials
//! - [`client`] - Main GCP client for making API requests
//! - [`http`] - HTTP utilities for REST API calls
//! - [`compute`] - Typed Compute Engine payloads and call helpers
//! - [`operation`] - Blocking completion poller for zone operations
//! - [`urls`] - Canonical resource URL building, parsing, and shortening
//! - [`scopes`] - Access-scope alias table

pub mod auth;
pub mod client;
pub mod compute;
pub mod http;
pub mod operation;
pub mod scopes;
pub mod urls;
