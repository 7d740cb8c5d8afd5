//! End-to-end tests at the HTTP request/response level.
//!
//! Each test file covers one route or failure scenario, running the full
//! router against a mock identity provider.

#![cfg(test)]

mod helpers;
