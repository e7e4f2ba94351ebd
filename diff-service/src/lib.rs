//! diff-service: compares two JSON objects stored in a bucket using a
//! generative model and deletes them once the comparison is done.
pub mod config;
pub mod dtos;
pub mod handlers;
pub mod services;
pub mod startup;
