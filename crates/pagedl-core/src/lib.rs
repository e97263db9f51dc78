pub mod config;
pub mod logging;

pub mod aggregator;
pub mod clipboard;
pub mod error;
pub mod fs_host;
pub mod host;
pub mod message;
pub mod request;
pub mod resource;
pub mod retry;
pub mod service;
pub mod submitter;
pub mod tracker;
