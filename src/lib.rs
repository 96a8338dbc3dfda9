pub mod config;
pub mod cursor;
pub mod fragment;
pub mod model;
pub mod orchestrator;
pub mod query;
pub mod resolver;
pub mod service;
pub mod toggle;
