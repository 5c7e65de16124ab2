pub mod batch;
pub mod config;
pub mod domain;
pub mod endpoints;
pub mod error;
pub mod http;
pub mod metadata;
pub mod output;
pub mod probe;
pub mod resolver;
pub mod rsync;
pub mod signal;
pub mod store;
