pub mod autocomplete;
pub mod backend;
pub mod comparison;
pub mod config;
pub mod directory;
pub mod history;
pub mod http_client;
pub mod live_backend;
pub mod offline_backend;
pub mod persist;
pub mod provider;
pub mod state;
pub mod theme;
pub mod workflow;
