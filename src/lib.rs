pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod export;
pub mod linkahead;
pub mod output;
pub mod overview;
pub mod store;
pub mod synthetic;
pub mod table;
