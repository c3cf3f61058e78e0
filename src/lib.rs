pub mod batch;
pub mod chunk;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod parsers;
pub mod prompt;
pub mod render;
pub mod response;
pub mod retry;
pub mod sanitize;
pub mod server;
pub mod tools;
