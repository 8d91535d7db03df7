//! Bridge between an MCP host and an ExpressionEngine site's Reinos
//! Webservice API. One tool, `manage_content`, covering entries,
//! categories, and channels.

pub mod auth;
pub mod client;
pub mod config;
pub mod response;
pub mod server;
pub mod tools;
