//! Google Sheets tool surface
//!
//! The REST client plus the tool handlers that translate MCP tool calls
//! into Sheets API requests. Handlers receive an already validated bearer
//! token from the boundary layer and hold no state of their own.

mod api;
pub mod tools;

pub use api::{SHEETS_API_BASE_URL, SheetsClient};
