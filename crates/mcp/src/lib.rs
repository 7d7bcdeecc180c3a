// MCP (Model Context Protocol) bridge for the Promptlift optimization service.
// Speaks line-delimited JSON-RPC on stdio and exposes one tool to agent hosts.

pub mod codec;
pub mod metrics;
pub mod protocol;
pub mod server;
pub mod startup;
pub mod tools;

pub use server::McpServer;
