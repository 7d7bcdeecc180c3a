//! Transport layer for the Promptlift SDK.

pub mod http;

pub use http::HttpTransport;
