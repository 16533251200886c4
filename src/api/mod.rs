/// Account endpoints
pub mod accounts;
/// HTTP client, headers and status mapping
pub mod client;
/// Department, project and department-context endpoints
pub mod departments;
/// Normalization of backend payload shapes
pub mod wire;
