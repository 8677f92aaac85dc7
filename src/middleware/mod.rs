pub mod auth;
pub mod response;

pub use auth::{require_admin, require_auth, require_superadmin, AuthAdmin};
pub use response::{ApiResponse, ApiResult};
