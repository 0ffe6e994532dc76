pub mod admin;
pub mod claims;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod utils;

pub use admin::{AdminVerifier, SecretCodeVerifier};
pub use claims::{Claims, Role};
pub use jwt::JwtService;
pub use middleware::{AuthMiddleware, AuthenticatedUser};
pub use utils::{require_admin, require_student};
