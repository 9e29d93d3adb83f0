pub mod jwt;
pub mod middleware;
pub mod models;
pub mod password;


pub use jwt::*;
pub use middleware::*;
pub use models::*;
pub use password::*;
