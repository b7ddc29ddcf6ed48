pub mod jwt;
pub mod middleware;
pub mod password;
pub mod rate_limit;
pub mod session;
