// Middleware modules: bearer auth extractor and CORS

pub mod auth;
pub mod cors;

pub use auth::AuthContext;
pub use cors::{dynamic_cors_middleware, CorsPolicy};
