pub mod health;
pub mod serve;

pub use health::{HealthCommand, health_command};
pub use serve::{ServeCommand, serve_command};
