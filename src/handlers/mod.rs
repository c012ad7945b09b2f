pub mod datalake_handlers;
pub mod fallback_handlers;
pub mod health_handlers;
