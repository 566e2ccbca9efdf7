pub mod analytics;
pub mod api;
pub mod config;
pub mod logging;
pub mod predictions;
pub mod projection;
pub mod validation;

// Re-export the main error types for convenience
pub use api::gateway::FetchError;
pub use api::DashboardError;
pub use validation::ValidationError;

// Re-export client entry points
pub use api::auth::{MemoryTokenStorage, SessionStore, TokenStorage, TokenStore};
pub use api::{DashboardClient, FetchGateway, ReqwestTransport};

// Re-export prediction state
pub use predictions::{
    DashboardSnapshot, PredictionLabel, PredictionRecord, PredictionRepository, RepositoryChange,
};
