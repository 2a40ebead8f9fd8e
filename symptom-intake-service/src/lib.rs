pub mod collaborators;
pub mod config;
pub mod models;
pub mod service;
pub mod workflow;

pub use config::{AssistantConfig, ServiceConfig};
pub use service::{AppState, build_router, create_app};
pub use workflow::{build_collaborators, create_wizard_runner};
