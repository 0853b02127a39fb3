pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

pub use config::{AppConfig, FirecrawlConfig, ProviderConfig, TextConfig};
pub use error::{ConfigError, LlmError, ScrapeError};
pub use models::{GenerationRequest, OutlineResult, Page, PageType, ScrapedPage};
pub use services::outline::{OutlineGenerator, generate_outline};
pub use services::parser::parse_outline;
