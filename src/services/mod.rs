pub mod llm;
pub mod outline;
pub mod parser;
pub mod prompt;
pub mod provider;
pub mod scraper;
pub mod summarizer;
