use tracing::{info, warn};

use crate::services::llm::{TextClient, TextRequest};
use crate::services::prompt;

/// Content at or below this many characters is used as-is.
pub const SUMMARY_THRESHOLD: usize = 4000;
/// Characters kept when summarization fails.
pub const TRUNCATE_LIMIT: usize = 8000;
pub const TRUNCATION_MARKER: &str = "\n\n...(内容已截断)";

const SUMMARY_TEMPERATURE: f32 = 0.3;
const SUMMARY_MAX_OUTPUT_TOKENS: u32 = 6000;

/// Condenses long reference material before it goes into the outline prompt.
/// Never fails: an unusable summary falls back to truncation.
pub async fn summarize_content(client: &dyn TextClient, model: &str, content: &str) -> String {
    let length = content.chars().count();
    if length <= SUMMARY_THRESHOLD {
        info!("内容长度 {} 字，无需摘要", length);
        return content.to_string();
    }

    info!("开始对网页内容进行摘要，原始长度: {} 字", length);
    let summarize_prompt = prompt::summarize_prompt(content);
    let request = TextRequest {
        prompt: &summarize_prompt,
        model,
        temperature: SUMMARY_TEMPERATURE,
        max_output_tokens: SUMMARY_MAX_OUTPUT_TOKENS,
        images: &[],
    };

    match client.generate_text(request).await {
        Ok(summary) => {
            info!("内容摘要完成，摘要长度: {} 字", summary.chars().count());
            summary
        }
        Err(e) => {
            warn!("内容摘要失败，使用截断方式: {}", e);
            truncate(content)
        }
    }
}

pub fn truncate(content: &str) -> String {
    let mut out: String = content.chars().take(TRUNCATE_LIMIT).collect();
    out.push_str(TRUNCATION_MARKER);
    out
}
