use regex::{Captures, Regex};
use std::sync::LazyLock;

pub const OUTLINE_TEMPLATE: &str = include_str!("../../prompts/outline_prompt.txt");
pub const SUMMARIZE_TEMPLATE: &str = include_str!("../../prompts/summarize_content_prompt.txt");

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{(\w+)\}").unwrap());

/// Replaces `{name}` placeholders in one pass. Substituted values are not
/// scanned again, and placeholders without a value are left as written.
pub fn render(template: &str, values: &[(&str, &str)]) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures| {
            let name = &caps[1];
            values
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| value.to_string())
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Frames summarized source material for the outline prompt.
pub fn reference_block(material: &str) -> String {
    format!(
        "\n\n【创作素材】\n以下是经过整理的参考素材，包含关键数据、金句和核心观点，请在生成大纲时充分利用这些素材：\n\n{material}"
    )
}

pub fn image_notice(count: usize) -> String {
    format!(
        "\n\n注意：用户提供了 {count} 张参考图片，请在生成大纲时考虑这些图片的内容和风格。这些图片可能是产品图、个人照片或场景图，请根据图片内容来优化大纲，使生成的内容与图片相关联。"
    )
}

/// Builds the outline prompt. `reference` is the already-framed block (empty
/// when there is no source material).
pub fn outline_prompt(topic: &str, reference: &str, image_count: usize) -> String {
    let mut prompt = render(OUTLINE_TEMPLATE, &[("topic", topic), ("reference", reference)]);
    if image_count > 0 {
        prompt.push_str(&image_notice(image_count));
    }
    prompt
}

pub fn summarize_prompt(content: &str) -> String {
    render(SUMMARIZE_TEMPLATE, &[("content", content)])
}
