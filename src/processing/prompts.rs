//! Prompt text and sampling parameters for each completion call the pipeline makes.

use crate::completion::{ChatMessage, CompletionRequest, ContentPart, ImageUrl};

/// Separator placed between partial summaries in the reduce input.
pub const PARTIAL_SEPARATOR: &str = "\n\n---\n\n";
/// Separator used when partial summaries are concatenated as a fallback.
pub const FALLBACK_SEPARATOR: &str = "\n\n";

const IMAGE_MAX_TOKENS: u32 = 600;
const CHUNK_MAX_TOKENS: u32 = 800;
const REDUCE_MAX_TOKENS: u32 = 1000;
const TEMPERATURE: f32 = 0.2;

/// Single multimodal call describing an image as a short bulleted summary.
pub(crate) fn image_request(model: &str, language: &str, data_url: String) -> CompletionRequest {
    let instruction = format!(
        "Summarize this image concisely in {language}. List 3-6 key points as bullet points."
    );
    CompletionRequest {
        model: model.to_string(),
        messages: vec![ChatMessage::user_parts(vec![
            ContentPart::Text { text: instruction },
            ContentPart::ImageUrl {
                image_url: ImageUrl { url: data_url },
            },
        ])],
        max_tokens: Some(IMAGE_MAX_TOKENS),
        temperature: Some(TEMPERATURE),
    }
}

/// Summary of chunk `part` (one-based) out of `total`.
pub(crate) fn chunk_request(
    model: &str,
    language: &str,
    part: usize,
    total: usize,
    chunk: &str,
) -> CompletionRequest {
    let system = format!(
        "You summarize documents in {language}. Organize the summary into key points, \
         supporting evidence and figures, and limitations or caveats."
    );
    let user = format!("Summarize part {part}/{total} of the document concisely:\n\n{chunk}");
    CompletionRequest {
        model: model.to_string(),
        messages: vec![ChatMessage::system(system), ChatMessage::user(user)],
        max_tokens: Some(CHUNK_MAX_TOKENS),
        temperature: Some(TEMPERATURE),
    }
}

/// Merge of all partial summaries into the final answer.
pub(crate) fn reduce_request(model: &str, language: &str, partials: &[String]) -> CompletionRequest {
    let system = format!(
        "You merge partial summaries of one document into a single final summary in {language}. \
         Remove duplication, keep the structure clear, and end with conclusions and action items."
    );
    CompletionRequest {
        model: model.to_string(),
        messages: vec![
            ChatMessage::system(system),
            ChatMessage::user(partials.join(PARTIAL_SEPARATOR)),
        ],
        max_tokens: Some(REDUCE_MAX_TOKENS),
        temperature: Some(TEMPERATURE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::MessageContent;

    #[test]
    fn chunk_prompt_names_position_and_carries_text() {
        let request = chunk_request("m", "English", 2, 3, "BODY");
        let user = request.messages[1].text();
        assert!(user.contains("part 2/3"));
        assert!(user.ends_with("BODY"));
        assert_eq!(request.max_tokens, Some(800));
        assert_eq!(request.temperature, Some(0.2));
    }

    #[test]
    fn reduce_input_separates_partials() {
        let request = reduce_request("m", "English", &["one".into(), "two".into()]);
        assert_eq!(request.messages[1].text(), "one\n\n---\n\ntwo");
        assert_eq!(request.max_tokens, Some(1000));
    }

    #[test]
    fn image_prompt_is_single_multimodal_message() {
        let request = image_request("m", "Korean", "data:image/png;base64,AAAA".into());
        assert_eq!(request.messages.len(), 1);
        let MessageContent::Parts(parts) = &request.messages[0].content else {
            panic!("expected multimodal content");
        };
        assert!(matches!(&parts[0], ContentPart::Text { text } if text.contains("Korean")));
        assert!(matches!(
            &parts[1],
            ContentPart::ImageUrl { image_url } if image_url.url == "data:image/png;base64,AAAA"
        ));
        assert_eq!(request.max_tokens, Some(600));
    }
}
