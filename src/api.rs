//! Korean digest generation through an OpenAI-compatible chat API.
//!
//! # Architecture
//!
//! - [`AskAsync`]: Core trait defining async LLM interaction
//! - [`OpenAiChat`]: Chat-completions client implementing [`AskAsync`]
//! - [`summarize`]: Builds the prompt from grouped items and falls back to a
//!   plain listing when no client is configured or the call fails
//!
//! There is no retry. A failed call is logged once and the fallback listing
//! is returned instead.

use crate::digest::{SourceGroup, item_count};
use crate::outputs::html::fallback_listing;
use crate::utils::{http_client, truncate_chars, truncate_for_log};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::time::Instant;
use tracing::{error, info, instrument, warn};

pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const MAX_TOKENS: u32 = 4000;
pub const TEMPERATURE: f32 = 0.7;
/// Characters of each item summary included in the prompt.
pub const PROMPT_SUMMARY_CHARS: usize = 200;

/// Instruction for the model: tone, completeness, per-item length and the
/// HTML shape of the result.
pub const SYSTEM_PROMPT: &str = r#"당신은 IT 뉴스를 친구에게 설명해주는 큐레이터입니다.
QA 엔지니어/개발자 팀에게 주간 브리핑을 작성합니다.

작성 규칙:
1. 친한 친구에게 카톡으로 설명하듯 친근하고 자연스러운 어투 사용 (예: "~했대요", "~라고 하네요", "흥미롭죠?")
2. 제공된 모든 기사를 빠짐없이 포함할 것 (생략 금지)
3. 각 기사는 제목 포함 최대 3줄로 요약 (단순 제목 번역이 아닌 내용 분석)
4. 중요한 기사는 배경 정보나 의미를 추가 설명
5. 각 소스 내에서 화제성과 중요도순으로 정렬
6. 기사에 없는 소스 섹션은 제외

출력 형식 (HTML):
<h1>📰 주간 IT 브리핑</h1>
<p>총 {전체 기사 수}개 기사</p>

<h2>{소스 아이콘} {소스 이름}</h2>
<ul>
<li><a href="기사URL"><strong>제목</strong></a><br>
친근한 어투로 2-3줄 요약. 왜 중요한지, 어떤 의미인지 설명.</li>
</ul>

소스 아이콘: Playwright 🔧, Hacker News 🔥, TLDR 📬, OpenAI 🤖, Anthropic 🧠, Medium 📝

<hr>
<p><em>Briefit - AI-powered IT briefing</em></p>"#;

/// Trait for async LLM interaction.
///
/// Implementors send text to a model and return its reply. [`summarize`] is
/// written against this seam so it can run against a canned responder.
pub trait AskAsync {
    /// The type of response returned by the LLM.
    type Response;

    async fn ask(&self, text: &str) -> Result<Self::Response, Box<dyn Error>>;
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    content: Option<String>,
}

/// Chat-completions client for an OpenAI-compatible endpoint.
#[derive(Clone)]
pub struct OpenAiChat {
    pub endpoint: String,
    api_key: String,
    pub model: String,
}

impl std::fmt::Debug for OpenAiChat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiChat")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .finish()
    }
}

impl OpenAiChat {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }
}

impl AskAsync for OpenAiChat {
    type Response = String;

    #[instrument(level = "info", skip_all, fields(model = %self.model))]
    async fn ask(&self, text: &str) -> Result<Self::Response, Box<dyn Error>> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: text,
                },
            ],
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        };

        let t0 = Instant::now();
        let response: ChatResponse = http_client()?
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        info!(elapsed_ms = t0.elapsed().as_millis() as u64, "Chat completion returned");

        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| "chat completion had no content".into())
    }
}

/// User prompt listing every item, grouped in presentation order.
///
/// Known sources list title, URL and the start of the summary. Other sources
/// list title and URL only.
pub fn build_prompt(groups: &[SourceGroup]) -> String {
    let mut lines = vec!["아래 뉴스들을 분석하여 주간 IT 브리핑을 작성해주세요:\n".to_string()];

    for group in groups {
        let known = group.source.preferred_rank().is_some();
        lines.push(format!("\n## {} ({}개)", group.source, group.items.len()));
        for item in &group.items {
            lines.push(format!("- 제목: {}", item.title));
            if !item.url.is_empty() {
                lines.push(format!("  URL: {}", item.url));
            }
            if let Some(summary) = item.summary.as_deref().filter(|_| known) {
                lines.push(format!(
                    "  요약: {}",
                    truncate_chars(summary, PROMPT_SUMMARY_CHARS)
                ));
            }
        }
    }

    lines.join("\n")
}

/// Produce the digest document for `groups`.
///
/// Returns the model's reply, or [`fallback_listing`] when `asker` is `None`
/// or the call fails.
#[instrument(level = "info", skip_all, fields(items = item_count(groups)))]
pub async fn summarize<A>(asker: Option<&A>, groups: &[SourceGroup]) -> String
where
    A: AskAsync<Response = String>,
{
    let Some(asker) = asker else {
        warn!("No summarizer credential configured; using plain listing");
        return fallback_listing(groups);
    };

    let prompt = build_prompt(groups);
    let t0 = Instant::now();
    match asker.ask(&prompt).await {
        Ok(reply) => {
            info!(
                elapsed_ms_total = t0.elapsed().as_millis() as u64,
                preview = %truncate_for_log(&reply, 120),
                "Summary generated"
            );
            reply
        }
        Err(e) => {
            error!(error = %e, "Summarization failed; using plain listing");
            fallback_listing(groups)
        }
    }
}
