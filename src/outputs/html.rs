//! HTML documents produced without the language model.
//!
//! [`fallback_listing`] is the plain digest used when summarization is not
//! configured or fails: one `<h2>` per source in presentation order, each
//! item's title linked to its URL exactly once. All text is escaped.

use crate::digest::SourceGroup;
use html_escape::{encode_double_quoted_attribute, encode_text};

/// Plain grouped listing of every item.
pub fn fallback_listing(groups: &[SourceGroup]) -> String {
    let mut html = vec![
        "<html><body>".to_string(),
        "<h1>📡 Weekly IT Briefing</h1>".to_string(),
        "<p><em>AI 요약을 사용할 수 없어 원본 목록을 제공합니다.</em></p>".to_string(),
    ];

    for group in groups {
        html.push(format!("<h2>{}</h2>", encode_text(group.source.label())));
        html.push("<ul>".to_string());
        for item in &group.items {
            html.push(format!(
                r#"<li><a href="{}">{}</a></li>"#,
                encode_double_quoted_attribute(&item.url),
                encode_text(&item.title)
            ));
        }
        html.push("</ul>".to_string());
    }

    html.push("</body></html>".to_string());
    html.join("\n")
}

/// Body of the configuration test message.
pub fn test_message() -> String {
    [
        "<html>",
        "<body>",
        "<h1>📡 Briefit Test Email</h1>",
        "<p>이 이메일은 Briefit 설정 테스트입니다.</p>",
        "<p>이 메일을 받으셨다면 이메일 설정이 올바르게 구성되었습니다.</p>",
        "<hr>",
        "<p><em>Briefit - AI-powered IT news briefing service</em></p>",
        "</body>",
        "</html>",
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::ordered_groups;
    use crate::models::{NewsItem, Source};

    #[test]
    fn test_fallback_lists_every_item_once_grouped() {
        let groups = ordered_groups(vec![
            NewsItem::new(Source::Medium, "Medium post", "https://medium.com/@a/p"),
            NewsItem::new(Source::HackerNews, "Show HN: thing", "https://a.dev/1"),
            NewsItem::new(Source::HackerNews, "Another story", "https://a.dev/2"),
        ]);
        let html = fallback_listing(&groups);

        for needle in [
            "Medium post",
            "https://medium.com/@a/p",
            "Show HN: thing",
            "https://a.dev/1",
            "Another story",
            "https://a.dev/2",
        ] {
            assert_eq!(html.matches(needle).count(), 1, "{needle}");
        }
        let hn = html.find("<h2>Hacker News</h2>").unwrap();
        let medium = html.find("<h2>Medium</h2>").unwrap();
        assert!(hn < medium);
        assert!(html.find("https://a.dev/2").unwrap() < medium);
    }

    #[test]
    fn test_fallback_escapes_markup() {
        let groups = ordered_groups(vec![NewsItem::new(
            Source::Tldr,
            "Why <script> tags & you",
            r#"https://a.dev/?q="x""#,
        )]);
        let html = fallback_listing(&groups);
        assert!(html.contains("Why &lt;script&gt; tags &amp; you"));
        assert!(html.contains("https://a.dev/?q=&quot;x&quot;"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn test_fallback_with_no_items_is_well_formed() {
        let html = fallback_listing(&[]);
        assert!(html.starts_with("<html><body>"));
        assert!(html.ends_with("</body></html>"));
    }
}
