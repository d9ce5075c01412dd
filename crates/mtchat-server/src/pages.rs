//! Server-rendered chat loader page.

use mtchat_core::chat::{AUTO_OPEN_DELAY, LOADER_PATH, LoaderParams};

/// Characters of the chat id shown in the header.
const CHAT_ID_PREVIEW: usize = 16;

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// JSON string literal safe to embed in a `<script>` block.
fn script_string(raw: &str) -> String {
    serde_json::Value::String(raw.to_string())
        .to_string()
        .replace("</", "<\\/")
}

fn chat_frame(url: Option<&str>) -> String {
    match url {
        Some(url) => format!(
            r#"<iframe src="{src}" title="Chat Interface" class="chat-frame"
            allow="microphone; camera; clipboard-read; clipboard-write"
            sandbox="allow-same-origin allow-scripts allow-forms allow-popups allow-popups-to-escape-sandbox"></iframe>"#,
            src = escape_html(url)
        ),
        None => r#"<div class="empty">
            <p class="empty-title">No chat URL provided</p>
            <p>Please use a valid notification link to access the chat.</p>
        </div>"#
            .to_string(),
    }
}

fn session_info(params: &LoaderParams) -> String {
    let Some(chat_id) = params.chat_id.as_deref() else {
        return String::new();
    };
    let preview: String = chat_id.chars().take(CHAT_ID_PREVIEW).collect();
    let entity = params
        .entity_id
        .as_deref()
        .map(|id| format!(r#"<span><strong>Entity:</strong> {}</span>"#, escape_html(id)))
        .unwrap_or_default();
    format!(
        r#"<div class="info"><span><strong>Chat ID:</strong> {}...</span>{}</div>"#,
        escape_html(&preview),
        entity
    )
}

/// Renders the loader for `params`; `raw_query` is forwarded to the close link.
pub fn loader_page(params: &LoaderParams, raw_query: &str) -> String {
    let url = params.url.as_deref();
    let open_script = match url {
        Some(url) => {
            let auto = if params.auto {
                format!("setTimeout(openChat, {});", AUTO_OPEN_DELAY.as_millis())
            } else {
                String::new()
            };
            format!(
                r#"<script>
        const chatUrl = {url};
        function openChat() {{
            try {{ window.open(chatUrl, '_blank', 'noopener,noreferrer'); }}
            catch (e) {{ window.location.href = chatUrl; }}
        }}
        document.getElementById('open-full').addEventListener('click', openChat);
        {auto}
    </script>"#,
                url = script_string(url),
            )
        }
        None => String::new(),
    };
    let close_href = if raw_query.is_empty() {
        format!("{LOADER_PATH}/close")
    } else {
        format!("{LOADER_PATH}/close?{raw_query}")
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Chat Session</title>
    <style>
        body {{ font-family: system-ui, sans-serif; background: #f9fafb; margin: 0; padding: 16px; }}
        .panel {{ max-width: 56rem; margin: 0 auto; background: #fff; border-radius: 8px; box-shadow: 0 1px 3px rgba(0,0,0,.1); }}
        header {{ display: flex; justify-content: space-between; align-items: center; padding: 24px; }}
        header p {{ color: #4b5563; margin: 4px 0 0; font-size: .875rem; }}
        .actions {{ display: flex; gap: 12px; }}
        .actions a, .actions button {{ border: 1px solid #d1d5db; background: #fff; border-radius: 6px; padding: 8px 14px; color: #111827; text-decoration: none; cursor: pointer; }}
        .info {{ margin: 0 24px 16px; padding: 12px; background: #f9fafb; font-size: .875rem; color: #6b7280; display: flex; justify-content: space-between; }}
        .chat-frame {{ width: 100%; height: 600px; border: 0; }}
        .empty {{ height: 600px; display: flex; flex-direction: column; align-items: center; justify-content: center; color: #6b7280; }}
        .empty-title {{ font-size: 1.125rem; font-weight: 500; }}
    </style>
</head>
<body>
    <div class="panel">
        <header>
            <div>
                <h1>Chat Session</h1>
                <p>You've been invited to join a chat</p>
            </div>
            <div class="actions">
                <button id="open-full" {disabled}>Open Full Screen</button>
                <a href="{close}">Close</a>
            </div>
        </header>
        {info}
        {frame}
    </div>
    {script}
</body>
</html>"#,
        disabled = if url.is_some() { "" } else { "disabled" },
        close = escape_html(&close_href),
        info = session_info(params),
        frame = chat_frame(url),
        script = open_script,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_url_renders_empty_state() {
        let page = loader_page(&LoaderParams::parse(""), "");
        assert!(page.contains("No chat URL provided"));
        assert!(page.contains("disabled"));
        assert!(!page.contains("<iframe"));
    }

    #[test]
    fn test_auto_open_schedules_after_delay() {
        let query = "url=https%3A%2F%2Fchat.test%2Frequest%3FchatId%3Dabc&chatId=abcdef0123456789ffff&entityId=e1&auto=true";
        let page = loader_page(&LoaderParams::parse(query), query);
        assert!(page.contains(r#"src="https://chat.test/request?chatId=abc""#));
        assert!(page.contains("setTimeout(openChat, 2000);"));
        assert!(page.contains("abcdef0123456789..."));
        assert!(page.contains("/notification-loader/close?url="));
    }

    #[test]
    fn test_values_are_escaped() {
        let query = "url=https%3A%2F%2Fchat.test%2F%22%3E%3C%2Fscript%3E&chatId=%3Cb%3E";
        let page = loader_page(&LoaderParams::parse(query), "");
        assert!(!page.contains("\"></script>\""));
        assert!(page.contains("&lt;b&gt;"));
        assert!(page.contains(r#"<\/script>"#));
    }

    #[test]
    fn test_script_urls_never_reach_the_page() {
        let query = "url=javascript%3Aalert(document.domain)&chatId=c&entityId=e1&auto=true";
        let page = loader_page(&LoaderParams::parse(query), query);
        assert!(page.contains("No chat URL provided"));
        assert!(!page.contains("<iframe"));
        assert!(!page.contains("const chatUrl"));
    }
}
