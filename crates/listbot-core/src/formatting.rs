//! Reply rendering (Telegram HTML subset).

/// Escape HTML special characters for Telegram HTML parse mode.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// `<b>@name</b>: a, b`
pub fn roster_line(name: &str, members: &[String]) -> String {
    format!(
        "<b>@{}</b>: {}",
        escape_html(name),
        escape_html(&members.join(", "))
    )
}
