//! Minimal HTML rendering. Pages are deliberately plain; the browser
//! scripts that talk to the JSON API and the real-time channel do the rest.

use axum::response::Html;

/// Escapes text for safe inclusion in HTML element content or attributes.
pub(crate) fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
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

/// Wraps `body` (already-escaped HTML) in the shared layout.
pub(crate) fn page(title: &str, body: &str) -> Html<String> {
    Html(format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n\
         <meta charset=\"utf-8\">\n<title>{} | Stockpulse</title>\n\
         </head>\n<body>\n{body}\n</body>\n</html>\n",
        escape(title)
    ))
}

pub(crate) fn login_form(error: Option<&str>) -> Html<String> {
    let notice = error
        .map(|msg| format!("<p class=\"error\">{}</p>\n", escape(msg)))
        .unwrap_or_default();
    page(
        "Log in",
        &format!(
            "<h1>Log in</h1>\n{notice}\
             <form method=\"post\" action=\"/auth/login\">\n\
             <input name=\"username\" autocomplete=\"username\" required>\n\
             <input name=\"password\" type=\"password\" autocomplete=\"current-password\" required>\n\
             <button type=\"submit\">Log in</button>\n</form>\n\
             <p><a href=\"/auth/signup\">Create an account</a></p>"
        ),
    )
}
