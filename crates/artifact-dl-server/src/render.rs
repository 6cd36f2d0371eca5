//! The two ways of presenting a resolved URL chain, plus the root form.

use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};

use crate::error::AppError;

/// `302 Found` pointing at `location`.
pub fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

/// Disambiguation page listing every URL, least direct first.
pub fn list_page(urls: &[String]) -> Html<String> {
    let items: String = urls
        .iter()
        .map(|url| {
            let url = escape_html(url);
            format!("<li><a href=\"{url}\">{url}</a></li>")
        })
        .collect();

    Html(format!(
        "<p>You can access this artifact by one of the following links, \
         in the order from least to most direct</p><ul>{}</ul>",
        items
    ))
}

/// Redirect to the most direct URL of the chain.
pub fn direct(urls: &[String]) -> Result<Response, AppError> {
    urls.last()
        .map(|url| found(url))
        .ok_or_else(|| AppError::Internal("Resolution produced no URLs".to_string()))
}

/// Form asking for a branch target; submits back to the root as a GET.
pub fn input_form() -> Html<&'static str> {
    Html(
        r#"<form><ul>
<li><label>Organization: <input name="org" placeholder="crystal-lang" required></label>
<li><label>Repository: <input name="repo" placeholder="crystal" required></label>
<li><label>Workflow: <input name="workflow" placeholder="win.yml" required></label>
<li><label>Branch: <input name="branch" placeholder="master" required></label>
<li><label>Artifact: <input name="artifact" placeholder="crystal" required></label>
</ul><input type="submit"></form>
"#,
    )
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            c => escaped.push(c),
        }
    }
    escaped
}
