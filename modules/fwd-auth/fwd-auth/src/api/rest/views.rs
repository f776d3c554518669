//! HTML shown to people who hit the sidecar directly.

use axum::response::Html;

/// Page returned with `403` when an authenticated caller bypassed the proxy.
#[must_use]
pub fn direct_access_page(landing_url: &str) -> Html<String> {
    let href = escape(landing_url);
    Html(format!(
        "<!DOCTYPE html>\n\
         <html lang=\"en\">\n\
         <head><meta charset=\"utf-8\"><title>Nothing to see here</title></head>\n\
         <body>\n\
         <h1>These aren't the droids you're looking for.</h1>\n\
         <p>This service only answers requests relayed by the ingress proxy.</p>\n\
         <p><a href=\"{href}\">Continue to the application</a></p>\n\
         </body>\n\
         </html>\n"
    ))
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn landing_link_is_escaped() {
        let Html(body) = direct_access_page("https://x.example.com/?a=1&b=\"2\"");
        assert!(body.contains("href=\"https://x.example.com/?a=1&amp;b=&quot;2&quot;\""));
    }
}
