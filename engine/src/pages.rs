use axum::response::Html;
use html_escape::{encode_double_quoted_attribute, encode_text};

/// What the form page shows after a submission.
#[derive(Debug, Clone, Default)]
pub struct PageView {
    pub url: String,
    pub prediction: Option<String>,
    pub explanation: Option<String>,
}

impl PageView {
    pub fn result(url: impl Into<String>, prediction: impl Into<String>, explanation: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            prediction: Some(prediction.into()),
            explanation: Some(explanation.into()),
        }
    }
}

pub fn render(view: &PageView) -> Html<String> {
    let result = match &view.prediction {
        Some(prediction) => format!(
            r#"<section class="result">
      <h2>{}</h2>
      <p>{}</p>
    </section>"#,
            encode_text(prediction),
            encode_text(view.explanation.as_deref().unwrap_or_default()),
        ),
        None => String::new(),
    };

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>Phishing URL Detector</title>
</head>
<body>
  <main>
    <h1>Phishing URL Detector</h1>
    <form method="post" action="/predict">
      <input type="text" name="url" placeholder="Enter a URL" value="{}" required>
      <button type="submit">Check</button>
    </form>
    {}
  </main>
</body>
</html>
"#,
        encode_double_quoted_attribute(&view.url),
        result,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_view_has_no_result_section() {
        let Html(body) = render(&PageView::default());
        assert!(body.contains("<form"));
        assert!(!body.contains("class=\"result\""));
    }

    #[test]
    fn user_text_is_escaped() {
        let view = PageView::result("http://x.com/\"><script>", "🔴 Invalid URL", "<b>bad</b>");
        let Html(body) = render(&view);
        assert!(!body.contains("<script>"));
        assert!(!body.contains("<b>bad</b>"));
        assert!(body.contains("&lt;b&gt;bad&lt;/b&gt;"));
        assert!(body.contains("🔴 Invalid URL"));
    }
}
