//! Standalone HTML page around the document markup.

use quick_xml::escape::escape;

/// Wrap `markup` in a page with a title and a stylesheet link.
pub fn render_page(markup: &str, title: &str, stylesheet: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{title}</title>
<link rel="stylesheet" type="text/css" href="{stylesheet}">
</head>
<body>
<div class="container">
{markup}
</div>
</body>
</html>
"#,
        title = escape(title),
        stylesheet = escape(stylesheet),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_carries_title_stylesheet_and_markup() {
        let page = render_page("<p>Body</p>", "Pumps & valves", "./styles/style.css");
        assert!(page.starts_with("<!DOCTYPE html>"));
        assert!(page.contains("<title>Pumps &amp; valves</title>"));
        assert!(page.contains(r#"href="./styles/style.css""#));
        assert!(page.contains("<div class=\"container\">\n<p>Body</p>\n</div>"));
    }
}
