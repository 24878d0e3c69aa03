//! Embedded sub-resource discovery over fetched HTML documents.

use std::collections::HashSet;

use reqwest::Url;

/// Tag names and the attribute carrying their resource reference.
const RESOURCE_TAGS: [(&str, &str); 3] = [("img", "src"), ("script", "src"), ("link", "href")];

/// Extracts the absolute URLs of embedded sub-resources from an HTML
/// document.
///
/// Scans `img`/`script` tags for `src` and `link` tags for `href`,
/// case-insensitively and accepting single- or double-quoted values.
/// Relative references are resolved against `base`. Duplicates collapse.
/// Malformed HTML never fails; at worst the result is empty.
pub fn discover(html: &str, base: &Url) -> HashSet<Url> {
    // ASCII lowercasing keeps byte offsets identical, so matches found in
    // the lowered copy can slice the original text.
    let lower = html.to_ascii_lowercase();
    let mut links = HashSet::new();

    let mut pos = 0;
    while let Some(off) = lower[pos..].find('<') {
        let open = pos + off;
        let close = lower[open..].find('>').map_or(lower.len(), |i| open + i);
        let tag_lower = &lower[open..close];

        for (name, attr) in RESOURCE_TAGS {
            if !is_tag(tag_lower, name) {
                continue;
            }
            if let Some(value) = attr_value(&html[open..close], tag_lower, attr) {
                if !value.is_empty() {
                    if let Ok(url) = base.join(value) {
                        links.insert(url);
                    }
                }
            }
            break;
        }

        pos = close.max(open + 1);
    }

    links
}

/// Whether a lowercased `<...` slice opens a tag with exactly this name.
fn is_tag(tag: &str, name: &str) -> bool {
    match tag.strip_prefix('<').and_then(|t| t.strip_prefix(name)) {
        Some(rest) => rest.is_empty() || rest.starts_with([' ', '\t', '\n', '\r', '/']),
        None => false,
    }
}

/// Finds the quoted value of `attr` within one tag.
///
/// `tag` and `tag_lower` are the same slice in original and lowercased
/// form; the returned value preserves the original casing.
fn attr_value<'a>(tag: &'a str, tag_lower: &str, attr: &str) -> Option<&'a str> {
    let bytes = tag_lower.as_bytes();
    let mut search = 0;

    while let Some(off) = tag_lower[search..].find(attr) {
        let at = search + off;
        search = at + 1;

        // Reject matches inside longer attribute names, e.g. `data-src`.
        if at > 0 {
            let prev = bytes[at - 1];
            if prev.is_ascii_alphanumeric() || prev == b'-' || prev == b'_' {
                continue;
            }
        }

        let mut i = at + attr.len();
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= bytes.len() || bytes[i] != b'=' {
            continue;
        }
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= bytes.len() || (bytes[i] != b'"' && bytes[i] != b'\'') {
            continue;
        }
        let quote = bytes[i] as char;
        i += 1;

        let end = tag_lower[i..].find(quote)? + i;
        return Some(&tag[i..end]);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("http://x/index.html").unwrap()
    }

    fn urls(html: &str) -> HashSet<String> {
        discover(html, &base())
            .into_iter()
            .map(|u| u.to_string())
            .collect()
    }

    #[test]
    fn relative_image_resolves_against_base() {
        let found = urls(r#"<img src="a.png">"#);
        assert_eq!(found, HashSet::from(["http://x/a.png".to_string()]));
    }

    #[test]
    fn all_three_tag_kinds_are_found() {
        let html = r#"
            <html><head>
            <link rel="stylesheet" href="style.css">
            <script src="/js/app.js"></script>
            </head><body>
            <img alt="logo" src='logo.png'/>
            </body></html>
        "#;
        let found = urls(html);
        assert_eq!(
            found,
            HashSet::from([
                "http://x/style.css".to_string(),
                "http://x/js/app.js".to_string(),
                "http://x/logo.png".to_string(),
            ])
        );
    }

    #[test]
    fn absolute_references_pass_through() {
        let found = urls(r#"<script src="http://cdn.example/lib.js"></script>"#);
        assert_eq!(found, HashSet::from(["http://cdn.example/lib.js".to_string()]));
    }

    #[test]
    fn duplicates_collapse() {
        let html = r#"<img src="a.png"><img src="a.png"><img src="./a.png">"#;
        assert_eq!(urls(html).len(), 1);
    }

    #[test]
    fn tag_and_attribute_matching_is_case_insensitive() {
        let found = urls(r#"<IMG SRC="A.png"><Link HREF="s.css">"#);
        assert_eq!(
            found,
            HashSet::from(["http://x/A.png".to_string(), "http://x/s.css".to_string()])
        );
    }

    #[test]
    fn lookalike_tags_and_attributes_are_ignored() {
        let html = r#"<imgs src="no.png"><img data-src="lazy.png"><linked href="no.css">"#;
        assert!(urls(html).is_empty());
    }

    #[test]
    fn malformed_html_yields_empty_set() {
        for html in ["", "<", "<img src=", "<img src=\"unterminated", "plain text < > junk"] {
            assert!(urls(html).is_empty(), "html = {html:?}");
        }
    }

    #[test]
    fn empty_values_are_skipped() {
        assert!(urls(r#"<img src="">"#).is_empty());
    }

    #[test]
    fn discovery_is_idempotent() {
        let html = r#"<img src="a.png"><script src="b.js"></script>"#;
        assert_eq!(discover(html, &base()), discover(html, &base()));
    }
}
