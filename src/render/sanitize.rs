//! Allow-list dei tag HTML e controllo degli URL
//!
//! Tutto ciò che esce dal renderer passa da qui: i tag fuori lista vengono scartati
//! (il loro testo resta), gli attributi sono ridotti a `href`/`title` e ogni `<a>`
//! riceve `rel="nofollow"`.

use lazy_static::lazy_static;
use regex::Regex;

/// Unici tag che possono sopravvivere alla sanitizzazione
pub const ALLOWED_TAGS: [&str; 8] = ["a", "abbr", "acronym", "b", "code", "em", "i", "strong"];

/// Schemi ammessi negli `href`; gli URL relativi (senza schema) sono ammessi
pub const ALLOWED_SCHEMES: [&str; 3] = ["http", "https", "mailto"];

lazy_static! {
    /// Markup HTML grezzo: commenti, doctype/processing instruction e tag di apertura/chiusura
    pub(crate) static ref MARKUP_RE: Regex = Regex::new(
        r#"(?s)<!--.*?-->|<![^>]*>|<\?[^>]*>|<(/?)([A-Za-z][A-Za-z0-9-]*)((?:[^>"']|"[^"]*"|'[^']*')*)>"#
    )
    .expect("markup regex is valid");

    static ref ATTR_RE: Regex = Regex::new(
        r#"([A-Za-z_:][-A-Za-z0-9_:.]*)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#
    )
    .expect("attribute regex is valid");
}

/// Ritorna il nome canonico del tag se è nella allow-list
pub fn allowed_tag(name: &str) -> Option<&'static str> {
    let lower = name.to_ascii_lowercase();
    ALLOWED_TAGS.iter().copied().find(|tag| *tag == lower)
}

/// Attributi di un tag grezzo, con i valori già decodificati dalle entità
pub fn parse_attributes(raw: &str) -> Vec<(String, String)> {
    ATTR_RE
        .captures_iter(raw)
        .map(|caps| {
            let name = caps[1].to_ascii_lowercase();
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map(|m| html_escape::decode_html_entities(m.as_str()).into_owned())
                .unwrap_or_default();
            (name, value)
        })
        .collect()
}

/// Valida un `href`: `None` se lo schema non è ammesso (`javascript:`, `data:`, ...)
///
/// Tab e a-capo vengono rimossi prima del controllo, come fanno i browser quando
/// parsano lo schema, così `java\tscript:` non passa.
pub fn safe_href(raw: &str) -> Option<String> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !c.is_control())
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let scheme_end = cleaned.find(':');
    let path_start = cleaned.find(['/', '?', '#']);
    match (scheme_end, path_start) {
        (Some(colon), Some(path)) if colon > path => Some(cleaned),
        (Some(colon), _) => {
            let scheme = cleaned[..colon].to_ascii_lowercase();
            ALLOWED_SCHEMES
                .contains(&scheme.as_str())
                .then_some(cleaned)
        }
        (None, _) => Some(cleaned),
    }
}

/// Escape per il contenuto testuale
pub fn escape_text(text: &str) -> String {
    html_escape::encode_text(text).into_owned()
}

/// Escape per un valore di attributo tra doppi apici
pub fn escape_attr(value: &str) -> String {
    html_escape::encode_double_quoted_attribute(value).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_tag_is_case_insensitive() {
        assert_eq!(allowed_tag("EM"), Some("em"));
        assert_eq!(allowed_tag("abbr"), Some("abbr"));
        assert_eq!(allowed_tag("script"), None);
        assert_eq!(allowed_tag("p"), None);
    }

    #[test]
    fn test_safe_href_schemes() {
        assert_eq!(safe_href("http://foo.com"), Some("http://foo.com".to_string()));
        assert_eq!(safe_href("HTTPS://foo.com"), Some("HTTPS://foo.com".to_string()));
        assert_eq!(safe_href("mailto:a@b.com"), Some("mailto:a@b.com".to_string()));
        assert_eq!(safe_href("/relative/path"), Some("/relative/path".to_string()));
        assert_eq!(safe_href("/path?q=a:b"), Some("/path?q=a:b".to_string()));
        assert_eq!(safe_href("javascript:alert(1)"), None);
        assert_eq!(safe_href("JavaScript:alert(1)"), None);
        assert_eq!(safe_href("java\tscript:alert(1)"), None);
        assert_eq!(safe_href("data:text/html;base64,AAAA"), None);
        assert_eq!(safe_href("   "), None);
    }

    #[test]
    fn test_parse_attributes_quoting_styles() {
        let attrs = parse_attributes(r#" href="http://a.com/?x=1&amp;y=2" title='hi' data-x=3 disabled"#);
        assert_eq!(
            attrs,
            vec![
                ("href".to_string(), "http://a.com/?x=1&y=2".to_string()),
                ("title".to_string(), "hi".to_string()),
                ("data-x".to_string(), "3".to_string()),
                ("disabled".to_string(), String::new()),
            ]
        );
    }

    #[test]
    fn test_escape_attr_quotes() {
        assert_eq!(escape_attr(r#"a"b<c>&"#), "a&quot;b&lt;c&gt;&amp;");
    }
}
