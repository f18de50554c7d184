//! Page metadata - estrazione di title e meta description dalle pagine linkate

use crate::render::sanitize::{escape_attr, escape_text};
use scraper::{Html, Selector};

/// Descrizione usata quando la pagina non ha `<meta name="description">`
pub const NO_DESCRIPTION: &str = "No description found.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSummary {
    pub title: String,
    pub description: String,
}

impl PageSummary {
    /// Estrae il primo `<title>` (fallback: l'URL) e la prima meta description
    pub fn from_html(url: &str, body: &str) -> Self {
        let document = Html::parse_document(body);

        let title = Selector::parse("title")
            .ok()
            .and_then(|sel| {
                document
                    .select(&sel)
                    .next()
                    .map(|el| el.text().collect::<String>().trim().to_string())
            })
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| url.to_string());

        let description = Selector::parse("meta")
            .ok()
            .and_then(|sel| {
                document.select(&sel).find(|el| {
                    el.value()
                        .attr("name")
                        .is_some_and(|name| name.trim().eq_ignore_ascii_case("description"))
                })
            })
            .and_then(|el| el.value().attr("content"))
            .map(|content| content.trim().to_string())
            .unwrap_or_else(|| NO_DESCRIPTION.to_string());

        Self { title, description }
    }

    /// Blocco di riepilogo da appendere al messaggio (il blocco fa anche da sentinella)
    pub fn to_block(&self, url: &str) -> String {
        format!(
            r#"<blockquote><p><a href="{}">{}</a></p><p>{}</p></blockquote>"#,
            escape_attr(url),
            escape_text(&self.title),
            escape_text(&self.description)
        )
    }
}
