//! Renderer - Markdown -> frammento HTML sanitizzato
//!
//! [`render`] è una funzione pura: nessun I/O, nessun errore. Il markdown viene
//! parsato con pulldown-cmark e riscritto evento per evento tenendo solo i tag
//! della allow-list ([`sanitize::ALLOWED_TAGS`]); il testo dei tag scartati resta.
//! URL ed email nel testo diventano link, e ogni `<a>` porta `rel="nofollow"`.
//!
//! L'output è sempre ben formato rispetto alla allow-list: i tag aperti vengono
//! chiusi in ordine inverso e quelli rimasti aperti sono chiusi a fine blocco.

pub mod sanitize;

use linkify::{LinkFinder, LinkKind};
use pulldown_cmark::{Event, LinkType, Options, Parser, Tag, TagEnd};
use sanitize::{MARKUP_RE, allowed_tag, escape_attr, escape_text, parse_attributes, safe_href};

/// Converte il markdown `source` in HTML ristretto alla allow-list
pub fn render(source: &str) -> String {
    let mut writer = HtmlWriter::default();
    // pulldown-cmark spezza il testo in più eventi (es. prima di `!`): li riuniamo
    // così il linkify vede l'URL intero
    let mut pending = String::new();

    for event in Parser::new_ext(source, Options::empty()) {
        if let Event::Text(text) = &event {
            pending.push_str(text);
            continue;
        }
        writer.text(&pending);
        pending.clear();
        writer.event(event);
    }
    writer.text(&pending);

    writer.finish()
}

#[derive(Default)]
struct HtmlWriter {
    out: String,
    /// Tag della allow-list attualmente aperti
    open: Vec<&'static str>,
    /// Per ogni link markdown aperto: se abbiamo emesso davvero un `<a>`
    links: Vec<bool>,
    image_depth: usize,
    in_code_block: bool,
}

impl HtmlWriter {
    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Code(code) => {
                if self.image_depth == 0 {
                    self.out.push_str("<code>");
                    self.out.push_str(&escape_text(&code));
                    self.out.push_str("</code>");
                }
            }
            Event::Html(raw) | Event::InlineHtml(raw) => self.raw_html(&raw),
            Event::SoftBreak | Event::HardBreak => {
                if self.image_depth == 0 {
                    self.out.push('\n');
                }
            }
            Event::Rule => self.block_break(),
            Event::Text(text) => self.text(&text),
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Emphasis => self.open_tag("em", "<em>".to_string()),
            Tag::Strong => self.open_tag("strong", "<strong>".to_string()),
            Tag::CodeBlock(_) => {
                self.block_break();
                self.in_code_block = true;
                self.open_tag("code", "<code>".to_string());
            }
            Tag::Link {
                link_type,
                dest_url,
                title,
                ..
            } => {
                if self.image_depth > 0 || self.in_anchor() {
                    self.links.push(false);
                    return;
                }
                let dest = match link_type {
                    LinkType::Email => format!("mailto:{}", dest_url),
                    _ => dest_url.to_string(),
                };
                match safe_href(&dest) {
                    Some(href) => {
                        self.open_anchor(Some(&href), Some(&title));
                        self.links.push(true);
                    }
                    None => self.links.push(false),
                }
            }
            Tag::Image { .. } => self.image_depth += 1,
            Tag::Strikethrough => {}
            // paragrafi, titoli, liste, citazioni, blocchi html...: solo un a-capo
            _ => self.block_break(),
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Emphasis => self.close_tag("em"),
            TagEnd::Strong => self.close_tag("strong"),
            TagEnd::Link => {
                if self.links.pop() == Some(true) {
                    self.close_tag("a");
                }
            }
            TagEnd::Image => self.image_depth = self.image_depth.saturating_sub(1),
            TagEnd::CodeBlock => {
                self.close_tag("code");
                self.in_code_block = false;
                self.close_all();
            }
            TagEnd::Strikethrough => {}
            // fine di un blocco: nessun tag inline sopravvive oltre
            _ => self.close_all(),
        }
    }

    /// Testo libero: escape, più linkify se non siamo già dentro un link o un blocco di codice
    fn text(&mut self, text: &str) {
        if text.is_empty() || self.image_depth > 0 {
            return;
        }
        if self.in_code_block || self.in_anchor() || self.open.contains(&"code") {
            self.out.push_str(&escape_text(text));
            return;
        }

        let mut finder = LinkFinder::new();
        finder.url_must_have_scheme(false);
        finder.kinds(&[LinkKind::Url, LinkKind::Email]);

        for span in finder.spans(text) {
            let href = match span.kind() {
                Some(LinkKind::Url) => Some(normalize_url(span.as_str())),
                Some(LinkKind::Email) => Some(format!("mailto:{}", span.as_str())),
                _ => None,
            };
            match href.as_deref().and_then(safe_href) {
                Some(href) => {
                    self.out.push_str(&format!(
                        r#"<a href="{}" rel="nofollow">{}</a>"#,
                        escape_attr(&href),
                        escape_text(span.as_str())
                    ));
                }
                None => self.out.push_str(&escape_text(span.as_str())),
            }
        }
    }

    /// HTML grezzo scritto dall'autore: i tag ammessi vengono riscritti puliti, il resto è testo
    fn raw_html(&mut self, raw: &str) {
        if self.image_depth > 0 {
            return;
        }
        let mut last = 0;
        for caps in MARKUP_RE.captures_iter(raw) {
            let Some(whole) = caps.get(0) else { continue };
            self.raw_text(&raw[last..whole.start()]);
            last = whole.end();

            // commenti e doctype non hanno il gruppo del nome: si buttano
            let Some(name) = caps.get(2) else { continue };
            let Some(tag) = allowed_tag(name.as_str()) else { continue };
            let closing = caps.get(1).is_some_and(|m| !m.as_str().is_empty());
            let attrs = caps.get(3).map(|m| m.as_str()).unwrap_or_default();

            if closing {
                self.close_tag(tag);
            } else {
                self.open_raw(tag, attrs);
            }
        }
        self.raw_text(&raw[last..]);
    }

    fn raw_text(&mut self, text: &str) {
        if !text.is_empty() {
            let decoded = html_escape::decode_html_entities(text);
            self.text(&decoded);
        }
    }

    fn open_raw(&mut self, tag: &'static str, raw_attrs: &str) {
        let attrs = parse_attributes(raw_attrs);
        let attr = |name: &str| {
            attrs
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.as_str())
        };

        match tag {
            "a" => {
                if self.in_anchor() {
                    return;
                }
                let href = attr("href").and_then(safe_href);
                self.open_anchor(href.as_deref(), attr("title"));
            }
            "abbr" | "acronym" => {
                let html = match attr("title") {
                    Some(title) => format!(r#"<{} title="{}">"#, tag, escape_attr(title)),
                    None => format!("<{}>", tag),
                };
                self.open_tag(tag, html);
            }
            _ => self.open_tag(tag, format!("<{}>", tag)),
        }
    }

    fn open_anchor(&mut self, href: Option<&str>, title: Option<&str>) {
        let mut html = String::from("<a");
        if let Some(href) = href {
            html.push_str(&format!(r#" href="{}""#, escape_attr(href)));
        }
        if let Some(title) = title.filter(|t| !t.is_empty()) {
            html.push_str(&format!(r#" title="{}""#, escape_attr(title)));
        }
        html.push_str(r#" rel="nofollow">"#);
        self.open_tag("a", html);
    }

    fn open_tag(&mut self, tag: &'static str, html: String) {
        self.out.push_str(&html);
        self.open.push(tag);
    }

    /// Chiude `tag` e tutto ciò che è stato aperto dopo; ignora chiusure senza apertura
    fn close_tag(&mut self, tag: &str) {
        if let Some(pos) = self.open.iter().rposition(|t| *t == tag) {
            while self.open.len() > pos {
                if let Some(t) = self.open.pop() {
                    self.out.push_str(&format!("</{}>", t));
                }
            }
        }
    }

    fn close_all(&mut self) {
        while let Some(t) = self.open.pop() {
            self.out.push_str(&format!("</{}>", t));
        }
    }

    fn in_anchor(&self) -> bool {
        self.open.contains(&"a")
    }

    fn block_break(&mut self) {
        if !self.out.is_empty() && !self.out.ends_with('\n') {
            self.out.push('\n');
        }
    }

    fn finish(mut self) -> String {
        self.close_all();
        self.out.trim_matches('\n').to_string()
    }
}

/// `foo.com` -> `http://foo.com`; gli URL con schema restano invariati
fn normalize_url(url: &str) -> String {
    if url.contains("://") {
        url.to_string()
    } else {
        format!("http://{}", url)
    }
}
