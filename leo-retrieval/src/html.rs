//! Visible-text extraction from HTML pages.

use scraper::{ElementRef, Html, Node, Selector};
use url::Url;

/// Elements whose text never reaches the reader.
const SKIPPED_ELEMENTS: &[&str] = &[
    "script", "style", "noscript", "template", "nav", "header", "footer", "head",
];

const BLOCK_ELEMENTS: &[&str] = &[
    "p", "div", "section", "article", "main", "aside", "li", "ul", "ol", "table", "tr", "br",
    "h1", "h2", "h3", "h4", "h5", "h6", "pre", "blockquote", "dd", "dt", "title",
];

#[derive(Clone, Debug, Default, PartialEq)]
pub struct HtmlText {
    pub text: String,
    pub title: Option<String>,
    pub lang: Option<String>,
}

pub fn html_to_text(html: &str) -> HtmlText {
    let document = Html::parse_document(html);

    let title = Selector::parse("title").ok().and_then(|selector| {
        document
            .select(&selector)
            .next()
            .map(|el| collapse_whitespace(&el.text().collect::<String>()))
            .filter(|title| !title.is_empty())
    });
    let lang = document
        .root_element()
        .value()
        .attr("lang")
        .map(str::to_string);

    let mut raw = String::new();
    let body = Selector::parse("body")
        .ok()
        .and_then(|selector| document.select(&selector).next());
    collect_text(body.unwrap_or_else(|| document.root_element()), &mut raw);

    let text = raw
        .lines()
        .map(collapse_whitespace)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    HtmlText { text, title, lang }
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) => {
                let name = el.name();
                if SKIPPED_ELEMENTS.contains(&name) {
                    continue;
                }
                let Some(child_el) = ElementRef::wrap(child) else {
                    continue;
                };
                let block = BLOCK_ELEMENTS.contains(&name);
                if block {
                    out.push('\n');
                }
                collect_text(child_el, out);
                if block {
                    out.push('\n');
                }
            }
            _ => {}
        }
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Absolute links on the same host as `base`, fragments removed, in document order.
pub fn same_host_links(html: &str, base: &Url) -> Vec<Url> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let mut links: Vec<Url> = Vec::new();
    for anchor in document.select(&selector) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let Ok(mut link) = base.join(href) else {
            continue;
        };
        if !matches!(link.scheme(), "http" | "https") {
            continue;
        }
        if link.host_str() != base.host_str() || link.port_or_known_default() != base.port_or_known_default() {
            continue;
        }
        link.set_fragment(None);
        if !links.contains(&link) {
            links.push(link);
        }
    }
    links
}
