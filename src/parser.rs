use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, instrument};

use crate::model::{RawEntry, UNKNOWN};

/// Compiled CSS selectors for the schedule page markup.
struct Selectors {
    container: Selector,
    link: Selector,
    start: Selector,
    name: Selector,
    text: Selector,
    on_air: Selector,
    profile_image: Selector,
    background_image: Selector,
}

impl Selectors {
    fn compile() -> Self {
        Self {
            container: css("ul#today"),
            link: css("a"),
            start: css("p.start"),
            name: css("p.name"),
            text: css("p.txt"),
            on_air: css("p.cat.now_on_air"),
            profile_image: css("div.icon.clearfix img"),
            background_image: css("figure.left img"),
        }
    }
}

fn css(literal: &str) -> Selector {
    Selector::parse(literal).expect("schedule selector literal is valid CSS")
}

static SELECTORS: LazyLock<Selectors> = LazyLock::new(Selectors::compile);

/// Extract one [`RawEntry`] per `<li>` of the `ul#today` list, in document order.
///
/// A page without the list yields an empty vector: there may simply be nothing
/// scheduled. Each field is looked up independently and falls back to
/// [`UNKNOWN`] on its own.
#[instrument(level = "debug", skip(html), fields(bytes = html.len()))]
pub fn parse(html: &str) -> Vec<RawEntry> {
    let sel = &*SELECTORS;
    let document = Html::parse_document(html);
    let Some(container) = document.select(&sel.container).next() else {
        debug!("No #today list in document; treating as empty schedule");
        return Vec::new();
    };

    let entries: Vec<RawEntry> = container
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == "li")
        .map(|li| parse_item(li, sel))
        .collect();

    debug!(count = entries.len(), "Parsed schedule entries");
    entries
}

fn parse_item(li: ElementRef<'_>, sel: &Selectors) -> RawEntry {
    RawEntry {
        link: first_attr(li, &sel.link, "href"),
        start: first_text(li, &sel.start),
        name: first_text(li, &sel.name),
        description: first_text(li, &sel.text),
        on_air: li.select(&sel.on_air).next().is_some(),
        profile_image_url: first_attr(li, &sel.profile_image, "src"),
        background_image_url: first_attr(li, &sel.background_image, "src"),
    }
}

fn first_text(scope: ElementRef<'_>, selector: &Selector) -> String {
    scope
        .select(selector)
        .next()
        .map(|el| collapse_ws(&el.text().collect::<String>()))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| UNKNOWN.to_string())
}

fn first_attr(scope: ElementRef<'_>, selector: &Selector, attr: &str) -> String {
    scope
        .select(selector)
        .next()
        .and_then(|el| el.value().attr(attr))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| UNKNOWN.to_string())
}

fn collapse_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
