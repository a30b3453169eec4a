//! Printable shopping list.
//!
//! [`layout`] decides where every line goes, [`render`] only draws what the
//! layout produced, so the same list always yields the same pages.

use std::hash::{DefaultHasher, Hash, Hasher};
use std::io::Cursor;

use printpdf::lopdf::{self, Object, StringFormat};
use printpdf::{Mm, OffsetDateTime, PdfDocument};
use thiserror::Error;
use tracing::debug;
use ttf_parser::{Face, GlyphId};

use crate::db::shopping::ShoppingList;

static FONT: &[u8] = include_bytes!("../assets/fonts/DejaVuSans.ttf");

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 20.0;
const TEXT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;

const TITLE_SIZE: f32 = 18.0;
const HEADING_SIZE: f32 = 14.0;
const ITEM_SIZE: f32 = 12.0;

const LINE_HEIGHT: f32 = 8.0;
const CONTINUATION_INDENT: f32 = 6.0;
const MM_PER_PT: f32 = 25.4 / 72.0;

pub const HEADING: &str = "Shopping list:";

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("failed to load font: {0}")]
    Font(String),
    #[error("failed to write document: {0}")]
    Write(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    pub text: String,
    pub size: f32,
    /// Millimeters from the left edge
    pub x: f32,
    /// Millimeters from the bottom edge
    pub y: f32,
}

pub type Page = Vec<PlacedLine>;

pub fn format_item(name: &str, unit: &str, amount: i64) -> String {
    format!("- {} ({}) - {}", name, unit, amount)
}

/// Advance widths of the embedded font.
pub struct Metrics {
    face: Face<'static>,
}

impl Metrics {
    pub fn embedded() -> Result<Self, RenderError> {
        let face = Face::parse(FONT, 0).map_err(|e| RenderError::Font(e.to_string()))?;
        Ok(Self { face })
    }

    /// Width of `c` in millimeters at `size` points. Missing glyphs are
    /// drawn as `.notdef` and measured as such.
    fn char_width(&self, c: char, size: f32) -> f32 {
        let glyph = self.face.glyph_index(c).unwrap_or(GlyphId(0));
        let advance = self.face.glyph_hor_advance(glyph).unwrap_or(0);
        advance as f32 / self.face.units_per_em() as f32 * size * MM_PER_PT
    }

    pub fn text_width(&self, text: &str, size: f32) -> f32 {
        text.chars().map(|c| self.char_width(c, size)).sum()
    }

    /// Splits `text` on whitespace into lines no wider than `first` for the
    /// first line and `rest` for the others. A word wider than a whole line
    /// is broken, starting on the line it follows.
    fn wrap(&self, text: &str, size: f32, first: f32, rest: f32) -> Vec<String> {
        let limit = |n: usize| if n == 0 { first } else { rest };
        let space = self.char_width(' ', size);

        let mut lines = vec![];
        let mut current = String::new();
        let mut used = 0.0;

        for word in text.split_whitespace() {
            let width = self.text_width(word, size);
            let gap = if current.is_empty() { 0.0 } else { space };
            if used + gap + width <= limit(lines.len()) {
                if !current.is_empty() {
                    current.push(' ');
                }
                current.push_str(word);
                used += gap + width;
                continue;
            }
            if width <= rest {
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
                current.push_str(word);
                used = width;
                continue;
            }

            if !current.is_empty() {
                current.push(' ');
                used += space;
            }
            for c in word.chars() {
                let w = self.char_width(c, size);
                if !current.trim_end().is_empty() && used + w > limit(lines.len()) {
                    lines.push(current.trim_end().to_string());
                    current.clear();
                    used = 0.0;
                }
                current.push(c);
                used += w;
            }
        }
        if !current.is_empty() || lines.is_empty() {
            lines.push(current);
        }
        lines
    }
}

struct Typesetter {
    pages: Vec<Page>,
    current: Page,
    y: f32,
}

impl Typesetter {
    fn new() -> Self {
        Self {
            pages: vec![],
            current: vec![],
            y: PAGE_HEIGHT - MARGIN,
        }
    }

    fn place(&mut self, text: String, size: f32, x: f32) {
        if self.y < MARGIN {
            self.pages.push(std::mem::take(&mut self.current));
            self.y = PAGE_HEIGHT - MARGIN;
        }
        self.current.push(PlacedLine {
            text,
            size,
            x,
            y: self.y,
        });
        self.y -= LINE_HEIGHT;
    }

    fn skip(&mut self) {
        self.y -= LINE_HEIGHT;
    }

    fn finish(mut self) -> Vec<Page> {
        self.pages.push(self.current);
        self.pages
    }
}

/// Lays out the title, the heading and one entry per ingredient, starting a
/// new page whenever the bottom margin is reached.
pub fn layout(metrics: &Metrics, title: &str, list: &ShoppingList) -> Vec<Page> {
    let mut cursor = Typesetter::new();

    for line in metrics.wrap(title, TITLE_SIZE, TEXT_WIDTH, TEXT_WIDTH) {
        cursor.place(line, TITLE_SIZE, MARGIN);
    }
    cursor.skip();
    cursor.place(HEADING.to_string(), HEADING_SIZE, MARGIN);

    for ((name, unit), amount) in list {
        let item = format_item(name, unit, *amount);
        let lines = metrics.wrap(
            &item,
            ITEM_SIZE,
            TEXT_WIDTH,
            TEXT_WIDTH - CONTINUATION_INDENT,
        );
        for (i, line) in lines.into_iter().enumerate() {
            let x = if i == 0 {
                MARGIN
            } else {
                MARGIN + CONTINUATION_INDENT
            };
            cursor.place(line, ITEM_SIZE, x);
        }
    }
    cursor.finish()
}

/// Document id derived from the laid out text, so equal lists share it.
fn document_id(pages: &[Page]) -> String {
    let mut hasher = DefaultHasher::new();
    for line in pages.iter().flatten() {
        line.text.hash(&mut hasher);
    }
    pages.len().hash(&mut hasher);
    format!("{:032x}", hasher.finish())
}

/// printpdf always writes a random instance id into the trailer.
fn pin_trailer_id(bytes: &[u8], id: &str) -> Result<Vec<u8>, RenderError> {
    let mut doc = lopdf::Document::load_mem(bytes).map_err(|e| RenderError::Write(e.to_string()))?;
    let id = Object::String(id.as_bytes().to_vec(), StringFormat::Literal);
    doc.trailer.set("ID", Object::Array(vec![id.clone(), id]));

    let mut out = Vec::with_capacity(bytes.len());
    doc.save_to(&mut out)
        .map_err(|e| RenderError::Write(e.to_string()))?;
    Ok(out)
}

/// Renders the shopping list as an A4 PDF with an embedded Unicode font.
///
/// Dates and ids are fixed, so the same list always gives the same bytes.
pub fn render(title: &str, list: &ShoppingList) -> Result<Vec<u8>, RenderError> {
    let metrics = Metrics::embedded()?;
    let pages = layout(&metrics, title, list);
    let id = document_id(&pages);

    let (doc, first_page, first_layer) =
        PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
    let doc = doc
        .with_document_id(id.clone())
        .with_creation_date(OffsetDateTime::UNIX_EPOCH)
        .with_mod_date(OffsetDateTime::UNIX_EPOCH)
        .with_metadata_date(OffsetDateTime::UNIX_EPOCH);
    let font = doc
        .add_external_font(Cursor::new(FONT))
        .map_err(|e| RenderError::Font(format!("{:?}", e)))?;

    for (i, page) in pages.iter().enumerate() {
        let (page_index, layer_index) = if i == 0 {
            (first_page, first_layer)
        } else {
            doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1")
        };
        let layer = doc.get_page(page_index).get_layer(layer_index);
        for line in page {
            layer.use_text(line.text.as_str(), line.size, Mm(line.x), Mm(line.y), &font);
        }
    }

    let bytes = doc
        .save_to_bytes()
        .map_err(|e| RenderError::Write(format!("{:?}", e)))?;
    let bytes = pin_trailer_id(&bytes, &id)?;
    debug!(pages = pages.len(), items = list.len(), size = bytes.len(), "shopping list rendered");
    Ok(bytes)
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use super::*;

    const RIGHT_EDGE: f32 = PAGE_WIDTH - MARGIN + 1e-3;

    fn list(items: &[(&str, &str, i64)]) -> ShoppingList {
        items
            .iter()
            .map(|(name, unit, amount)| ((name.to_string(), unit.to_string()), *amount))
            .collect()
    }

    fn texts(pages: &[Page]) -> Vec<&str> {
        pages
            .iter()
            .flat_map(|p| p.iter().map(|l| l.text.as_str()))
            .collect()
    }

    fn assert_within_margins(metrics: &Metrics, pages: &[Page]) {
        for line in pages.iter().flatten() {
            let right = line.x + metrics.text_width(&line.text, line.size);
            assert!(right <= RIGHT_EDGE, "{:?} ends at {}mm", line.text, right);
        }
    }

    #[test]
    fn single_page_listing() {
        let metrics = Metrics::embedded().unwrap();
        let list = list(&[("flour", "g", 500), ("egg", "unit", 2), ("milk", "unit", 1)]);
        let pages = layout(&metrics, "Foodgram", &list);
        assert_eq!(pages.len(), 1);
        assert_eq!(
            texts(&pages),
            vec![
                "Foodgram",
                "Shopping list:",
                "- flour (g) - 500",
                "- egg (unit) - 2",
                "- milk (unit) - 1",
            ]
        );
        let ys: Vec<f32> = pages[0].iter().map(|l| l.y).collect();
        assert!(ys.windows(2).all(|w| w[0] > w[1]));
    }

    #[test]
    fn layout_is_deterministic() {
        let metrics = Metrics::embedded().unwrap();
        let list = list(&[("мука", "г", 500), ("яйцо", "шт", 2)]);
        assert_eq!(
            layout(&metrics, "Foodgram", &list),
            layout(&metrics, "Foodgram", &list)
        );
        assert_eq!(texts(&layout(&metrics, "Foodgram", &list))[2], "- мука (г) - 500");
    }

    #[test]
    fn same_list_renders_same_bytes() {
        let flour = list(&[("мука", "г", 500)]);
        let first = render("Foodgram", &flour).unwrap();
        // dates are stored with second precision
        std::thread::sleep(Duration::from_millis(1100));
        let second = render("Foodgram", &flour).unwrap();
        assert!(first == second, "renders differ");

        let other = render("Foodgram", &list(&[("мука", "г", 501)])).unwrap();
        assert!(first != other);
    }

    #[test]
    fn overflow_starts_new_pages() {
        let metrics = Metrics::embedded().unwrap();
        let names: Vec<String> = (0..100).map(|i| format!("ingredient {:03}", i)).collect();
        let list: ShoppingList = names
            .iter()
            .map(|n| ((n.clone(), "g".to_string()), 1))
            .collect();
        let pages = layout(&metrics, "Foodgram", &list);
        assert!(pages.len() > 1);

        let lines = texts(&pages);
        assert_eq!(lines.len(), 102);
        assert_eq!(lines[2], "- ingredient 000 (g) - 1");
        assert_eq!(lines[101], "- ingredient 099 (g) - 1");
        for page in &pages {
            assert!(page.iter().all(|l| l.y >= MARGIN && l.y <= PAGE_HEIGHT - MARGIN));
        }
        // continuation pages start at the top with an item
        assert!(pages[1][0].text.starts_with("- ingredient"));
        assert_eq!(pages[1][0].y, PAGE_HEIGHT - MARGIN);
    }

    #[test]
    fn long_names_wrap() {
        let metrics = Metrics::embedded().unwrap();
        let name = "very ".repeat(40);
        let list = list(&[(name.trim(), "g", 1)]);
        let pages = layout(&metrics, "Foodgram", &list);
        let items: Vec<&PlacedLine> = pages[0].iter().skip(2).collect();
        assert!(items.len() > 1);
        assert_eq!(items[0].x, MARGIN);
        assert_eq!(items[1].x, MARGIN + CONTINUATION_INDENT);
        assert!(items.last().unwrap().text.ends_with("(g) - 1"));
        assert_within_margins(&metrics, &pages);
    }

    #[test]
    fn wide_glyphs_stay_inside_the_margin() {
        let metrics = Metrics::embedded().unwrap();
        let list = list(&[
            ("Ш".repeat(72).as_str(), "г", 1),
            ("WWWW ".repeat(30).trim(), "g", 2),
            (
                "мука пшеничная хлебопекарная высшего сорта цельнозерновая шлифованная",
                "г",
                500,
            ),
        ]);
        let pages = layout(&metrics, "Щедрый ужин: покупки на неделю для большой семьи", &list);
        assert_within_margins(&metrics, &pages);

        let joined: String = texts(&pages)[2..].concat();
        assert_eq!(joined.matches('Ш').count(), 72);
    }

    #[test]
    fn bullet_stays_with_an_unbreakable_name() {
        let metrics = Metrics::embedded().unwrap();
        let name = "x".repeat(200);
        let pages = layout(&metrics, "Foodgram", &list(&[(name.as_str(), "g", 1)]));
        let first_item = &pages[0][2];
        assert!(first_item.text.starts_with("- x"), "{:?}", first_item.text);
        assert!(pages.iter().flatten().all(|l| l.text.trim() != "-"));
        assert_within_margins(&metrics, &pages);
    }

    #[test]
    fn wrap_breaks_long_words() {
        let metrics = Metrics::embedded().unwrap();
        let three = metrics.text_width("aaa", ITEM_SIZE) + 1e-3;
        assert_eq!(
            metrics.wrap("aaaaaaaa", ITEM_SIZE, three, three),
            vec!["aaa", "aaa", "aa"]
        );

        let limit = metrics.text_width("ab cd", ITEM_SIZE) + 1e-3;
        assert_eq!(
            metrics.wrap("ab cd ef", ITEM_SIZE, limit, limit),
            vec!["ab cd", "ef"]
        );
        assert_eq!(metrics.wrap("", ITEM_SIZE, limit, limit), vec![""]);
    }

    #[test]
    fn empty_list_is_a_valid_document() {
        let metrics = Metrics::embedded().unwrap();
        let pages = layout(&metrics, "Foodgram", &ShoppingList::new());
        assert_eq!(texts(&pages), vec!["Foodgram", HEADING]);

        let bytes = render("Foodgram", &ShoppingList::new()).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn renders_non_latin_text() {
        let list = list(&[("мука пшеничная", "г", 500), ("γάλα", "ml", 200)]);
        let bytes = render("Фудграм", &list).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
