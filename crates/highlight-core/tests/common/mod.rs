//! Fixture PDFs for integration tests

use lopdf::{dictionary, Document, Object, Stream};

/// Every glyph of the fixture font is this wide, in 1/1000 em.
pub const GLYPH_WIDTH: i64 = 500;
pub const FONT_SIZE: f64 = 12.0;
pub const PAGE_HEIGHT: f64 = 792.0;
pub const FIRST_BASELINE: f64 = 700.0;
pub const LINE_GAP: f64 = 20.0;

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('(', "\\(")
        .replace(')', "\\)")
}

/// A US Letter PDF with one page per entry; each line of a page becomes
/// its own text object, `LINE_GAP` below the previous one.
pub fn text_pdf(pages: &[Vec<String>]) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let widths: Vec<Object> = (32..=255).map(|_| Object::Integer(GLYPH_WIDTH)).collect();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "FirstChar" => 32,
        "LastChar" => 255,
        "Widths" => widths,
    });

    let mut kids = Vec::new();
    for lines in pages {
        let mut content = String::new();
        for (i, line) in lines.iter().enumerate() {
            let y = FIRST_BASELINE - LINE_GAP * i as f64;
            content.push_str(&format!(
                "BT /F1 {} Tf 72 {} Td ({}) Tj ET\n",
                FONT_SIZE,
                y,
                escape(line)
            ));
        }
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(pages_id),
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => Object::Reference(content_id),
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => Object::Reference(font_id) },
            },
        });
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

pub fn lines(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Expected width of a fixture line.
pub fn line_width(text: &str) -> f64 {
    text.chars().count() as f64 * GLYPH_WIDTH as f64 / 1000.0 * FONT_SIZE
}
