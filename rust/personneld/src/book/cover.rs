use super::font::{CoverFont, GlyphEncoder};
use crate::auth::FormState;
use anyhow::Context;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};

const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;
const MARGIN_LEFT: i64 = 57;
const MARGIN_TOP: i64 = 45;
const MARGIN_BOTTOM: i64 = 45;
const WRAP_COLUMNS: usize = 88;

const TITLE: &str = "Performance Agreement (PA) - Form Summary";
const SUMMARY_HEADING: &str = "Summary";

struct Line {
    bold: bool,
    size: i64,
    leading: i64,
    text: String,
}

/// How line text reaches the page.
enum Faces<'a> {
    /// Helvetica by reference, WinAnsi bytes.
    Standard,
    /// One embedded TrueType face for every line, glyph ids.
    Embedded(GlyphEncoder<'a>),
}

impl Faces<'_> {
    fn show(&mut self, line: &Line) -> (&'static str, Object) {
        match self {
            Self::Standard => (
                if line.bold { "F2" } else { "F1" },
                Object::string_literal(encode_win_ansi(&line.text)),
            ),
            Self::Embedded(glyphs) => (
                "F1",
                Object::String(glyphs.encode(&line.text), StringFormat::Hexadecimal),
            ),
        }
    }
}

/// Renders the form cover page. The output depends only on the arguments.
/// Characters outside Latin-1 are drawn as `?` since only the standard
/// Helvetica faces are used; see [`render_cover_with_font`] for other scripts.
pub fn render_cover(
    identifier: &str,
    display_name: &str,
    form: &FormState,
) -> anyhow::Result<Vec<u8>> {
    render(identifier, display_name, form, None)
}

/// Same layout as [`render_cover`] with every line set in `font`, which is
/// embedded in the output.
pub fn render_cover_with_font(
    identifier: &str,
    display_name: &str,
    form: &FormState,
    font: &CoverFont,
) -> anyhow::Result<Vec<u8>> {
    render(identifier, display_name, form, Some(font))
}

fn layout(identifier: &str, display_name: &str, form: &FormState) -> Vec<Line> {
    let mut lines = vec![
        Line {
            bold: true,
            size: 18,
            leading: 26,
            text: TITLE.to_string(),
        },
        Line {
            bold: false,
            size: 11,
            leading: 22,
            text: format!("Teacher: {}  |  ID: {}", display_name, identifier),
        },
        Line {
            bold: true,
            size: 14,
            leading: 20,
            text: SUMMARY_HEADING.to_string(),
        },
    ];
    for text in wrap_text(&form.summary, WRAP_COLUMNS) {
        lines.push(Line {
            bold: false,
            size: 11,
            leading: 15,
            text,
        });
    }
    lines
}

fn render(
    identifier: &str,
    display_name: &str,
    form: &FormState,
    font: Option<&CoverFont>,
) -> anyhow::Result<Vec<u8>> {
    let lines = layout(identifier, display_name, form);
    let mut faces = match font {
        Some(f) => Faces::Embedded(GlyphEncoder::new(f)?),
        None => Faces::Standard,
    };

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    // The embedded font dictionary is written once every glyph is known.
    let (fonts, embedded_id) = match &faces {
        Faces::Standard => {
            let regular = doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => "Helvetica",
                "Encoding" => "WinAnsiEncoding",
            });
            let bold = doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => "Helvetica-Bold",
                "Encoding" => "WinAnsiEncoding",
            });
            (dictionary! { "F1" => regular, "F2" => bold }, None)
        }
        Faces::Embedded(_) => {
            let id = doc.new_object_id();
            (dictionary! { "F1" => id }, Some(id))
        }
    };
    let resources_id = doc.add_object(dictionary! { "Font" => fonts });

    let mut kids: Vec<Object> = Vec::new();
    for page_lines in paginate(&lines) {
        let page_id = add_page(&mut doc, pages_id, resources_id, page_lines, &mut faces)?;
        kids.push(Object::Reference(page_id));
    }
    if let (Faces::Embedded(glyphs), Some(id)) = (faces, embedded_id) {
        glyphs.write_objects(&mut doc, id)?;
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
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out)
        .context("failed to write cover page")?;
    Ok(out)
}

fn paginate(lines: &[Line]) -> Vec<&[Line]> {
    let usable = PAGE_HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;
    let mut pages = Vec::new();
    let mut start = 0usize;
    let mut used = 0i64;
    for (i, line) in lines.iter().enumerate() {
        if used + line.leading > usable && i > start {
            pages.push(&lines[start..i]);
            start = i;
            used = 0;
        }
        used += line.leading;
    }
    pages.push(&lines[start..]);
    pages
}

fn add_page(
    doc: &mut Document,
    pages_id: ObjectId,
    resources_id: ObjectId,
    lines: &[Line],
    faces: &mut Faces<'_>,
) -> anyhow::Result<ObjectId> {
    let mut operations = Vec::new();
    let mut y = PAGE_HEIGHT - MARGIN_TOP;
    for line in lines {
        y -= line.leading;
        let (font_name, text) = faces.show(line);
        operations.push(Operation::new("BT", vec![]));
        operations.push(Operation::new(
            "Tf",
            vec![Object::Name(font_name.as_bytes().to_vec()), Object::Integer(line.size)],
        ));
        operations.push(Operation::new(
            "Td",
            vec![Object::Integer(MARGIN_LEFT), Object::Integer(y)],
        ));
        operations.push(Operation::new("Tj", vec![text]));
        operations.push(Operation::new("ET", vec![]));
    }
    let content = Content { operations }
        .encode()
        .context("failed to encode cover content")?;
    let content_id = doc.add_object(Stream::new(dictionary! {}, content));
    Ok(doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => resources_id,
        "MediaBox" => vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(PAGE_WIDTH),
            Object::Integer(PAGE_HEIGHT),
        ],
    }))
}

fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c as u32 {
            v @ 0x20..=0x7e | v @ 0xa0..=0xff => v as u8,
            _ => b'?',
        })
        .collect()
}

fn wrap_text(text: &str, columns: usize) -> Vec<String> {
    let mut out = Vec::new();
    for paragraph in text.lines() {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let mut word = word.to_string();
            while word.chars().count() > columns {
                if !current.is_empty() {
                    out.push(std::mem::take(&mut current));
                }
                let head: String = word.chars().take(columns).collect();
                word = word.chars().skip(columns).collect();
                out.push(head);
            }
            let needed = if current.is_empty() {
                word.chars().count()
            } else {
                current.chars().count() + 1 + word.chars().count()
            };
            if needed > columns && !current.is_empty() {
                out.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(&word);
        }
        out.push(current);
    }
    out
}
