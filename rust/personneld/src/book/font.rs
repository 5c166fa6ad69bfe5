//! TrueType fonts embedded in the cover page. Text set in an embedded font
//! is written as two-byte glyph ids (`Identity-H`), so any script the font
//! has glyphs for comes out as drawn rather than as `?`.

use anyhow::{anyhow, Context};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use std::collections::BTreeMap;
use std::path::Path;
use ttf_parser::{name_id, Face, GlyphId};

const FALLBACK_NAME: &str = "CoverFont";

#[derive(Debug, Clone)]
pub struct CoverFont {
    name: String,
    data: Vec<u8>,
}

impl CoverFont {
    pub fn from_bytes(data: Vec<u8>) -> anyhow::Result<Self> {
        let face = Face::parse(&data, 0).map_err(|e| anyhow!("not a usable TrueType font: {}", e))?;
        let name = face
            .names()
            .into_iter()
            .filter(|n| n.name_id == name_id::POST_SCRIPT_NAME)
            .find_map(|n| n.to_string())
            .map(|n| {
                n.chars()
                    .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
                    .collect::<String>()
            })
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| FALLBACK_NAME.to_string());
        Ok(Self { name, data })
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let data = std::fs::read(path)
            .with_context(|| format!("failed to read font {}", path.to_string_lossy()))?;
        Self::from_bytes(data)
            .with_context(|| format!("failed to load font {}", path.to_string_lossy()))
    }

    /// PostScript name written as the PDF `BaseFont`.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Turns text into glyph ids for one document and records which glyphs were
/// shown, for the width table and the `ToUnicode` map.
pub(crate) struct GlyphEncoder<'a> {
    font: &'a CoverFont,
    face: Face<'a>,
    used: BTreeMap<u16, char>,
}

impl<'a> GlyphEncoder<'a> {
    pub(crate) fn new(font: &'a CoverFont) -> anyhow::Result<Self> {
        let face = Face::parse(&font.data, 0).map_err(|e| anyhow!("font parse failed: {}", e))?;
        Ok(Self {
            font,
            face,
            used: BTreeMap::new(),
        })
    }

    /// Big-endian glyph ids. Characters the font lacks map to glyph 0.
    pub(crate) fn encode(&mut self, text: &str) -> Vec<u8> {
        let mut out = Vec::with_capacity(text.len() * 2);
        for c in text.chars() {
            let gid = self.face.glyph_index(c).map(|g| g.0).unwrap_or(0);
            self.used.entry(gid).or_insert(c);
            out.extend_from_slice(&gid.to_be_bytes());
        }
        out
    }

    fn scaled(&self, units: i32) -> i64 {
        i64::from(units) * 1000 / i64::from(self.face.units_per_em().max(1))
    }

    /// Adds the font program, descriptor and CID font, and stores the
    /// `Type0` font dictionary under `font_id`.
    pub(crate) fn write_objects(self, doc: &mut Document, font_id: ObjectId) -> anyhow::Result<()> {
        let base_font = Object::Name(self.font.name.as_bytes().to_vec());
        let bbox = self.face.global_bounding_box();
        let ascent = self.scaled(self.face.ascender().into());

        let file_id = doc.add_object(Stream::new(
            dictionary! { "Length1" => Object::Integer(self.font.data.len() as i64) },
            self.font.data.clone(),
        ));
        let descriptor_id = doc.add_object(dictionary! {
            "Type" => "FontDescriptor",
            "FontName" => base_font.clone(),
            "Flags" => Object::Integer(32),
            "FontBBox" => vec![
                Object::Integer(self.scaled(bbox.x_min.into())),
                Object::Integer(self.scaled(bbox.y_min.into())),
                Object::Integer(self.scaled(bbox.x_max.into())),
                Object::Integer(self.scaled(bbox.y_max.into())),
            ],
            "ItalicAngle" => Object::Integer(0),
            "Ascent" => Object::Integer(ascent),
            "Descent" => Object::Integer(self.scaled(self.face.descender().into())),
            "CapHeight" => Object::Integer(ascent),
            "StemV" => Object::Integer(80),
            "FontFile2" => file_id,
        });

        let mut widths = Vec::with_capacity(self.used.len() * 2);
        for gid in self.used.keys() {
            let advance = self
                .face
                .glyph_hor_advance(GlyphId(*gid))
                .map(|a| self.scaled(a.into()))
                .unwrap_or(0);
            widths.push(Object::Integer(i64::from(*gid)));
            widths.push(Object::Array(vec![Object::Integer(advance)]));
        }
        let cid_font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "CIDFontType2",
            "BaseFont" => base_font.clone(),
            "CIDSystemInfo" => dictionary! {
                "Registry" => Object::string_literal("Adobe"),
                "Ordering" => Object::string_literal("Identity"),
                "Supplement" => Object::Integer(0),
            },
            "FontDescriptor" => descriptor_id,
            "DW" => Object::Integer(1000),
            "W" => widths,
            "CIDToGIDMap" => "Identity",
        });
        let to_unicode_id = doc.add_object(Stream::new(dictionary! {}, to_unicode_cmap(&self.used)));

        doc.objects.insert(
            font_id,
            Object::Dictionary(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type0",
                "BaseFont" => base_font,
                "Encoding" => "Identity-H",
                "DescendantFonts" => vec![Object::Reference(cid_font_id)],
                "ToUnicode" => to_unicode_id,
            }),
        );
        Ok(())
    }
}

fn to_unicode_cmap(used: &BTreeMap<u16, char>) -> Vec<u8> {
    let entries: Vec<String> = used
        .iter()
        .filter(|(gid, _)| **gid != 0)
        .map(|(gid, c)| {
            let mut buf = [0u16; 2];
            let utf16: String = c
                .encode_utf16(&mut buf)
                .iter()
                .map(|u| format!("{:04X}", u))
                .collect();
            format!("<{:04X}> <{}>", gid, utf16)
        })
        .collect();

    let mut out = String::from(
        "/CIDInit /ProcSet findresource begin\n12 dict begin\nbegincmap\n\
         /CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n\
         /CMapName /Adobe-Identity-UCS def\n/CMapType 2 def\n\
         1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n",
    );
    // bfchar blocks hold at most 100 entries.
    for chunk in entries.chunks(100) {
        out.push_str(&format!("{} beginbfchar\n", chunk.len()));
        for entry in chunk {
            out.push_str(entry);
            out.push('\n');
        }
        out.push_str("endbfchar\n");
    }
    out.push_str("endcmap\nCMapName currentdict /CMap defineresource pop\nend\nend\n");
    out.into_bytes()
}

/// A minimal TrueType file: `head`, `hhea`, `maxp`, `hmtx` and a format 12
/// `cmap`, no outlines. Glyph 0 is `.notdef`; the given characters get ids
/// 1.. in code point order.
#[cfg(test)]
pub(crate) fn tiny_font(glyphs: &[(char, u16)]) -> Vec<u8> {
    let mut glyphs = glyphs.to_vec();
    glyphs.sort_by_key(|(c, _)| *c);
    let num_glyphs = glyphs.len() as u16 + 1;

    let mut head = Vec::new();
    head.extend_from_slice(&0x0001_0000u32.to_be_bytes());
    head.extend_from_slice(&0x0001_0000u32.to_be_bytes());
    head.extend_from_slice(&0u32.to_be_bytes());
    head.extend_from_slice(&0x5F0F_3CF5u32.to_be_bytes());
    head.extend_from_slice(&0u16.to_be_bytes());
    head.extend_from_slice(&1000u16.to_be_bytes());
    head.extend_from_slice(&[0u8; 16]);
    for v in [0i16, -200, 1000, 800] {
        head.extend_from_slice(&v.to_be_bytes());
    }
    head.extend_from_slice(&[0u8; 6]);
    head.extend_from_slice(&0i16.to_be_bytes());
    head.extend_from_slice(&0i16.to_be_bytes());

    let mut hhea = Vec::new();
    hhea.extend_from_slice(&0x0001_0000u32.to_be_bytes());
    for v in [800i16, -200, 0] {
        hhea.extend_from_slice(&v.to_be_bytes());
    }
    hhea.extend_from_slice(&1000u16.to_be_bytes());
    hhea.extend_from_slice(&[0u8; 22]);
    hhea.extend_from_slice(&num_glyphs.to_be_bytes());

    let mut maxp = Vec::new();
    maxp.extend_from_slice(&0x0000_5000u32.to_be_bytes());
    maxp.extend_from_slice(&num_glyphs.to_be_bytes());

    let mut hmtx = Vec::new();
    for advance in std::iter::once(500u16).chain(glyphs.iter().map(|(_, a)| *a)) {
        hmtx.extend_from_slice(&advance.to_be_bytes());
        hmtx.extend_from_slice(&0i16.to_be_bytes());
    }

    let mut cmap = Vec::new();
    for v in [0u16, 1, 3, 10] {
        cmap.extend_from_slice(&v.to_be_bytes());
    }
    cmap.extend_from_slice(&12u32.to_be_bytes());
    cmap.extend_from_slice(&12u16.to_be_bytes());
    cmap.extend_from_slice(&0u16.to_be_bytes());
    cmap.extend_from_slice(&(16 + 12 * glyphs.len() as u32).to_be_bytes());
    cmap.extend_from_slice(&0u32.to_be_bytes());
    cmap.extend_from_slice(&(glyphs.len() as u32).to_be_bytes());
    for (i, (c, _)) in glyphs.iter().enumerate() {
        cmap.extend_from_slice(&(*c as u32).to_be_bytes());
        cmap.extend_from_slice(&(*c as u32).to_be_bytes());
        cmap.extend_from_slice(&(i as u32 + 1).to_be_bytes());
    }

    let tables: [(&[u8; 4], Vec<u8>); 5] = [
        (b"cmap", cmap),
        (b"head", head),
        (b"hhea", hhea),
        (b"hmtx", hmtx),
        (b"maxp", maxp),
    ];
    let mut out = Vec::new();
    out.extend_from_slice(&0x0001_0000u32.to_be_bytes());
    for v in [5u16, 64, 2, 16] {
        out.extend_from_slice(&v.to_be_bytes());
    }
    let mut offset = 12 + 16 * tables.len();
    let mut body = Vec::new();
    for (tag, data) in &tables {
        out.extend_from_slice(*tag);
        out.extend_from_slice(&0u32.to_be_bytes());
        out.extend_from_slice(&(offset as u32).to_be_bytes());
        out.extend_from_slice(&(data.len() as u32).to_be_bytes());
        body.extend_from_slice(data);
        while body.len() % 4 != 0 {
            body.push(0);
        }
        offset = 12 + 16 * tables.len() + body.len();
    }
    out.extend_from_slice(&body);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_font_and_falls_back_to_generic_name() {
        let font = CoverFont::from_bytes(tiny_font(&[('A', 600)])).unwrap();
        assert_eq!(font.name(), FALLBACK_NAME);
    }

    #[test]
    fn rejects_bytes_that_are_not_a_font() {
        assert!(CoverFont::from_bytes(b"%PDF-1.5 not a font".to_vec()).is_err());
        assert!(CoverFont::load(Path::new("/no/such/font.ttf")).is_err());
    }

    #[test]
    fn encodes_thai_to_glyph_ids_and_maps_them_back() {
        let font =
            CoverFont::from_bytes(tiny_font(&[('\u{0e04}', 550), ('\u{0e23}', 500), ('\u{0e39}', 0)]))
                .unwrap();
        let mut glyphs = GlyphEncoder::new(&font).unwrap();
        assert_eq!(glyphs.encode("\u{0e04}\u{0e23}\u{0e39}"), vec![0, 1, 0, 2, 0, 3]);
        assert_eq!(glyphs.encode("Z"), vec![0, 0]);

        let cmap = String::from_utf8(to_unicode_cmap(&glyphs.used)).unwrap();
        assert!(cmap.contains("3 beginbfchar"));
        assert!(cmap.contains("<0001> <0E04>"));
        assert!(cmap.contains("<0003> <0E39>"));
        assert!(!cmap.contains("<0000> <005A>"));
    }
}
