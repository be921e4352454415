//! Fixtures shared by the pipeline tests.

use std::io::{Cursor, Write};
use std::path::PathBuf;
use std::sync::OnceLock;

use image::{ImageFormat, Rgba, RgbaImage};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use super::render::CertificateRenderer;

pub enum Cell<'a> {
    Text(&'a str),
    Number(f64),
    Bool(bool),
    Empty,
}

/// Builds a minimal single-sheet XLSX package in memory.
pub fn xlsx(rows: &[Vec<Cell<'_>>]) -> Vec<u8> {
    let mut strings: Vec<String> = Vec::new();
    let mut sheet_rows = String::new();

    for (r, row) in rows.iter().enumerate() {
        let mut cells = String::new();
        for (c, cell) in row.iter().enumerate() {
            let reference = format!("{}{}", (b'A' + c as u8) as char, r + 1);
            match cell {
                Cell::Text(text) => {
                    strings.push(xml_escape(text));
                    cells.push_str(&format!(
                        r#"<c r="{}" t="s"><v>{}</v></c>"#,
                        reference,
                        strings.len() - 1
                    ));
                }
                Cell::Number(n) => {
                    cells.push_str(&format!(r#"<c r="{}"><v>{}</v></c>"#, reference, n));
                }
                Cell::Bool(b) => {
                    cells.push_str(&format!(
                        r#"<c r="{}" t="b"><v>{}</v></c>"#,
                        reference,
                        u8::from(*b)
                    ));
                }
                Cell::Empty => {}
            }
        }
        sheet_rows.push_str(&format!(r#"<row r="{}">{}</row>"#, r + 1, cells));
    }

    let shared_strings = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="{0}" uniqueCount="{0}">{1}</sst>"#,
        strings.len(),
        strings
            .iter()
            .map(|s| format!(r#"<si><t xml:space="preserve">{}</t></si>"#, s))
            .collect::<String>()
    );
    let sheet = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>{}</sheetData></worksheet>"#,
        sheet_rows
    );

    let parts: [(&str, &str); 5] = [
        (
            "[Content_Types].xml",
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/><Override PartName="/xl/sharedStrings.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml"/></Types>"#,
        ),
        (
            "_rels/.rels",
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#,
        ),
        (
            "xl/workbook.xml",
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Sheet1" sheetId="1" r:id="rId1"/></sheets></workbook>"#,
        ),
        (
            "xl/_rels/workbook.xml.rels",
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings" Target="sharedStrings.xml"/></Relationships>"#,
        ),
        ("xl/worksheets/sheet1.xml", &sheet),
    ];

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for (name, content) in parts {
        writer.start_file(name, options).unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.start_file("xl/sharedStrings.xml", options).unwrap();
    writer.write_all(shared_strings.as_bytes()).unwrap();
    writer.finish().unwrap().into_inner()
}

fn xml_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// PNG bytes of a solid-colour image.
pub fn solid_png(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba(color));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

/// The 1×1 red pixel used as the end-to-end template.
pub fn red_pixel_png() -> Vec<u8> {
    solid_png(1, 1, [255, 0, 0, 255])
}

/// Directory holding the DejaVu Sans face bundled for tests.
pub fn fonts_fixture_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/fonts")
}

/// A renderer over the system fonts plus the bundled face, so it always has a font.
pub fn renderer() -> &'static CertificateRenderer {
    static RENDERER: OnceLock<CertificateRenderer> = OnceLock::new();
    RENDERER.get_or_init(|| {
        let renderer = CertificateRenderer::with_system_fonts(Some(&fonts_fixture_dir()));
        assert!(
            renderer.has_fonts(),
            "no font faces loaded from {}",
            fonts_fixture_dir().display()
        );
        renderer
    })
}

pub fn decode_png(bytes: &[u8]) -> RgbaImage {
    image::load_from_memory_with_format(bytes, ImageFormat::Png)
        .unwrap()
        .to_rgba8()
}
