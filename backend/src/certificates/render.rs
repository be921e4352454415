//! # Certificate Renderer
//!
//! Produces one certificate image per recipient on a fixed 3508×2480 canvas (A4 landscape
//! at 300 DPI), regardless of the template's own resolution.
//!
//! ## Drawing steps
//!
//! 1.  **Background**: image templates are stretched to fill the whole canvas (no
//!     letterboxing). PDF templates are not rasterized; the canvas is filled white instead.
//! 2.  **Name**: the recipient's name is centred horizontally and vertically on the point
//!     `(x% of width, y% of height)` given by the name position, using the chosen font
//!     stack at four times the preview font size.
//! 3.  **Shadow**: a fixed soft drop shadow (30% black, blur 8, offset 4/4) sits under the
//!     text.
//! 4.  **Encoding**: the canvas is written out as an RGBA PNG.
//!
//! The template is decoded once per batch through [`CertificateRenderer::prepare`]; every
//! call to [`CertificateRenderer::render`] then draws onto its own freshly allocated canvas.

use std::path::Path;
use std::sync::Arc;

use common::model::certificate::TemplateType;
use resvg::tiny_skia::{self, FilterQuality, IntSize, Pixmap, PixmapPaint, Transform};
use usvg::fontdb::Database;

use super::error::CertificateError;
use super::fonts;
use super::settings::CertificateSettings;

pub const CANVAS_WIDTH: u32 = 3508;
pub const CANVAS_HEIGHT: u32 = 2480;
/// Preview font sizes are scaled by this factor to match the canvas resolution.
pub const FONT_SCALE: u32 = 4;
/// Canvas-style shadow blur radius; the Gaussian deviation is half of it.
pub const SHADOW_BLUR: f32 = 8.0;
pub const SHADOW_OFFSET: (f32, f32) = (4.0, 4.0);
pub const SHADOW_OPACITY: f32 = 0.3;
/// Placeholder name shown by the preview step.
pub const PREVIEW_NAME: &str = "John Doe";

/// A decoded template, ready to be drawn under any number of names.
pub struct PreparedTemplate {
    background: Background,
    settings: CertificateSettings,
}

enum Background {
    Image(Pixmap),
    Blank,
}

impl PreparedTemplate {
    pub fn settings(&self) -> &CertificateSettings {
        &self.settings
    }
}

/// Renders certificates; cheap to clone and share between threads.
#[derive(Clone)]
pub struct CertificateRenderer {
    fonts: Arc<Database>,
}

impl CertificateRenderer {
    pub fn new(fonts: Arc<Database>) -> Self {
        Self { fonts }
    }

    /// Uses the system fonts plus any font files found in `fonts_dir`.
    pub fn with_system_fonts(fonts_dir: Option<&Path>) -> Self {
        Self::new(fonts::build_font_db(fonts_dir))
    }

    pub fn has_fonts(&self) -> bool {
        !self.fonts.is_empty()
    }

    /// Decodes the template once so that a batch does not pay for it per recipient.
    pub fn prepare(
        &self,
        settings: &CertificateSettings,
    ) -> Result<PreparedTemplate, CertificateError> {
        let background = match settings.template_type {
            TemplateType::Image => Background::Image(decode_template(settings)?),
            TemplateType::Pdf => Background::Blank,
        };
        Ok(PreparedTemplate {
            background,
            settings: settings.clone(),
        })
    }

    /// Renders one certificate and returns its PNG bytes.
    pub fn render(
        &self,
        name: &str,
        prepared: &PreparedTemplate,
    ) -> Result<Vec<u8>, CertificateError> {
        let canvas = self.render_pixmap(name, prepared)?;
        encode_png(&canvas).map_err(|e| CertificateError::render(name, e))
    }

    /// One-shot helper: prepare and render a single certificate.
    pub fn render_one(
        &self,
        name: &str,
        settings: &CertificateSettings,
    ) -> Result<Vec<u8>, CertificateError> {
        let prepared = self.prepare(settings)?;
        self.render(name, &prepared)
    }

    /// Renders the preview step's placeholder name, or `name` when given.
    pub fn render_preview(
        &self,
        settings: &CertificateSettings,
        name: Option<&str>,
    ) -> Result<Vec<u8>, CertificateError> {
        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(PREVIEW_NAME);
        self.render_one(name, settings)
    }

    fn render_pixmap(
        &self,
        name: &str,
        prepared: &PreparedTemplate,
    ) -> Result<Pixmap, CertificateError> {
        if !self.has_fonts() {
            return Err(CertificateError::render(name, "no fonts installed"));
        }

        let mut canvas = Pixmap::new(CANVAS_WIDTH, CANVAS_HEIGHT)
            .ok_or_else(|| CertificateError::render(name, "failed to allocate canvas"))?;

        match &prepared.background {
            Background::Image(template) => {
                let sx = CANVAS_WIDTH as f32 / template.width() as f32;
                let sy = CANVAS_HEIGHT as f32 / template.height() as f32;
                let paint = PixmapPaint {
                    quality: FilterQuality::Bicubic,
                    ..PixmapPaint::default()
                };
                canvas.draw_pixmap(
                    0,
                    0,
                    template.as_ref(),
                    &paint,
                    Transform::from_scale(sx, sy),
                    None,
                );
            }
            Background::Blank => canvas.fill(tiny_skia::Color::WHITE),
        }

        let svg = name_overlay_svg(name, prepared.settings())
            .map_err(|e| CertificateError::render(name, e))?;
        let options = usvg::Options {
            fontdb: Arc::clone(&self.fonts),
            font_resolver: fonts::font_resolver(),
            ..usvg::Options::default()
        };
        let tree = usvg::Tree::from_str(&svg, &options)
            .map_err(|e| CertificateError::render(name, e.to_string()))?;
        resvg::render(&tree, Transform::identity(), &mut canvas.as_mut());

        Ok(canvas)
    }
}

/// Decodes the template into a premultiplied pixmap.
pub fn decode_template(settings: &CertificateSettings) -> Result<Pixmap, CertificateError> {
    let bytes = settings.template_bytes()?;
    let image = image::load_from_memory(&bytes)
        .map_err(|e| CertificateError::TemplateDecode(e.to_string()))?
        .to_rgba8();
    let (width, height) = image.dimensions();

    let mut data = image.into_raw();
    for px in data.chunks_exact_mut(4) {
        let c = tiny_skia::ColorU8::from_rgba(px[0], px[1], px[2], px[3]).premultiply();
        px.copy_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
    }

    let size = IntSize::from_wh(width, height)
        .ok_or_else(|| CertificateError::TemplateDecode("template has no pixels".to_string()))?;
    Pixmap::from_vec(data, size)
        .ok_or_else(|| CertificateError::TemplateDecode("template is too large".to_string()))
}

/// SVG document holding only the name and its shadow, sized like the canvas.
fn name_overlay_svg(name: &str, settings: &CertificateSettings) -> Result<String, String> {
    let (r, g, b, a) = parse_hex_color(&settings.text_color)
        .ok_or_else(|| format!("invalid text colour '{}'", settings.text_color))?;
    let position = settings.name_position.clamped();
    let x = position.x / 100.0 * CANVAS_WIDTH as f64;
    let y = position.y / 100.0 * CANVAS_HEIGHT as f64;
    let font_size = settings.font_size.max(1).saturating_mul(FONT_SCALE);

    Ok(format!(
        concat!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
            r#"<defs><filter id="shadow" x="-50%" y="-50%" width="200%" height="200%">"#,
            r##"<feDropShadow dx="{dx}" dy="{dy}" stdDeviation="{blur}" flood-color="#000000" flood-opacity="{shadow}"/>"##,
            r#"</filter></defs>"#,
            r#"<text x="{x}" y="{y}" text-anchor="middle" dominant-baseline="central" "#,
            r##"font-family="{family}" font-size="{size}" fill="#{r:02x}{g:02x}{b:02x}" fill-opacity="{alpha}" "##,
            r#"filter="url(#shadow)" xml:space="preserve">{name}</text></svg>"#,
        ),
        w = CANVAS_WIDTH,
        h = CANVAS_HEIGHT,
        dx = SHADOW_OFFSET.0,
        dy = SHADOW_OFFSET.1,
        blur = SHADOW_BLUR / 2.0,
        shadow = SHADOW_OPACITY,
        x = x,
        y = y,
        family = settings.font_family.font_stack(),
        size = font_size,
        r = r,
        g = g,
        b = b,
        alpha = a as f32 / 255.0,
        name = escape_text(name),
    ))
}

/// Parses `#rgb`, `#rrggbb` or `#rrggbbaa`.
pub fn parse_hex_color(value: &str) -> Option<(u8, u8, u8, u8)> {
    let hex = value.trim().strip_prefix('#')?;
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    match hex.len() {
        3 => {
            let mut digits = hex.chars().map(|c| c.to_digit(16).map(|d| (d * 17) as u8));
            Some((digits.next()??, digits.next()??, digits.next()??, 255))
        }
        6 => Some((channel(&hex[0..2])?, channel(&hex[2..4])?, channel(&hex[4..6])?, 255)),
        8 => Some((
            channel(&hex[0..2])?,
            channel(&hex[2..4])?,
            channel(&hex[4..6])?,
            channel(&hex[6..8])?,
        )),
        _ => None,
    }
}

/// XML-escapes the name; control characters, which XML cannot carry, become spaces.
fn escape_text(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for ch in name.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c if c.is_control() => out.push(' '),
            c => out.push(c),
        }
    }
    out
}

fn encode_png(canvas: &Pixmap) -> Result<Vec<u8>, String> {
    let mut raw = Vec::with_capacity(canvas.data().len());
    for px in canvas.pixels() {
        let c = px.demultiply();
        raw.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
    }

    let mut out = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut out, canvas.width(), canvas.height());
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        encoder.set_compression(png::Compression::Fast);
        let mut writer = encoder.write_header().map_err(|e| e.to_string())?;
        writer.write_image_data(&raw).map_err(|e| e.to_string())?;
        writer.finish().map_err(|e| e.to_string())?;
    }
    Ok(out)
}
