//! Font database and family resolution for the name overlay.

use std::path::Path;
use std::sync::Arc;

use usvg::fontdb::{Database, Family, Query, Stretch, Style, Weight};

/// Installed faces tried, in order, for each generic family.
const SERIF_CANDIDATES: &[&str] = &[
    "Times New Roman",
    "Georgia",
    "Liberation Serif",
    "DejaVu Serif",
    "Noto Serif",
];
const SANS_CANDIDATES: &[&str] = &[
    "Arial",
    "Helvetica",
    "Liberation Sans",
    "DejaVu Sans",
    "Noto Sans",
];
const MONO_CANDIDATES: &[&str] = &[
    "Courier New",
    "Liberation Mono",
    "DejaVu Sans Mono",
    "Noto Sans Mono",
];
const CURSIVE_CANDIDATES: &[&str] = &["Brush Script MT", "Comic Sans MS", "URW Chancery L", "Z003"];
const FANTASY_CANDIDATES: &[&str] = &["Impact", "Arial Black", "DejaVu Sans"];

/// Builds the font database: system fonts plus every font file in `extra_dir`.
pub fn build_font_db(extra_dir: Option<&Path>) -> Arc<Database> {
    let mut db = Database::new();
    db.load_system_fonts();
    if let Some(dir) = extra_dir {
        load_fonts_from_dir(&mut db, dir);
    }
    assign_generic_families(&mut db);
    log::info!("font database ready with {} faces", db.len());
    Arc::new(db)
}

fn load_fonts_from_dir(db: &mut Database, dir: &Path) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        log::debug!("fonts directory {} not readable, skipping", dir.display());
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let is_font = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| matches!(e.to_ascii_lowercase().as_str(), "ttf" | "otf" | "ttc"))
            .unwrap_or(false);
        if is_font && path.is_file() {
            if let Err(e) = db.load_font_file(&path) {
                log::warn!("could not load font {}: {}", path.display(), e);
            }
        }
    }
}

/// Points the generic CSS families at faces that are actually installed.
fn assign_generic_families(db: &mut Database) {
    if let Some(name) = first_installed(db, SERIF_CANDIDATES) {
        db.set_serif_family(name);
    }
    if let Some(name) = first_installed(db, SANS_CANDIDATES) {
        db.set_sans_serif_family(name);
    }
    if let Some(name) = first_installed(db, MONO_CANDIDATES) {
        db.set_monospace_family(name);
    }
    if let Some(name) = first_installed(db, CURSIVE_CANDIDATES) {
        db.set_cursive_family(name);
    }
    if let Some(name) = first_installed(db, FANTASY_CANDIDATES) {
        db.set_fantasy_family(name);
    }
}

fn first_installed(db: &Database, candidates: &[&str]) -> Option<String> {
    candidates
        .iter()
        .find(|name| {
            db.faces()
                .any(|face| face.families.iter().any(|(family, _)| family == *name))
        })
        .map(|name| name.to_string())
}

/// Resolver that walks the requested stack, then the generic families, then any face.
///
/// The stock resolver gives up when no family of the stack is installed, which would
/// silently drop the name from the certificate.
pub fn font_resolver() -> usvg::FontResolver<'static> {
    usvg::FontResolver {
        select_font: Box::new(|font, db| {
            let mut families: Vec<Family<'_>> = font
                .families()
                .iter()
                .map(|family| match family {
                    usvg::FontFamily::Serif => Family::Serif,
                    usvg::FontFamily::SansSerif => Family::SansSerif,
                    usvg::FontFamily::Cursive => Family::Cursive,
                    usvg::FontFamily::Fantasy => Family::Fantasy,
                    usvg::FontFamily::Monospace => Family::Monospace,
                    usvg::FontFamily::Named(name) => Family::Name(name),
                })
                .collect();
            families.extend([Family::Serif, Family::SansSerif, Family::Monospace]);

            let query = Query {
                families: &families,
                weight: Weight(font.weight()),
                stretch: Stretch::Normal,
                style: match font.style() {
                    usvg::FontStyle::Normal => Style::Normal,
                    usvg::FontStyle::Italic => Style::Italic,
                    usvg::FontStyle::Oblique => Style::Oblique,
                },
            };

            db.query(&query).or_else(|| db.faces().next().map(|face| face.id))
        }),
        select_fallback: usvg::FontResolver::default_fallback_selector(),
    }
}
