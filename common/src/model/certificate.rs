use serde::{Deserialize, Serialize};

/// Kind of template uploaded in the first wizard step.
///
/// PDF templates are accepted but only rendered as a blank white page carrying the name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateType {
    #[default]
    Image,
    Pdf,
}

impl TemplateType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateType::Image => "image",
            TemplateType::Pdf => "pdf",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "image" => Some(TemplateType::Image),
            "pdf" => Some(TemplateType::Pdf),
            _ => None,
        }
    }
}

/// The fixed set of font choices offered by the style step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontFamily {
    #[default]
    Serif,
    Sans,
    Mono,
    Script,
    Display,
}

impl FontFamily {
    pub const ALL: [FontFamily; 5] = [
        FontFamily::Serif,
        FontFamily::Sans,
        FontFamily::Mono,
        FontFamily::Script,
        FontFamily::Display,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FontFamily::Serif => "serif",
            FontFamily::Sans => "sans",
            FontFamily::Mono => "mono",
            FontFamily::Script => "script",
            FontFamily::Display => "display",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.as_str() == value)
    }

    /// CSS-style font stack used when laying out the name.
    pub fn font_stack(&self) -> &'static str {
        match self {
            FontFamily::Serif => "ui-serif, Georgia, serif",
            FontFamily::Sans => "ui-sans-serif, Arial, sans-serif",
            FontFamily::Mono => "ui-monospace, 'Courier New', monospace",
            FontFamily::Script => "'Brush Script MT', cursive",
            FontFamily::Display => "'Impact', 'Arial Black', sans-serif",
        }
    }
}

/// Name anchor as percentages of the canvas width and height.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NamePosition {
    pub x: f64,
    pub y: f64,
}

impl Default for NamePosition {
    fn default() -> Self {
        Self { x: 50.0, y: 50.0 }
    }
}

impl NamePosition {
    /// Both coordinates forced into `[0, 100]`; non-finite values fall back to the centre.
    pub fn clamped(self) -> Self {
        fn clamp(v: f64) -> f64 {
            if v.is_finite() { v.clamp(0.0, 100.0) } else { 50.0 }
        }
        Self {
            x: clamp(self.x),
            y: clamp(self.y),
        }
    }
}

/// Style settings chosen in the preview step.
///
/// Every field has a default so a session that skipped the step still renders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TextStyle {
    pub name_position: NamePosition,
    /// Logical size as shown in the preview; multiplied at render time.
    pub font_size: u32,
    pub font_family: FontFamily,
    /// Hex colour, `#rgb`, `#rrggbb` or `#rrggbbaa`.
    pub text_color: String,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            name_position: NamePosition::default(),
            font_size: 24,
            font_family: FontFamily::Serif,
            text_color: "#000000".to_string(),
        }
    }
}

/// Returned after a template upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateUploadResponse {
    pub template_type: TemplateType,
    pub extension: String,
    /// True when the uploaded bytes match the template already stored.
    pub unchanged: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn style_defaults_fill_missing_fields() {
        let style: TextStyle = serde_json::from_str(r#"{"fontSize": 30}"#).unwrap();
        assert_eq!(style.font_size, 30);
        assert_eq!(style.name_position, NamePosition { x: 50.0, y: 50.0 });
        assert_eq!(style.font_family, FontFamily::Serif);
        assert_eq!(style.text_color, "#000000");
    }

    #[test]
    fn style_uses_wizard_field_names() {
        let style: TextStyle = serde_json::from_str(
            r##"{"namePosition": {"x": 10, "y": 90}, "fontFamily": "script", "textColor": "#ff0000"}"##,
        )
        .unwrap();
        assert_eq!(style.name_position, NamePosition { x: 10.0, y: 90.0 });
        assert_eq!(style.font_family, FontFamily::Script);
        assert_eq!(style.text_color, "#ff0000");
    }

    #[test]
    fn font_family_round_trips_through_its_name() {
        for family in FontFamily::ALL {
            assert_eq!(FontFamily::parse(family.as_str()), Some(family));
        }
        assert_eq!(FontFamily::parse("comic"), None);
    }

    #[test]
    fn clamping_keeps_positions_on_the_canvas() {
        let p = NamePosition { x: -5.0, y: 140.0 }.clamped();
        assert_eq!(p, NamePosition { x: 0.0, y: 100.0 });
        let p = NamePosition { x: f64::NAN, y: 20.0 }.clamped();
        assert_eq!(p, NamePosition { x: 50.0, y: 20.0 });
    }
}
