use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use common::model::certificate::{FontFamily, NamePosition, TemplateType, TextStyle};

use super::error::CertificateError;

/// Everything a batch run needs to render certificates.
///
/// This is a snapshot: the session store hands out an owned copy, so later edits in the
/// wizard never leak into a run that already started.
#[derive(Debug, Clone)]
pub struct CertificateSettings {
    /// Encoded template image, either raw file bytes or a `data:` URI.
    pub template: Vec<u8>,
    pub template_type: TemplateType,
    pub name_position: NamePosition,
    pub font_size: u32,
    pub font_family: FontFamily,
    pub text_color: String,
}

impl CertificateSettings {
    pub fn new(template: Vec<u8>, template_type: TemplateType, style: TextStyle) -> Self {
        Self {
            template,
            template_type,
            name_position: style.name_position,
            font_size: style.font_size,
            font_family: style.font_family,
            text_color: style.text_color,
        }
    }

    /// Template bytes with a `data:` URI wrapper removed.
    pub fn template_bytes(&self) -> Result<Vec<u8>, CertificateError> {
        match strip_data_uri(&self.template) {
            Some(payload) => BASE64
                .decode(payload.trim_ascii())
                .map_err(|e| CertificateError::TemplateDecode(format!("bad base64 payload: {}", e))),
            None => Ok(self.template.clone()),
        }
    }
}

/// Returns the payload of a base64 `data:` URI, or `None` for plain bytes.
fn strip_data_uri(bytes: &[u8]) -> Option<&[u8]> {
    let rest = bytes.strip_prefix(b"data:")?;
    let comma = rest.iter().position(|&b| b == b',')?;
    let (header, payload) = rest.split_at(comma);
    if !header.ends_with(b";base64") {
        return None;
    }
    Some(&payload[1..])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings_with(template: &[u8]) -> CertificateSettings {
        CertificateSettings::new(template.to_vec(), TemplateType::Image, TextStyle::default())
    }

    #[test]
    fn raw_bytes_pass_through() {
        let settings = settings_with(b"\x89PNG rest");
        assert_eq!(settings.template_bytes().unwrap(), b"\x89PNG rest");
    }

    #[test]
    fn data_uri_payload_is_decoded() {
        let uri = format!("data:image/png;base64,{}", BASE64.encode(b"hello"));
        let settings = settings_with(uri.as_bytes());
        assert_eq!(settings.template_bytes().unwrap(), b"hello");
    }

    #[test]
    fn broken_data_uri_is_a_decode_error() {
        let settings = settings_with(b"data:image/png;base64,@@@not base64@@@");
        assert!(matches!(
            settings.template_bytes(),
            Err(CertificateError::TemplateDecode(_))
        ));
    }

    #[test]
    fn style_fields_are_copied() {
        let style = TextStyle {
            font_size: 40,
            font_family: FontFamily::Mono,
            ..TextStyle::default()
        };
        let settings = CertificateSettings::new(Vec::new(), TemplateType::Pdf, style.clone());
        assert_eq!(settings.name_position, style.name_position);
        assert_eq!(settings.font_size, 40);
        assert_eq!(settings.font_family, FontFamily::Mono);
        assert_eq!(settings.text_color, style.text_color);
    }
}
