use common::jobs::FailureReason;

/// Failures of the certificate pipeline, one variant per stage.
#[derive(thiserror::Error, Debug)]
pub enum CertificateError {
    /// The spreadsheet bytes could not be parsed or contain no readable sheet.
    #[error("could not read recipient spreadsheet: {0}")]
    Extraction(String),

    /// The template is not a decodable image.
    #[error("template is not a valid image: {0}")]
    TemplateDecode(String),

    /// Rasterizing or encoding one recipient's certificate failed.
    #[error("failed to render certificate for '{name}': {message}")]
    Render { name: String, message: String },

    /// The archive could not be written or finalized.
    #[error("failed to build certificate archive: {0}")]
    Archive(String),

    /// The batch was cancelled before every recipient was rendered.
    #[error("batch cancelled after {completed} certificates")]
    Cancelled { completed: usize },
}

impl CertificateError {
    pub fn render(name: &str, message: impl Into<String>) -> Self {
        Self::Render {
            name: name.to_string(),
            message: message.into(),
        }
    }

    /// Wire-level reason reported to clients polling a job.
    pub fn reason(&self) -> FailureReason {
        match self {
            CertificateError::Extraction(_) => FailureReason::Extraction,
            CertificateError::TemplateDecode(_) => FailureReason::TemplateDecode,
            CertificateError::Render { .. } => FailureReason::Render,
            CertificateError::Archive(_) => FailureReason::Archive,
            CertificateError::Cancelled { .. } => FailureReason::Internal,
        }
    }
}

impl From<zip::result::ZipError> for CertificateError {
    fn from(err: zip::result::ZipError) -> Self {
        CertificateError::Archive(err.to_string())
    }
}
