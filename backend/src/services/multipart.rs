use actix_multipart::Multipart;
use actix_web::HttpResponse;
use futures_util::StreamExt;

/// The `file` part of an upload form.
pub(crate) struct UploadedFile {
    pub filename: Option<String>,
    /// MIME essence sent by the client, if any.
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(thiserror::Error, Debug)]
pub(crate) enum UploadError {
    #[error("the form has no 'file' field")]
    MissingFile,
    #[error("the file exceeds the {0} byte limit")]
    TooLarge(usize),
    #[error("malformed multipart body: {0}")]
    Malformed(String),
}

impl UploadError {
    pub(crate) fn response(&self) -> HttpResponse {
        log::warn!("rejected upload: {}", self);
        match self {
            UploadError::TooLarge(_) => HttpResponse::PayloadTooLarge().body(self.to_string()),
            _ => HttpResponse::BadRequest().body(self.to_string()),
        }
    }
}

/// Reads the `file` field, refusing to buffer more than `limit` bytes.
///
/// Other fields are drained and ignored.
pub(crate) async fn read_file_field(
    mut payload: Multipart,
    limit: usize,
) -> Result<UploadedFile, UploadError> {
    let mut upload = None;

    while let Some(item) = payload.next().await {
        let mut field = item.map_err(|e| UploadError::Malformed(e.to_string()))?;
        let name = field
            .content_disposition()
            .and_then(|cd| cd.get_name().map(|n| n.to_string()));

        if name.as_deref() != Some("file") || upload.is_some() {
            while let Some(chunk) = field.next().await {
                chunk.map_err(|e| UploadError::Malformed(e.to_string()))?;
            }
            continue;
        }

        let filename = field
            .content_disposition()
            .and_then(|cd| cd.get_filename().map(|f| f.to_string()));
        let content_type = field
            .content_type()
            .map(|m| m.essence_str().to_string());

        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(|e| UploadError::Malformed(e.to_string()))?;
            if bytes.len() + chunk.len() > limit {
                return Err(UploadError::TooLarge(limit));
            }
            bytes.extend_from_slice(&chunk);
        }

        upload = Some(UploadedFile {
            filename,
            content_type,
            bytes,
        });
    }

    upload.ok_or(UploadError::MissingFile)
}
