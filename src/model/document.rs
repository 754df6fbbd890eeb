use std::fmt;

/// Where a document comes from
#[derive(Clone)]
pub enum DocumentSource {
    /// Bytes pushed by the caller in a multipart upload
    Upload {
        filename: Option<String>,
        content_type: Option<String>,
        bytes: Vec<u8>,
    },
    /// A URL the service pulls the document from
    Remote { url: String },
}

impl fmt::Debug for DocumentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentSource::Upload {
                filename,
                content_type,
                bytes,
            } => f
                .debug_struct("Upload")
                .field("filename", filename)
                .field("content_type", content_type)
                .field("len", &bytes.len())
                .finish(),
            DocumentSource::Remote { url } => f.debug_struct("Remote").field("url", url).finish(),
        }
    }
}

/// A resolved document ready to be sent to the model
#[derive(Clone)]
pub struct DocumentPayload {
    pub bytes: Vec<u8>,
    /// Sanitized filename, safe to embed in the model payload
    pub filename: String,
    pub mime_type: String,
}

impl DocumentPayload {
    /// Size of the document in bytes
    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

// Content never reaches logs
impl fmt::Debug for DocumentPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentPayload")
            .field("filename", &self.filename)
            .field("mime_type", &self.mime_type)
            .field("size", &self.size())
            .finish()
    }
}
