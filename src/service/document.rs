//! Document loading for uploads and remote URLs

use std::sync::LazyLock;

use percent_encoding::percent_decode_str;
use regex::Regex;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use unicode_normalization::UnicodeNormalization;
use url::Url;

use crate::model::{DocumentPayload, DocumentPolicy, DocumentSource};
use crate::service::classification::error::{ClassificationError, SourceFailure};

pub const UPLOAD_FIELD: &str = "file";
pub const URL_FIELD: &str = "file_url";
const DEFAULT_FILENAME: &str = "document";
const OCTET_STREAM: &str = "application/octet-stream";

static UNSAFE_FILENAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9_-]").expect("static pattern is valid"));

/// Make a filename safe to embed in a model payload
///
/// NFKD-normalizes, drops non-ASCII, lower-cases, turns spaces into `_` and
/// replaces anything outside `[a-z0-9_-]` with `_`.
pub fn sanitize_filename(name: &str) -> String {
    let ascii: String = name.nfkd().filter(char::is_ascii).collect();
    let lowered = ascii.to_lowercase().replace(' ', "_");
    UNSAFE_FILENAME_CHARS.replace_all(&lowered, "_").into_owned()
}

/// Strip parameters from a Content-Type value
fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase()
}

/// Resolves documents into payloads and enforces the type whitelist
pub struct DocumentLoader {
    client: Client,
    policy: DocumentPolicy,
}

impl DocumentLoader {
    pub fn new(policy: DocumentPolicy) -> Result<Self, String> {
        let client = Client::builder()
            .user_agent("document-classifier-agent/1.0")
            .build()
            .map_err(|e| format!("Failed to create HTTP client: {}", e))?;

        Ok(Self { client, policy })
    }

    pub fn policy(&self) -> &DocumentPolicy {
        &self.policy
    }

    /// Resolve a document from either source
    pub async fn load(&self, source: DocumentSource) -> Result<DocumentPayload, ClassificationError> {
        match source {
            DocumentSource::Upload {
                filename,
                content_type,
                bytes,
            } => self.accept_upload(filename, content_type, bytes),
            DocumentSource::Remote { url } => self.fetch(&url).await,
        }
    }

    fn accept_upload(
        &self,
        filename: Option<String>,
        content_type: Option<String>,
        bytes: Vec<u8>,
    ) -> Result<DocumentPayload, ClassificationError> {
        let filename = filename
            .filter(|f| !f.trim().is_empty())
            .ok_or_else(|| ClassificationError::MissingFile {
                field: UPLOAD_FIELD,
                reason: "Field required".to_string(),
            })?;

        let mime_type = content_type
            .map(|c| essence(&c))
            .filter(|c| !c.is_empty())
            .ok_or_else(|| ClassificationError::MissingFile {
                field: UPLOAD_FIELD,
                reason: "Invalid file upload: missing content type".to_string(),
            })?;

        if bytes.is_empty() {
            return Err(ClassificationError::MissingFile {
                field: UPLOAD_FIELD,
                reason: "Invalid file upload: empty file".to_string(),
            });
        }

        if !self.policy.accepts_upload(&mime_type) {
            return Err(ClassificationError::UnsupportedFileType {
                field: UPLOAD_FIELD,
                mime_type,
                allowed: self.policy.upload_mime_types.clone(),
            });
        }

        self.check_size(UPLOAD_FIELD, bytes.len())?;

        Ok(DocumentPayload {
            bytes,
            filename: sanitize_filename(&filename),
            mime_type,
        })
    }

    /// Inspect, check and download a remote document
    async fn fetch(&self, raw_url: &str) -> Result<DocumentPayload, ClassificationError> {
        let url = parse_url(raw_url)?;
        let mime_type = self.detect_mime_type(&url).await?;

        if !self.policy.accepts_remote(&mime_type) {
            return Err(ClassificationError::UnsupportedFileType {
                field: URL_FIELD,
                mime_type,
                allowed: self.policy.remote_mime_types.clone(),
            });
        }

        tracing::debug!(url = %url, mime_type = %mime_type, "Downloading remote document");

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| unreachable(&url, SourceFailure::Network(e.to_string())))?;

        if !response.status().is_success() {
            return Err(unreachable(&url, SourceFailure::Status(response.status().as_u16())));
        }

        if let Some(length) = response.content_length() {
            self.check_declared_size(length)?;
        }

        let mut response = response;
        let mut bytes = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| unreachable(&url, SourceFailure::Network(e.to_string())))?
        {
            self.check_size(URL_FIELD, bytes.len() + chunk.len())?;
            bytes.extend_from_slice(&chunk);
        }

        if bytes.is_empty() {
            return Err(ClassificationError::MissingFile {
                field: URL_FIELD,
                reason: "Remote document is empty".to_string(),
            });
        }

        tracing::debug!(url = %url, size = bytes.len(), "Downloaded remote document");

        Ok(DocumentPayload {
            bytes,
            filename: sanitize_filename(&filename_from_url(&url)),
            mime_type,
        })
    }

    /// Determine the MIME type of a URL without downloading it
    ///
    /// Uses the HEAD response's Content-Type, falling back to the URL's file
    /// extension when the header is absent or only says `application/octet-stream`.
    pub async fn detect_mime_type(&self, url: &Url) -> Result<String, ClassificationError> {
        let response = self
            .client
            .head(url.as_str())
            .send()
            .await
            .map_err(|e| unreachable(url, SourceFailure::Network(e.to_string())))?;

        if !response.status().is_success() {
            tracing::debug!(url = %url, status = %response.status(), "HEAD request failed");
            return Err(unreachable(url, SourceFailure::Status(response.status().as_u16())));
        }

        let declared = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(essence)
            .filter(|c| !c.is_empty() && c != OCTET_STREAM);

        declared
            .or_else(|| mime_from_extension(url))
            .ok_or_else(|| ClassificationError::UnknownMimeType {
                url: url.to_string(),
            })
    }

    /// Reject a remote Content-Length above the limit, including one that overflows `usize`
    fn check_declared_size(&self, length: u64) -> Result<(), ClassificationError> {
        let size = usize::try_from(length).unwrap_or(usize::MAX);
        self.check_size(URL_FIELD, size)
    }

    fn check_size(&self, field: &'static str, size: usize) -> Result<(), ClassificationError> {
        if size > self.policy.max_document_bytes {
            return Err(ClassificationError::DocumentTooLarge {
                field,
                limit: self.policy.max_document_bytes,
            });
        }
        Ok(())
    }
}

fn parse_url(raw: &str) -> Result<Url, ClassificationError> {
    let invalid = |reason: String| ClassificationError::UnreachableSource {
        url: raw.to_string(),
        cause: SourceFailure::InvalidUrl(reason),
    };

    let url = Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(invalid(format!("unsupported scheme '{}'", other))),
    }
}

fn unreachable(url: &Url, cause: SourceFailure) -> ClassificationError {
    ClassificationError::UnreachableSource {
        url: url.to_string(),
        cause,
    }
}

fn mime_from_extension(url: &Url) -> Option<String> {
    mime_guess::from_path(url.path())
        .first()
        .map(|m| m.essence_str().to_string())
}

fn filename_from_url(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .map(|segment| percent_decode_str(segment).decode_utf8_lossy().into_owned())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| DEFAULT_FILENAME.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::config::{MIME_DOCX, MIME_MSWORD, MIME_PDF, MIME_TEXT};

    fn loader() -> DocumentLoader {
        DocumentLoader::new(DocumentPolicy::default()).unwrap()
    }

    fn limited_loader(max_document_bytes: usize) -> DocumentLoader {
        DocumentLoader::new(DocumentPolicy {
            max_document_bytes,
            ..DocumentPolicy::default()
        })
        .unwrap()
    }

    fn upload(filename: Option<&str>, content_type: Option<&str>, bytes: &[u8]) -> DocumentSource {
        DocumentSource::Upload {
            filename: filename.map(str::to_string),
            content_type: content_type.map(str::to_string),
            bytes: bytes.to_vec(),
        }
    }

    fn assert_sanitized(output: &str) {
        assert!(
            output
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-'),
            "not sanitized: {:?}",
            output
        );
    }

    #[test]
    fn test_sanitize_filename_examples() {
        assert_eq!(sanitize_filename("Relevé Bancaire 2024.pdf"), "releve_bancaire_2024_pdf");
        assert_eq!(sanitize_filename("Contrat-de_Travail.DOCX"), "contrat-de_travail_docx");
        assert_eq!(sanitize_filename("straße/../etc"), "strae____etc");
        assert_eq!(sanitize_filename("報告書.pdf"), "_pdf");
        assert_eq!(sanitize_filename(""), "");
    }

    #[test]
    fn test_sanitize_filename_is_idempotent_and_safe() {
        let inputs = [
            "Relevé Bancaire 2024.pdf",
            "ＡＢＣ full width.txt",
            "tab\tand\nnewline",
            "emoji 📄 report (final).docx",
            "Œuvre – complète.doc",
            "already_safe-name",
            "   ",
        ];
        for input in inputs {
            let once = sanitize_filename(input);
            assert_sanitized(&once);
            assert_eq!(sanitize_filename(&once), once, "input {:?}", input);
        }
    }

    #[tokio::test]
    async fn test_upload_accepts_whitelisted_types() {
        for mime in [MIME_PDF, MIME_MSWORD, MIME_DOCX, MIME_TEXT] {
            let payload = loader()
                .load(upload(Some("My File.bin"), Some(mime), b"content"))
                .await
                .unwrap();
            assert_eq!(payload.mime_type, mime);
            assert_eq!(payload.filename, "my_file_bin");
            assert_eq!(payload.bytes, b"content");
        }
    }

    #[tokio::test]
    async fn test_upload_content_type_parameters_are_ignored() {
        let payload = loader()
            .load(upload(Some("a.txt"), Some("text/plain; charset=utf-8"), b"x"))
            .await
            .unwrap();
        assert_eq!(payload.mime_type, MIME_TEXT);
    }

    #[tokio::test]
    async fn test_upload_rejects_other_types() {
        let err = loader()
            .load(upload(Some("a.png"), Some("image/png"), b"png"))
            .await
            .unwrap_err();
        match err {
            ClassificationError::UnsupportedFileType {
                field,
                mime_type,
                allowed,
            } => {
                assert_eq!(field, "file");
                assert_eq!(mime_type, "image/png");
                assert_eq!(allowed.len(), 4);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_upload_requires_filename_type_and_content() {
        for source in [
            upload(None, Some(MIME_PDF), b"x"),
            upload(Some(""), Some(MIME_PDF), b"x"),
            upload(Some("a.pdf"), None, b"x"),
            upload(Some("a.pdf"), Some(MIME_PDF), b""),
        ] {
            let err = loader().load(source).await.unwrap_err();
            assert_eq!(err.kind(), "missing_file");
        }
    }

    #[tokio::test]
    async fn test_upload_size_limit() {
        let err = limited_loader(4)
            .load(upload(Some("a.pdf"), Some(MIME_PDF), b"12345"))
            .await
            .unwrap_err();
        assert!(matches!(err, ClassificationError::DocumentTooLarge { limit: 4, .. }));
    }

    #[tokio::test]
    async fn test_remote_head_failure_prevents_download() {
        let mut server = mockito::Server::new_async().await;
        let head = server
            .mock("HEAD", "/missing.pdf")
            .with_status(404)
            .expect(1)
            .create_async()
            .await;
        let get = server
            .mock("GET", "/missing.pdf")
            .with_status(200)
            .expect(0)
            .create_async()
            .await;

        let err = loader()
            .load(DocumentSource::Remote {
                url: format!("{}/missing.pdf", server.url()),
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ClassificationError::UnreachableSource {
                cause: SourceFailure::Status(404),
                ..
            }
        ));
        head.assert_async().await;
        get.assert_async().await;
    }

    #[tokio::test]
    async fn test_remote_pdf_is_downloaded() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("HEAD", "/files/Quarterly-Report.pdf")
            .with_status(200)
            .with_header("content-type", "application/pdf")
            .create_async()
            .await;
        server
            .mock("GET", "/files/Quarterly-Report.pdf")
            .with_status(200)
            .with_header("content-type", "application/pdf")
            .with_body("%PDF-1.4")
            .create_async()
            .await;

        let payload = loader()
            .load(DocumentSource::Remote {
                url: format!("{}/files/Quarterly-Report.pdf", server.url()),
            })
            .await
            .unwrap();

        assert_eq!(payload.mime_type, MIME_PDF);
        assert_eq!(payload.filename, "quarterly-report_pdf");
        assert_eq!(payload.bytes, b"%PDF-1.4");
    }

    #[tokio::test]
    async fn test_remote_rejects_non_whitelisted_type_before_download() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("HEAD", "/image")
            .with_status(200)
            .with_header("content-type", "image/png")
            .create_async()
            .await;
        let get = server
            .mock("GET", "/image")
            .expect(0)
            .create_async()
            .await;

        let err = loader()
            .load(DocumentSource::Remote {
                url: format!("{}/image", server.url()),
            })
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "unsupported_file_type");
        assert_eq!(err.field(), Some("file_url"));
        get.assert_async().await;
    }

    #[tokio::test]
    async fn test_remote_text_is_not_whitelisted_by_default() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("HEAD", "/notes.txt")
            .with_status(200)
            .with_header("content-type", "text/plain; charset=utf-8")
            .create_async()
            .await;

        let err = loader()
            .load(DocumentSource::Remote {
                url: format!("{}/notes.txt", server.url()),
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "unsupported_file_type");
    }

    #[tokio::test]
    async fn test_octet_stream_falls_back_to_extension() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("HEAD", "/contract.docx")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/octet-stream")
            .expect(1)
            .create_async()
            .await;

        let url = Url::parse(&format!("{}/contract.docx?download=1", server.url())).unwrap();
        assert_eq!(loader().detect_mime_type(&url).await.unwrap(), MIME_DOCX);
    }

    #[tokio::test]
    async fn test_missing_content_type_uses_extension() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("HEAD", "/statement.pdf")
            .with_status(200)
            .create_async()
            .await;
        server
            .mock("GET", "/statement.pdf")
            .with_status(200)
            .with_body("%PDF-1.7")
            .create_async()
            .await;

        let payload = loader()
            .load(DocumentSource::Remote {
                url: format!("{}/statement.pdf", server.url()),
            })
            .await
            .unwrap();

        assert_eq!(payload.mime_type, MIME_PDF);
        assert_eq!(payload.filename, "statement_pdf");
    }

    #[tokio::test]
    async fn test_remote_declared_length_over_limit() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("HEAD", "/big.pdf")
            .with_status(200)
            .with_header("content-type", "application/pdf")
            .create_async()
            .await;
        server
            .mock("GET", "/big.pdf")
            .with_status(200)
            .with_body(vec![b'a'; 64])
            .create_async()
            .await;

        let err = limited_loader(16)
            .load(DocumentSource::Remote {
                url: format!("{}/big.pdf", server.url()),
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ClassificationError::DocumentTooLarge {
                field: "file_url",
                limit: 16
            }
        ));
    }

    #[tokio::test]
    async fn test_remote_chunked_body_stops_at_limit() {
        use std::io::Write;

        let mut server = mockito::Server::new_async().await;
        server
            .mock("HEAD", "/stream.pdf")
            .with_status(200)
            .with_header("content-type", "application/pdf")
            .create_async()
            .await;
        server
            .mock("GET", "/stream.pdf")
            .with_status(200)
            .with_chunked_body(|w| {
                for _ in 0..8 {
                    w.write_all(&[b'a'; 8])?;
                }
                Ok(())
            })
            .create_async()
            .await;

        let err = limited_loader(16)
            .load(DocumentSource::Remote {
                url: format!("{}/stream.pdf", server.url()),
            })
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "document_too_large");
        assert_eq!(err.field(), Some("file_url"));
    }

    #[test]
    fn test_declared_length_beyond_usize_is_too_large() {
        let err = loader().check_declared_size(u64::MAX).unwrap_err();
        assert!(matches!(err, ClassificationError::DocumentTooLarge { .. }));
        assert!(loader().check_declared_size(1024).is_ok());
    }

    #[tokio::test]
    async fn test_unknown_mime_type_without_extension() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("HEAD", "/blob")
            .with_status(200)
            .with_header("content-type", "application/octet-stream")
            .create_async()
            .await;

        let url = Url::parse(&format!("{}/blob", server.url())).unwrap();
        assert!(matches!(
            loader().detect_mime_type(&url).await,
            Err(ClassificationError::UnknownMimeType { .. })
        ));
    }

    #[tokio::test]
    async fn test_invalid_url_is_rejected_without_network() {
        for raw in ["not a url", "ftp://example.com/a.pdf"] {
            let err = loader()
                .load(DocumentSource::Remote {
                    url: raw.to_string(),
                })
                .await
                .unwrap_err();
            assert!(matches!(
                err,
                ClassificationError::UnreachableSource {
                    cause: SourceFailure::InvalidUrl(_),
                    ..
                }
            ));
        }
    }

    #[test]
    fn test_filename_from_url() {
        let url = Url::parse("https://example.com/a/b/R%C3%A9sum%C3%A9.pdf?x=1").unwrap();
        assert_eq!(filename_from_url(&url), "Résumé.pdf");
        let root = Url::parse("https://example.com/").unwrap();
        assert_eq!(filename_from_url(&root), "document");
    }
}
