//! Upload type policy.
//!
//! The baseline check trusts the client-declared `Content-Type` and matches it
//! against an allow-list. When content verification is enabled the leading
//! bytes are also sniffed with `infer` and must agree with the declaration.

use crate::{Result, ShareError};

/// Number of leading bytes inspected when verifying content.
pub const SNIFF_LEN: usize = 8192;

/// Declared type used when the client sends none.
pub const FALLBACK_MIME_TYPE: &str = "application/octet-stream";

/// Plain text has no magic number, so it is verified separately.
const TEXT_PLAIN: &str = "text/plain";

/// Normalize a MIME type: drop parameters, trim, lower-case.
///
/// `"Text/Plain; charset=utf-8"` becomes `"text/plain"`.
pub fn normalize_mime(mime: &str) -> String {
    mime.split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Allow-list of upload types.
#[derive(Debug, Clone)]
pub struct MimePolicy {
    allowed: Vec<String>,
    verify_content: bool,
}

impl MimePolicy {
    /// Create a policy accepting the given declared types.
    pub fn new<I, S>(allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            allowed: allowed
                .into_iter()
                .map(|m| normalize_mime(m.as_ref()))
                .collect(),
            verify_content: false,
        }
    }

    /// Enable or disable content sniffing.
    pub fn with_content_verification(mut self, enabled: bool) -> Self {
        self.verify_content = enabled;
        self
    }

    /// Whether uploads are sniffed in addition to the declared type check.
    pub fn verifies_content(&self) -> bool {
        self.verify_content
    }

    /// Whether a (normalized) type is in the allow-list.
    pub fn is_allowed(&self, mime: &str) -> bool {
        let mime = normalize_mime(mime);
        self.allowed.iter().any(|a| *a == mime)
    }

    /// Check the declared type and return its normalized form.
    pub fn check_declared(&self, declared: Option<&str>) -> Result<String> {
        let mime = normalize_mime(declared.unwrap_or(FALLBACK_MIME_TYPE));
        if self.is_allowed(&mime) {
            Ok(mime)
        } else {
            Err(ShareError::InvalidFileType(mime))
        }
    }

    /// Check that the leading bytes of an upload match its declared type.
    ///
    /// `declared` must already be normalized.
    pub fn check_content(&self, declared: &str, head: &[u8]) -> Result<()> {
        match infer::get(head) {
            Some(kind) if kind.mime_type() == declared => Ok(()),
            Some(kind) => Err(ShareError::InvalidFileType(format!(
                "{declared} (content is {})",
                kind.mime_type()
            ))),
            None if declared == TEXT_PLAIN && is_plain_text(head) => Ok(()),
            None => Err(ShareError::InvalidFileType(format!(
                "{declared} (content not recognized)"
            ))),
        }
    }
}

/// UTF-8 without NUL bytes. A multi-byte sequence cut off at the end of the
/// sniffed window is tolerated.
fn is_plain_text(head: &[u8]) -> bool {
    if head.contains(&0) {
        return false;
    }
    match std::str::from_utf8(head) {
        Ok(_) => true,
        Err(e) => e.error_len().is_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DOCX_MIME_TYPE;

    const PNG_HEADER: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];
    const JPEG_HEADER: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46];

    fn default_policy() -> MimePolicy {
        MimePolicy::new([
            "image/jpeg",
            "image/png",
            "application/pdf",
            "text/plain",
            DOCX_MIME_TYPE,
        ])
    }

    #[test]
    fn test_normalize_mime() {
        assert_eq!(normalize_mime("text/plain"), "text/plain");
        assert_eq!(normalize_mime("Text/Plain; charset=utf-8"), "text/plain");
        assert_eq!(normalize_mime("  IMAGE/PNG  "), "image/png");
        assert_eq!(normalize_mime(""), "");
    }

    #[test]
    fn test_check_declared_allowed() {
        let policy = default_policy();
        assert_eq!(
            policy.check_declared(Some("text/plain")).unwrap(),
            "text/plain"
        );
        assert_eq!(
            policy
                .check_declared(Some("text/plain; charset=utf-8"))
                .unwrap(),
            "text/plain"
        );
        assert_eq!(
            policy.check_declared(Some(DOCX_MIME_TYPE)).unwrap(),
            DOCX_MIME_TYPE
        );
    }

    #[test]
    fn test_check_declared_rejected() {
        let policy = default_policy();
        let result = policy.check_declared(Some("application/zip"));
        assert!(matches!(result, Err(ShareError::InvalidFileType(ref m)) if m == "application/zip"));
    }

    #[test]
    fn test_check_declared_missing_type() {
        let policy = default_policy();
        let result = policy.check_declared(None);
        assert!(
            matches!(result, Err(ShareError::InvalidFileType(ref m)) if m == FALLBACK_MIME_TYPE)
        );
    }

    #[test]
    fn test_content_verification_flag() {
        let policy = default_policy();
        assert!(!policy.verifies_content());
        assert!(policy.with_content_verification(true).verifies_content());
    }

    #[test]
    fn test_check_content_png() {
        let policy = default_policy();
        assert!(policy.check_content("image/png", PNG_HEADER).is_ok());
    }

    #[test]
    fn test_check_content_mismatch() {
        let policy = default_policy();
        let result = policy.check_content("image/jpeg", PNG_HEADER);
        assert!(matches!(result, Err(ShareError::InvalidFileType(ref m)) if m.contains("image/png")));

        let result = policy.check_content("text/plain", JPEG_HEADER);
        assert!(matches!(result, Err(ShareError::InvalidFileType(_))));
    }

    #[test]
    fn test_check_content_plain_text() {
        let policy = default_policy();
        assert!(policy.check_content("text/plain", b"hello world\n").is_ok());
        assert!(policy
            .check_content("text/plain", "日本語テキスト".as_bytes())
            .is_ok());
        assert!(policy.check_content("text/plain", b"").is_ok());
    }

    #[test]
    fn test_check_content_binary_declared_as_text() {
        let policy = default_policy();
        let result = policy.check_content("text/plain", &[0x00, 0x01, 0x02, 0x03]);
        assert!(matches!(result, Err(ShareError::InvalidFileType(_))));
    }

    #[test]
    fn test_check_content_unrecognized_binary_type() {
        let policy = default_policy();
        let result = policy.check_content("application/pdf", b"not really a pdf");
        assert!(matches!(result, Err(ShareError::InvalidFileType(ref m)) if m.contains("not recognized")));
    }

    #[test]
    fn test_is_plain_text_truncated_multibyte() {
        let text = "テキスト".as_bytes();
        // Cut in the middle of the last character
        assert!(is_plain_text(&text[..text.len() - 1]));
        // Invalid sequence in the middle is rejected
        assert!(!is_plain_text(&[b'a', 0xFF, b'b']));
    }
}
