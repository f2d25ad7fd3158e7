//! Request body representations and their wire encoding.

use bridge_traits::{error::Result as BridgeResult, FileSystemAccess};
use bytes::{BufMut, Bytes, BytesMut};
use std::path::PathBuf;

pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
pub const OCTET_STREAM_CONTENT_TYPE: &str = "application/octet-stream";
pub const TEXT_CONTENT_TYPE: &str = "text/plain";
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";
pub const FILE_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=UTF-8";

/// The single body a descriptor may carry.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// URL-encoded form fields, in insertion order. May be empty.
    Form(Vec<(String, String)>),
    Multipart(MultipartForm),
    Bytes(Bytes),
    Text(String),
    Json(serde_json::Value),
    /// Contents of a local file, read at send time.
    File(PathBuf),
}

impl RequestBody {
    /// Short name used in error messages and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            RequestBody::Form(_) => "form",
            RequestBody::Multipart(_) => "multipart",
            RequestBody::Bytes(_) => "bytes",
            RequestBody::Text(_) => "text",
            RequestBody::Json(_) => "JSON",
            RequestBody::File(_) => "file",
        }
    }

    pub fn content_type(&self) -> String {
        match self {
            RequestBody::Form(_) => FORM_CONTENT_TYPE.to_string(),
            RequestBody::Multipart(form) => form.content_type(),
            RequestBody::Bytes(_) => OCTET_STREAM_CONTENT_TYPE.to_string(),
            RequestBody::Text(_) => TEXT_CONTENT_TYPE.to_string(),
            RequestBody::Json(_) => JSON_CONTENT_TYPE.to_string(),
            RequestBody::File(_) => FILE_CONTENT_TYPE.to_string(),
        }
    }

    /// Serialize the body for one attempt.
    ///
    /// File bodies are read through `file_system`; a read failure is reported
    /// as a bridge error and counts as a failed attempt.
    pub async fn encode(&self, file_system: &dyn FileSystemAccess) -> BridgeResult<Bytes> {
        match self {
            RequestBody::Form(fields) => Ok(Bytes::from(encode_form(fields))),
            RequestBody::Multipart(form) => Ok(form.encode()),
            RequestBody::Bytes(data) => Ok(data.clone()),
            RequestBody::Text(text) => Ok(Bytes::from(text.clone())),
            RequestBody::Json(value) => Ok(Bytes::from(value.to_string())),
            RequestBody::File(path) => file_system.read_file(path).await,
        }
    }
}

fn encode_form(fields: &[(String, String)]) -> String {
    fields
        .iter()
        .map(|(key, value)| {
            format!(
                "{}={}",
                urlencoding::encode(key),
                urlencoding::encode(value)
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// One part of a `multipart/form-data` body.
#[derive(Debug, Clone, PartialEq)]
pub enum MultipartPart {
    Field {
        name: String,
        value: String,
    },
    File {
        name: String,
        filename: String,
        content_type: String,
        data: Bytes,
    },
}

/// A `multipart/form-data` body with a fixed boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct MultipartForm {
    boundary: String,
    parts: Vec<MultipartPart>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::with_boundary(format!("api-request-{}", uuid::Uuid::new_v4().simple()))
    }

    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        Self {
            boundary: boundary.into(),
            parts: Vec::new(),
        }
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    pub fn parts(&self) -> &[MultipartPart] {
        &self.parts
    }

    pub fn push(&mut self, part: MultipartPart) {
        self.parts.push(part);
    }

    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::new();

        for part in &self.parts {
            buf.put_slice(b"--");
            buf.put_slice(self.boundary.as_bytes());
            buf.put_slice(b"\r\n");

            match part {
                MultipartPart::Field { name, value } => {
                    buf.put_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{}\"\r\n\r\n",
                            escape_quoted(name)
                        )
                        .as_bytes(),
                    );
                    buf.put_slice(value.as_bytes());
                }
                MultipartPart::File {
                    name,
                    filename,
                    content_type,
                    data,
                } => {
                    buf.put_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                             Content-Type: {}\r\n\r\n",
                            escape_quoted(name),
                            escape_quoted(filename),
                            part_content_type(content_type)
                        )
                        .as_bytes(),
                    );
                    buf.put_slice(data);
                }
            }

            buf.put_slice(b"\r\n");
        }

        buf.put_slice(b"--");
        buf.put_slice(self.boundary.as_bytes());
        buf.put_slice(b"--\r\n");

        buf.freeze()
    }
}

impl Default for MultipartForm {
    fn default() -> Self {
        Self::new()
    }
}

/// A part content type must be a single non-empty header value.
pub(crate) fn is_valid_part_content_type(content_type: &str) -> bool {
    !content_type.trim().is_empty() && !content_type.contains(['\r', '\n'])
}

fn part_content_type(content_type: &str) -> &str {
    if is_valid_part_content_type(content_type) {
        content_type
    } else {
        OCTET_STREAM_CONTENT_TYPE
    }
}

fn escape_quoted(value: &str) -> String {
    value
        .replace('\n', "%0A")
        .replace('\r', "%0D")
        .replace('"', "%22")
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_desktop::TokioFileSystem;

    #[test]
    fn test_form_encoding_percent_encodes() {
        let fields = vec![
            ("q".to_string(), "rust lang".to_string()),
            ("tag".to_string(), "a&b=c".to_string()),
        ];
        assert_eq!(encode_form(&fields), "q=rust%20lang&tag=a%26b%3Dc");
        assert_eq!(encode_form(&[]), "");
    }

    #[test]
    fn test_content_types() {
        assert_eq!(
            RequestBody::Form(vec![]).content_type(),
            "application/x-www-form-urlencoded"
        );
        assert_eq!(
            RequestBody::Json(serde_json::json!({})).content_type(),
            "application/json; charset=utf-8"
        );
        assert_eq!(
            RequestBody::File(PathBuf::from("/tmp/x")).content_type(),
            "application/x-www-form-urlencoded; charset=UTF-8"
        );

        let form = MultipartForm::with_boundary("XYZ");
        assert_eq!(
            RequestBody::Multipart(form).content_type(),
            "multipart/form-data; boundary=XYZ"
        );
    }

    #[test]
    fn test_multipart_layout() {
        let mut form = MultipartForm::with_boundary("b0undary");
        form.push(MultipartPart::Field {
            name: "title".to_string(),
            value: "Hello".to_string(),
        });
        form.push(MultipartPart::File {
            name: "upload".to_string(),
            filename: "a\"b.txt".to_string(),
            content_type: "text/plain".to_string(),
            data: Bytes::from_static(b"file-data"),
        });

        let expected = "--b0undary\r\n\
             Content-Disposition: form-data; name=\"title\"\r\n\r\n\
             Hello\r\n\
             --b0undary\r\n\
             Content-Disposition: form-data; name=\"upload\"; filename=\"a%22b.txt\"\r\n\
             Content-Type: text/plain\r\n\r\n\
             file-data\r\n\
             --b0undary--\r\n";

        assert_eq!(form.encode(), Bytes::from(expected));
    }

    #[test]
    fn test_multipart_content_type_cannot_break_framing() {
        let mut form = MultipartForm::with_boundary("b0undary");
        form.push(MultipartPart::File {
            name: "upload\r\nX-Injected: 1".to_string(),
            filename: "a.txt".to_string(),
            content_type: "text/plain\r\nX-Injected: 1".to_string(),
            data: Bytes::from_static(b"x"),
        });

        let encoded = String::from_utf8(form.encode().to_vec()).unwrap();
        assert!(!encoded.contains("\r\nX-Injected"));
        assert!(encoded.contains("name=\"upload%0D%0AX-Injected: 1\""));
        assert!(encoded.contains("Content-Type: application/octet-stream\r\n\r\n"));
    }

    #[test]
    fn test_generated_boundaries_differ() {
        assert_ne!(MultipartForm::new().boundary(), MultipartForm::new().boundary());
    }

    #[tokio::test]
    async fn test_file_body_read_at_encode_time() {
        let dir = std::env::temp_dir().join(format!("core-request-body-{}", uuid::Uuid::new_v4()));
        let fs = TokioFileSystem::with_cache_directory(dir.clone());
        let path = dir.join("payload.txt");
        fs.write_file(&path, Bytes::from_static(b"a=1&b=2"))
            .await
            .unwrap();

        let body = RequestBody::File(path.clone());
        assert_eq!(body.encode(&fs).await.unwrap(), Bytes::from_static(b"a=1&b=2"));

        let missing = RequestBody::File(dir.join("missing.txt"));
        assert!(missing.encode(&fs).await.is_err());

        let _ = tokio::fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn test_json_and_text_encoding() {
        let fs = TokioFileSystem::with_cache_directory(std::env::temp_dir());

        let json = RequestBody::Json(serde_json::json!({"id": 7}));
        assert_eq!(json.encode(&fs).await.unwrap(), Bytes::from_static(br#"{"id":7}"#));

        let text = RequestBody::Text("plain".to_string());
        assert_eq!(text.encode(&fs).await.unwrap(), Bytes::from_static(b"plain"));
    }
}
