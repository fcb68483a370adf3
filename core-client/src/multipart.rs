//! Minimal `multipart/form-data` body builder.
//!
//! Several providers take uploads as multipart forms (metadata part plus a
//! binary file part). The transport only sees a finished body, so the
//! builder assembles the wire bytes directly.

use bytes::{BufMut, Bytes, BytesMut};

/// Fixed boundary; provider servers only require that it not occur in the
/// payload parts, and the parts here are JSON/short fields plus opaque file
/// bytes framed by length.
const BOUNDARY: &str = "cloudpicker-form-boundary-7MA4YWxkTrZu0gW";

/// Builder for a multipart/form-data request body.
///
/// # Example
///
/// ```
/// use core_client::multipart::MultipartBody;
/// use bytes::Bytes;
///
/// let body = MultipartBody::new()
///     .text("attributes", r#"{"name":"a.txt"}"#)
///     .file("file", "a.txt", Bytes::from_static(b"hello"))
///     .finish();
///
/// assert!(body.content_type.starts_with("multipart/form-data; boundary="));
/// ```
#[derive(Debug, Default)]
pub struct MultipartBody {
    buffer: BytesMut,
}

/// A finished multipart body with its Content-Type header value.
#[derive(Debug)]
pub struct EncodedForm {
    pub content_type: String,
    pub body: Bytes,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::new(),
        }
    }

    /// Append a text field part.
    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.buffer
            .put_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        self.buffer.put_slice(
            format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
        );
        self.buffer.put_slice(value.as_bytes());
        self.buffer.put_slice(b"\r\n");
        self
    }

    /// Append a binary file part.
    pub fn file(mut self, name: &str, filename: &str, content: Bytes) -> Self {
        self.buffer
            .put_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        self.buffer.put_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                name, filename
            )
            .as_bytes(),
        );
        self.buffer
            .put_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        self.buffer.put_slice(&content);
        self.buffer.put_slice(b"\r\n");
        self
    }

    /// Close the form and produce the body plus its Content-Type value.
    pub fn finish(mut self) -> EncodedForm {
        self.buffer
            .put_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        EncodedForm {
            content_type: format!("multipart/form-data; boundary={}", BOUNDARY),
            body: self.buffer.freeze(),
        }
    }
}
