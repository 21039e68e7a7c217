//! Response buffering for body rewrites.
//!
//! # Responsibilities
//! - Decide whether a response body can be handled as text
//! - Buffer text bodies up to a size limit
//! - Refuse body writes that would corrupt the response
//!
//! # Design Decisions
//! - Streams are read frame by frame until the limit; past it, the bytes
//!   already read are put back in front of the rest of the stream
//! - Content-encoded bodies pass through untouched
//! - Content-Length is recomputed only when the body was replaced

use axum::body::{Body, Bytes, HttpBody};
use axum::http::{header, response::Parts, HeaderMap, HeaderValue, StatusCode};
use axum::response::Response;
use futures_util::{stream, StreamExt};
use thiserror::Error;

/// Why a body write was refused.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContentError {
    #[error("response body is streamed")]
    Streamed,

    #[error("response body is not text")]
    Binary,

    #[error("status {0} does not allow a body")]
    BodilessStatus(StatusCode),
}

/// A response whose body may be read and replaced as text.
pub trait TextResponse {
    fn headers(&self) -> &HeaderMap;

    fn headers_mut(&mut self) -> &mut HeaderMap;

    /// The body as text, if it can be represented as such.
    fn content(&self) -> Option<&str>;

    /// Replace the body.
    fn set_content(&mut self, content: String) -> Result<(), ContentError>;
}

/// Body of a [`BufferedResponse`].
#[derive(Debug)]
pub enum Content {
    Text(String),
    Binary(Bytes),
    /// Not buffered; passed through as-is.
    Streamed(Body),
}

/// A response with its body buffered when that is possible.
#[derive(Debug)]
pub struct BufferedResponse {
    parts: Parts,
    content: Content,
    rewritten: bool,
}

impl BufferedResponse {
    /// Buffer the body of `response` if it fits in `limit` and is not encoded.
    ///
    /// A body that turns out to be larger is returned as a stream that
    /// yields every byte of the original.
    pub async fn buffer(response: Response, limit: usize) -> Result<Self, axum::Error> {
        let (parts, body) = response.into_parts();

        let encoded = parts
            .headers
            .get(header::CONTENT_ENCODING)
            .and_then(|v| v.to_str().ok())
            .map(|v| !v.trim().eq_ignore_ascii_case("identity"))
            .unwrap_or(false);

        if encoded || body.size_hint().lower() > limit as u64 {
            return Ok(Self::streamed(parts, body));
        }

        let mut frames = body.into_data_stream();
        let mut chunks: Vec<Bytes> = Vec::new();
        let mut size = 0usize;

        while let Some(chunk) = frames.next().await {
            let chunk = chunk?;
            size += chunk.len();
            chunks.push(chunk);

            if size > limit {
                let read = stream::iter(chunks.into_iter().map(Ok::<_, axum::Error>));
                let body = Body::from_stream(read.chain(frames));
                return Ok(Self::streamed(parts, body));
            }
        }

        let bytes = match chunks.len() {
            0 => Bytes::new(),
            1 => chunks.swap_remove(0),
            _ => Bytes::from(chunks.concat()),
        };
        let content = match String::from_utf8(bytes.to_vec()) {
            Ok(text) => Content::Text(text),
            Err(_) => Content::Binary(bytes),
        };

        Ok(Self {
            parts,
            content,
            rewritten: false,
        })
    }

    fn streamed(parts: Parts, body: Body) -> Self {
        Self {
            parts,
            content: Content::Streamed(body),
            rewritten: false,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.parts.status
    }

    pub fn content_ref(&self) -> &Content {
        &self.content
    }

    /// Whether the body was replaced since buffering.
    pub fn is_rewritten(&self) -> bool {
        self.rewritten
    }

    pub fn into_response(self) -> Response {
        let mut parts = self.parts;
        if !matches!(self.content, Content::Streamed(_)) {
            // The whole body is in memory now
            parts.headers.remove(header::TRANSFER_ENCODING);
        }

        let body = match self.content {
            Content::Text(text) => {
                if self.rewritten {
                    parts
                        .headers
                        .insert(header::CONTENT_LENGTH, HeaderValue::from(text.len()));
                }
                Body::from(text)
            }
            Content::Binary(bytes) => Body::from(bytes),
            Content::Streamed(body) => body,
        };

        Response::from_parts(parts, body)
    }
}

impl TextResponse for BufferedResponse {
    fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.parts.headers
    }

    fn content(&self) -> Option<&str> {
        match &self.content {
            Content::Text(text) => Some(text),
            _ => None,
        }
    }

    fn set_content(&mut self, content: String) -> Result<(), ContentError> {
        match self.content {
            Content::Streamed(_) => return Err(ContentError::Streamed),
            Content::Binary(_) => return Err(ContentError::Binary),
            Content::Text(_) => {}
        }

        let status = self.parts.status;
        let bodiless = status.is_informational()
            || status == StatusCode::NO_CONTENT
            || status == StatusCode::NOT_MODIFIED;
        if bodiless && !content.is_empty() {
            return Err(ContentError::BodilessStatus(status));
        }

        self.content = Content::Text(content);
        self.rewritten = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    fn response(status: StatusCode, body: Body) -> Response {
        let mut response = Response::new(body);
        *response.status_mut() = status;
        response
    }

    #[tokio::test]
    async fn test_text_is_buffered() {
        let buffered = BufferedResponse::buffer(
            response(StatusCode::OK, Body::from("<p>hello</p>")),
            1024,
        )
        .await
        .unwrap();

        assert_eq!(buffered.content(), Some("<p>hello</p>"));
    }

    #[tokio::test]
    async fn test_binary_is_not_text() {
        let mut buffered = BufferedResponse::buffer(
            response(StatusCode::OK, Body::from(vec![0xff, 0xfe, 0x00])),
            1024,
        )
        .await
        .unwrap();

        assert!(buffered.content().is_none());
        assert_eq!(
            buffered.set_content("x".to_string()),
            Err(ContentError::Binary)
        );
    }

    #[tokio::test]
    async fn test_oversized_body_is_streamed() {
        let buffered =
            BufferedResponse::buffer(response(StatusCode::OK, Body::from("0123456789")), 4)
                .await
                .unwrap();

        assert!(matches!(buffered.content_ref(), Content::Streamed(_)));
    }

    fn chunked(parts: &[&'static str]) -> Body {
        let chunks: Vec<_> = parts
            .iter()
            .map(|p| Ok::<_, std::io::Error>(Bytes::from_static(p.as_bytes())))
            .collect();
        Body::from_stream(stream::iter(chunks))
    }

    #[tokio::test]
    async fn test_stream_is_buffered() {
        let mut resp = response(StatusCode::OK, chunked(&["<p>hel", "lo</p>"]));
        resp.headers_mut()
            .insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));

        let mut buffered = BufferedResponse::buffer(resp, 1024).await.unwrap();
        assert_eq!(buffered.content(), Some("<p>hello</p>"));

        buffered.set_content("<p></p>".to_string()).unwrap();
        let resp = buffered.into_response();
        assert!(resp.headers().get(header::TRANSFER_ENCODING).is_none());
        assert_eq!(resp.headers()[header::CONTENT_LENGTH], "7");
    }

    #[tokio::test]
    async fn test_oversized_stream_keeps_every_byte() {
        let mut buffered = BufferedResponse::buffer(
            response(StatusCode::OK, chunked(&["0123", "4567", "89"])),
            6,
        )
        .await
        .unwrap();

        assert!(buffered.content().is_none());
        assert_eq!(
            buffered.set_content("x".to_string()),
            Err(ContentError::Streamed)
        );

        let body = axum::body::to_bytes(buffered.into_response().into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(body, "0123456789");
    }

    #[tokio::test]
    async fn test_encoded_body_is_not_buffered() {
        let mut resp = response(StatusCode::OK, Body::from("compressed"));
        resp.headers_mut()
            .insert(header::CONTENT_ENCODING, HeaderValue::from_static("gzip"));

        let buffered = BufferedResponse::buffer(resp, 1024).await.unwrap();
        assert!(buffered.content().is_none());
    }

    #[tokio::test]
    async fn test_bodiless_status_refuses_content() {
        let mut buffered = BufferedResponse::buffer(response(StatusCode::NO_CONTENT, Body::empty()), 1024)
            .await
            .unwrap();

        assert_eq!(
            buffered.set_content("x".to_string()),
            Err(ContentError::BodilessStatus(StatusCode::NO_CONTENT))
        );
        assert!(buffered.set_content(String::new()).is_ok());
    }

    #[tokio::test]
    async fn test_content_length_recomputed_on_rewrite() {
        let mut resp = response(StatusCode::OK, Body::from("abcdef"));
        resp.headers_mut()
            .insert(header::CONTENT_LENGTH, HeaderValue::from_static("6"));

        let mut buffered = BufferedResponse::buffer(resp, 1024).await.unwrap();
        buffered.set_content("abc".to_string()).unwrap();
        assert!(buffered.is_rewritten());

        let resp = buffered.into_response();
        assert_eq!(resp.headers()[header::CONTENT_LENGTH], "3");

        let body = axum::body::to_bytes(resp.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"abc");
    }
}
