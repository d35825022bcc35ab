use axum::{
    body::Body,
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
};

use crate::domain::StoredObject;

/// Object content sent for inline display, so that browsers render PDFs in place.
pub struct FileReply {
    key: String,
    object: StoredObject,
}

impl FileReply {
    #[must_use]
    pub fn new(key: String, object: StoredObject) -> Self {
        Self { key, object }
    }

    fn disposition(&self) -> String {
        let name: String = self
            .key
            .chars()
            .filter(|c| !c.is_control() && *c != '"' && *c != '\\')
            .collect();
        format!(r#"inline; filename="{name}""#)
    }
}

impl IntoResponse for FileReply {
    fn into_response(self) -> Response {
        let disposition = self.disposition();
        let len = self.object.data.len().to_string();
        let content_type = HeaderValue::from_str(&self.object.content_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));

        let mut res = Body::from(self.object.data).into_response();
        res.headers_mut().insert(header::CONTENT_TYPE, content_type);
        if let Ok(val) = HeaderValue::from_str(&disposition) {
            res.headers_mut().insert(header::CONTENT_DISPOSITION, val);
        }
        if let Ok(val) = HeaderValue::from_str(&len) {
            res.headers_mut().insert(header::CONTENT_LENGTH, val);
        }

        res
    }
}
