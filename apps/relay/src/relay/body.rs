//! Outbound body encoding.
//!
//! Decision order, first match wins:
//! 1. `multipart/form-data` → rebuilt part by part, never JSON-parsed
//! 2. body parses as JSON → original bytes as `application/json`
//! 3. `application/x-www-form-urlencoded` → pairs parsed and re-serialized
//! 4. anything else → raw bytes with the inbound content type
//!    (PUT defaults to `application/json` when none was given)

use axum::{
    extract::{FromRequest, Multipart, Request},
    http::header::CONTENT_TYPE,
};
use bytes::Bytes;
use reqwest::{multipart, RequestBuilder};
use url::form_urlencoded;

use super::{RelayError, RelayMethod};

/// Upper bound on an inbound relay body (résumé uploads included).
pub const MAX_BODY_BYTES: usize = 25 * 1024 * 1024;

const APPLICATION_JSON: &str = "application/json";
const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
const MULTIPART_FORM_DATA: &str = "multipart/form-data";

/// One field of an inbound multipart form.
#[derive(Debug, Clone, PartialEq)]
pub struct FormPart {
    pub name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Bytes,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OutboundBody {
    Empty,
    Multipart(Vec<FormPart>),
    Json(Bytes),
    UrlEncoded(Vec<(String, String)>),
    Text {
        body: Bytes,
        content_type: Option<String>,
    },
}

impl OutboundBody {
    /// Reads the inbound body of a POST/PUT and picks its outbound encoding.
    pub async fn from_request(method: RelayMethod, request: Request) -> Result<Self, RelayError> {
        let content_type = request
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        if has_media_type(content_type.as_deref(), MULTIPART_FORM_DATA) {
            let multipart = Multipart::from_request(request, &())
                .await
                .map_err(|e| RelayError::InvalidBody(e.body_text()))?;
            return read_multipart(multipart).await.map(OutboundBody::Multipart);
        }

        let body = axum::body::to_bytes(request.into_body(), MAX_BODY_BYTES)
            .await
            .map_err(|e| RelayError::InvalidBody(e.to_string()))?;

        Ok(Self::from_bytes(method, content_type.as_deref(), body))
    }

    /// Steps 2–4 of the decision order, for an already-buffered body.
    pub fn from_bytes(method: RelayMethod, content_type: Option<&str>, body: Bytes) -> Self {
        if serde_json::from_slice::<serde_json::Value>(&body).is_ok() {
            return OutboundBody::Json(body);
        }

        if has_media_type(content_type, FORM_URLENCODED) {
            let pairs = form_urlencoded::parse(&body).into_owned().collect();
            return OutboundBody::UrlEncoded(pairs);
        }

        let content_type = match (content_type, method) {
            (Some(ct), _) => Some(ct.to_string()),
            (None, RelayMethod::Put) => Some(APPLICATION_JSON.to_string()),
            (None, _) => None,
        };

        OutboundBody::Text { body, content_type }
    }

    /// Attaches the body and its `Content-Type` to a backend request.
    pub fn apply(self, builder: RequestBuilder) -> Result<RequestBuilder, RelayError> {
        let builder = match self {
            OutboundBody::Empty => builder,
            OutboundBody::Json(body) => builder
                .header(CONTENT_TYPE.as_str(), APPLICATION_JSON)
                .body(body),
            OutboundBody::UrlEncoded(pairs) => {
                let encoded = form_urlencoded::Serializer::new(String::new())
                    .extend_pairs(pairs.iter())
                    .finish();
                builder.header(CONTENT_TYPE.as_str(), FORM_URLENCODED).body(encoded)
            }
            OutboundBody::Text { body, content_type } => match content_type {
                Some(ct) => builder.header(CONTENT_TYPE.as_str(), ct).body(body),
                None => builder.body(body),
            },
            OutboundBody::Multipart(parts) => {
                let mut form = multipart::Form::new();
                for part in parts {
                    let (name, part) = part.into_reqwest()?;
                    form = form.part(name, part);
                }
                // reqwest writes its own boundary into the content type
                builder.multipart(form)
            }
        };
        Ok(builder)
    }
}

impl FormPart {
    fn into_reqwest(self) -> Result<(String, multipart::Part), RelayError> {
        let FormPart {
            name,
            file_name,
            content_type,
            data,
        } = self;

        let mut part = multipart::Part::bytes(data.to_vec());
        if let Some(file_name) = file_name {
            part = part.file_name(file_name);
        }
        if let Some(ct) = content_type {
            part = part.mime_str(&ct).map_err(|e| {
                RelayError::InvalidBody(format!("part '{name}' has invalid content type: {e}"))
            })?;
        }
        Ok((name, part))
    }
}

async fn read_multipart(mut multipart: Multipart) -> Result<Vec<FormPart>, RelayError> {
    let mut parts = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| RelayError::InvalidBody(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| RelayError::InvalidBody(e.body_text()))?;

        parts.push(FormPart {
            name,
            file_name,
            content_type,
            data,
        });
    }
    Ok(parts)
}

/// Compares the media type (the part before any `;` parameters).
fn has_media_type(content_type: Option<&str>, expected: &str) -> bool {
    content_type
        .and_then(|ct| ct.split(';').next())
        .map(|essence| essence.trim().eq_ignore_ascii_case(expected))
        .unwrap_or(false)
}
