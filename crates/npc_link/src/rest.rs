use std::path::Path;

use reqwest::multipart::{Form, Part};
use serde_json::Value;
use tracing::{debug, info};
use url::Url;

use crate::protocol::{
    decode_json, AvatarRecord, ErrorBody, InitializeRequest, InitializeResponse, SessionId,
    UploadResponse,
};
use crate::LinkError;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

/// The three REST endpoints the backend exposes.
#[derive(Debug, Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base_url: Url,
}

impl RestClient {
    pub fn new(base_url: &str) -> Result<Self, LinkError> {
        let mut parsed = Url::parse(base_url).map_err(|error| LinkError::InvalidUrl {
            url: base_url.to_string(),
            message: error.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(LinkError::InvalidUrl {
                url: base_url.to_string(),
                message: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }
        if !parsed.path().ends_with('/') {
            let path = format!("{}/", parsed.path());
            parsed.set_path(&path);
        }
        Ok(Self {
            http: reqwest::Client::new(),
            base_url: parsed,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, LinkError> {
        self.base_url.join(path).map_err(|error| LinkError::InvalidUrl {
            url: format!("{}{path}", self.base_url),
            message: error.to_string(),
        })
    }

    /// Uploads one file as multipart field `file` and returns the server-side path.
    pub async fn upload_file(&self, path: &Path) -> Result<String, LinkError> {
        let url = self.endpoint("upload")?;
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| LinkError::ReadUpload {
                path: path.to_path_buf(),
                source,
            })?;
        let file_name = upload_file_name(path);
        debug!(file = %file_name, bytes = bytes.len(), "upload_started");
        let form = Form::new().part("file", Part::bytes(bytes).file_name(file_name.clone()));
        let response = self
            .http
            .post(url.clone())
            .multipart(form)
            .send()
            .await
            .map_err(|source| http_error(&url, source))?;
        let body = success_body(response, &url).await?;
        let uploaded: UploadResponse = decode_json(&body, "upload response")?;
        info!(file = %file_name, file_path = %uploaded.file_path, "upload_finished");
        Ok(uploaded.file_path)
    }

    pub async fn initialize(&self, request: &InitializeRequest) -> Result<SessionId, LinkError> {
        let url = self.endpoint("initialize")?;
        let response = self
            .http
            .post(url.clone())
            .json(request)
            .send()
            .await
            .map_err(|source| http_error(&url, source))?;
        let body = success_body(response, &url).await?;
        let initialized: InitializeResponse = decode_json(&body, "initialize response")?;
        info!(
            name = %request.name,
            session_id = %initialized.session_id,
            with_files = request.files.is_some(),
            "session_initialized"
        );
        Ok(initialized.session_id)
    }

    /// Saved characters. A body that is not a JSON array counts as an empty list.
    pub async fn list_avatars(&self) -> Result<Vec<AvatarRecord>, LinkError> {
        let url = self.endpoint("avatars")?;
        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|source| http_error(&url, source))?;
        let body = success_body(response, &url).await?;
        let value: Value = decode_json(&body, "avatar list")?;
        if !value.is_array() {
            return Ok(Vec::new());
        }
        let entries: Vec<Option<AvatarRecord>> = decode_json(&body, "avatar list")?;
        Ok(entries.into_iter().flatten().collect())
    }
}

pub fn upload_file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn http_error(url: &Url, source: reqwest::Error) -> LinkError {
    LinkError::Http {
        url: url.to_string(),
        source,
    }
}

async fn success_body(response: reqwest::Response, url: &Url) -> Result<String, LinkError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|source| http_error(url, source))?;
    if status.is_success() {
        return Ok(body);
    }
    let detail = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(|error_body| error_body.detail_text());
    Err(LinkError::Status {
        status: status.as_u16(),
        detail,
        body,
    })
}
