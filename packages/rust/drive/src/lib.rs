//! Google Drive collaborators: folder listing and content reading.
//!
//! [`DriveClient`] implements both [`FileLister`] and [`ContentReader`]
//! against the Drive v3 REST API, authenticated by an explicit
//! [`DriveSession`]. Both boundaries degrade instead of failing: a listing
//! that cannot be fetched yields no files, and a download that cannot be
//! decoded yields empty text.

mod docx;
mod session;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use drivedocs_shared::{
    DOCX_MIME, DriveConfig, DriveDocsError, FileDescriptor, FileType, GOOGLE_DOC_MIME,
    ModifiedDate, Result, UNTITLED,
};

pub use docx::extract_text as extract_docx_text;
pub use session::{DRIVE_READONLY_SCOPE, DriveSession, StoredToken};

/// Prefix shared by native Google Workspace MIME types.
const GOOGLE_APPS_PREFIX: &str = "application/vnd.google-apps.";

/// Fields requested from `files.list`.
const LIST_FIELDS: &str = "nextPageToken,files(id,name,mimeType,modifiedTime)";

/// Maximum page size accepted by `files.list`.
const PAGE_SIZE: u32 = 1000;

/// User-Agent string for Drive requests.
const USER_AGENT: &str = concat!("drivedocs/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Collaborator traits
// ---------------------------------------------------------------------------

/// Lists the files of a remote folder.
#[async_trait]
pub trait FileLister: Send + Sync {
    /// List non-trashed files in `folder_id`. Failures yield an empty list.
    async fn list_files(&self, folder_id: &str) -> Vec<FileDescriptor>;
}

/// Fetches and decodes the text content of a remote file.
#[async_trait]
pub trait ContentReader: Send + Sync {
    /// Read the file's text.
    ///
    /// Download and decode failures yield `Ok("")`; only a declared type the
    /// reader cannot handle is reported as an error.
    async fn read_content(&self, descriptor: &FileDescriptor) -> Result<String>;
}

// ---------------------------------------------------------------------------
// Drive API wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileList {
    #[serde(default)]
    files: Vec<RemoteFile>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoteFile {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    mime_type: Option<String>,
    #[serde(default)]
    modified_time: Option<String>,
}

impl From<RemoteFile> for FileDescriptor {
    fn from(file: RemoteFile) -> Self {
        let mime_type = file.mime_type.unwrap_or_default();
        Self {
            title: file
                .name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| UNTITLED.to_string()),
            id: file.id.unwrap_or_default(),
            modified: ModifiedDate::from_timestamp(file.modified_time.as_deref()),
            file_type: FileType::from_mime(&mime_type),
            mime_type,
        }
    }
}

// ---------------------------------------------------------------------------
// DriveClient
// ---------------------------------------------------------------------------

/// Drive v3 client implementing the lister and reader collaborators.
pub struct DriveClient {
    client: Client,
    session: DriveSession,
    api_base: String,
}

impl DriveClient {
    /// Create a client against `config.api_base` using the given session.
    pub fn new(config: &DriveConfig, session: DriveSession) -> Result<Self> {
        Ok(Self {
            client: build_client(config.timeout_secs)?,
            session,
            api_base: config.api_base.trim_end_matches('/').to_string(),
        })
    }

    /// Fallible listing used by [`FileLister::list_files`].
    #[instrument(skip(self))]
    pub async fn try_list_files(&self, folder_id: &str) -> Result<Vec<FileDescriptor>> {
        let query = folder_query(folder_id);
        let url = format!("{}/drive/v3/files", self.api_base);

        let mut descriptors = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page_size = PAGE_SIZE.to_string();
            let mut params = vec![
                ("q", query.as_str()),
                ("fields", LIST_FIELDS),
                ("pageSize", page_size.as_str()),
            ];
            if let Some(token) = page_token.as_deref() {
                params.push(("pageToken", token));
            }

            let response = self
                .get_authorized(&url, &params, |e| {
                    DriveDocsError::Listing(format!("{url}: {e}"))
                })
                .await?;

            let status = response.status();
            if is_auth_rejection(status) {
                return Err(DriveDocsError::Authentication(format!(
                    "Drive rejected the access token: HTTP {status}"
                )));
            }
            if !status.is_success() {
                return Err(DriveDocsError::Listing(format!("{url}: HTTP {status}")));
            }

            let page: FileList = response
                .json()
                .await
                .map_err(|e| DriveDocsError::Listing(format!("invalid file list: {e}")))?;

            debug!(count = page.files.len(), "received listing page");
            descriptors.extend(page.files.into_iter().map(FileDescriptor::from));

            match page.next_page_token {
                Some(next) if !next.is_empty() => page_token = Some(next),
                _ => break,
            }
        }

        info!(folder_id, files = descriptors.len(), "listed folder");
        Ok(descriptors)
    }

    /// Download and decode, surfacing every failure.
    async fn fetch_text(&self, descriptor: &FileDescriptor) -> Result<String> {
        let id = &descriptor.id;
        match descriptor.file_type {
            FileType::PlainText => {
                let bytes = self.download(&self.media_url(id), &[("alt", "media")], id).await?;
                String::from_utf8(bytes)
                    .map_err(|e| DriveDocsError::read(id, format!("not valid UTF-8: {e}")))
            }
            FileType::RichDocument => {
                let bytes = if descriptor.mime_type == GOOGLE_DOC_MIME {
                    let url = format!("{}/export", self.media_url(id));
                    self.download(&url, &[("mimeType", DOCX_MIME)], id).await?
                } else {
                    self.download(&self.media_url(id), &[("alt", "media")], id).await?
                };

                tokio::task::spawn_blocking(move || docx::extract_text(&bytes))
                    .await
                    .map_err(|e| DriveDocsError::read(id, format!("decode task failed: {e}")))?
            }
        }
    }

    /// Send an authenticated GET. A rejected token is refreshed and the
    /// request retried once.
    async fn get_authorized(
        &self,
        url: &str,
        params: &[(&str, &str)],
        on_send_error: impl Fn(reqwest::Error) -> DriveDocsError,
    ) -> Result<reqwest::Response> {
        let mut retried = false;
        loop {
            let token = self.session.access_token().await?;
            let response = self
                .client
                .get(url)
                .bearer_auth(&token)
                .query(params)
                .send()
                .await
                .map_err(&on_send_error)?;

            let status = response.status();
            if is_auth_rejection(status) && !retried && self.session.invalidate().await {
                warn!(%status, "Drive rejected the access token, refreshing");
                retried = true;
                continue;
            }
            return Ok(response);
        }
    }

    fn media_url(&self, id: &str) -> String {
        format!("{}/drive/v3/files/{id}", self.api_base)
    }

    async fn download(&self, url: &str, params: &[(&str, &str)], id: &str) -> Result<Vec<u8>> {
        let response = self
            .get_authorized(url, params, |e| DriveDocsError::read(id, e.to_string()))
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DriveDocsError::read(id, format!("HTTP {status}")));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| DriveDocsError::read(id, format!("failed to read body: {e}")))?;

        debug!(file_id = id, size = bytes.len(), "downloaded file");
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl FileLister for DriveClient {
    async fn list_files(&self, folder_id: &str) -> Vec<FileDescriptor> {
        match self.try_list_files(folder_id).await {
            Ok(files) => files,
            Err(e) => {
                warn!(folder_id, error = %e, "listing failed, continuing with no files");
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl ContentReader for DriveClient {
    #[instrument(skip_all, fields(file_id = %descriptor.id, file_type = %descriptor.file_type))]
    async fn read_content(&self, descriptor: &FileDescriptor) -> Result<String> {
        check_supported(descriptor)?;

        match self.fetch_text(descriptor).await {
            Ok(text) => Ok(text),
            Err(e) => {
                warn!(title = %descriptor.title, error = %e, "read failed, using empty content");
                Ok(String::new())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Reject Workspace types that have no document export (folders, sheets, ...).
fn check_supported(descriptor: &FileDescriptor) -> Result<()> {
    let mime = descriptor.mime_type.as_str();
    if descriptor.file_type == FileType::RichDocument
        && mime.starts_with(GOOGLE_APPS_PREFIX)
        && mime != GOOGLE_DOC_MIME
    {
        return Err(DriveDocsError::UnsupportedFileType(mime.to_string()));
    }
    Ok(())
}

fn is_auth_rejection(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
}

/// Build the `files.list` query. An empty folder id lists everything.
fn folder_query(folder_id: &str) -> String {
    if folder_id.is_empty() {
        "trashed=false".to_string()
    } else {
        let escaped = folder_id.replace('\\', "\\\\").replace('\'', "\\'");
        format!("'{escaped}' in parents and trashed=false")
    }
}

/// Build a reqwest client with appropriate settings.
pub fn build_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| DriveDocsError::Network(format!("failed to build HTTP client: {e}")))
}
