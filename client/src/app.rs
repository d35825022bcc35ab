//! Frontend state machine.
//!
//! Upload goes `Idle -> FileSelected -> Uploading -> Idle`, the listing goes
//! `Loading -> Loaded` and the viewer goes `Closed -> Open -> Closed`.

use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use kernel::{FileRecord, UploadReply, UploadRequest, ViewEntry, PDF_CONTENT_TYPE};
use reqwest::Client;

use crate::endpoint::Endpoint;
use crate::ClientError;

pub const UPLOAD_FAILED: &str = "File upload failed";

const UNKNOWN_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub path: PathBuf,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadState {
    Idle,
    FileSelected(SelectedFile),
    Uploading,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Listing {
    Loading,
    Loaded(Vec<ViewEntry>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Viewer {
    Closed,
    Open(String),
}

pub struct App {
    http: Client,
    api: Endpoint,
    upload: UploadState,
    listing: Listing,
    viewer: Viewer,
    message: String,
}

impl App {
    pub fn new(api_url: &str) -> Result<Self, ClientError> {
        let api = Endpoint::new(api_url).ok_or_else(|| ClientError::InvalidUri(api_url.to_owned()))?;
        Ok(Self {
            http: Client::new(),
            api,
            upload: UploadState::Idle,
            listing: Listing::Loading,
            viewer: Viewer::Closed,
            message: String::new(),
        })
    }

    /// Creates the app and performs the initial listing fetch.
    pub async fn load(api_url: &str) -> Result<Self, ClientError> {
        let mut app = Self::new(api_url)?;
        app.fetch_files().await;
        Ok(app)
    }

    #[must_use]
    pub fn upload_state(&self) -> &UploadState {
        &self.upload
    }

    #[must_use]
    pub fn listing(&self) -> &Listing {
        &self.listing
    }

    #[must_use]
    pub fn viewer(&self) -> &Viewer {
        &self.viewer
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn files(&self) -> &[ViewEntry] {
        match &self.listing {
            Listing::Loaded(files) => files,
            Listing::Loading => &[],
        }
    }

    /// Selects a file for upload. Anything not declared as a PDF is refused without
    /// touching the network. This is a convenience check only, the server decides.
    pub fn select_file<P: Into<PathBuf>>(&mut self, path: P) -> Result<(), ClientError> {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        if declared_content_type(&path) != PDF_CONTENT_TYPE {
            self.upload = UploadState::Idle;
            return Err(ClientError::NotPdf(name));
        }

        self.upload = UploadState::FileSelected(SelectedFile { path, name });
        Ok(())
    }

    /// Uploads the selected file, shows the outcome and refreshes the listing on success.
    /// Does nothing when no file is selected.
    pub async fn upload(&mut self) -> Option<FileRecord> {
        let UploadState::FileSelected(file) = std::mem::replace(&mut self.upload, UploadState::Uploading)
        else {
            self.upload = UploadState::Idle;
            return None;
        };

        let result = self.send(&file).await;
        self.upload = UploadState::Idle;

        match result {
            Ok(reply) => {
                self.message = reply.message;
                self.fetch_files().await;
                Some(reply.metadata)
            }
            Err(e) => {
                tracing::error!("Error uploading file {}: {e}", file.path.display());
                self.message = UPLOAD_FAILED.to_owned();
                None
            }
        }
    }

    /// Fetches the listing. A failure is logged and keeps the previous listing.
    pub async fn fetch_files(&mut self) {
        match self.get_files().await {
            Ok(files) => self.listing = Listing::Loaded(files),
            Err(e) => tracing::error!("Error fetching file info: {e}"),
        }
    }

    pub fn open_viewer(&mut self, view_url: &str) {
        self.viewer = Viewer::Open(view_url.to_owned());
    }

    /// Opens the viewer on the listed entry with the given record id.
    pub fn open_entry(&mut self, id: &str) -> Result<(), ClientError> {
        let url = self
            .files()
            .iter()
            .find(|e| e.record.id == id)
            .map(|e| e.view_url.clone())
            .ok_or_else(|| ClientError::NoSuchFile(id.to_owned()))?;
        self.open_viewer(&url);
        Ok(())
    }

    pub fn close_viewer(&mut self) {
        self.viewer = Viewer::Closed;
    }

    /// Fetches the document shown in the viewer. Fails once the view URL expired.
    pub async fn render(&self) -> Result<Vec<u8>, ClientError> {
        let Viewer::Open(url) = &self.viewer else {
            return Err(ClientError::ViewerClosed);
        };
        let response = self.http.get(url).send().await?.error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn send(&self, file: &SelectedFile) -> Result<UploadReply, ClientError> {
        let data = tokio::fs::read(&file.path).await?;
        let request = UploadRequest {
            file_name: file.name.clone(),
            file_content: STANDARD.encode(data),
        };
        let response = self
            .http
            .post(self.api.upload())
            .json(&request)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    async fn get_files(&self) -> Result<Vec<ViewEntry>, ClientError> {
        let response = self
            .http
            .get(self.api.files())
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }
}

/// Content type a file would be declared with, judged by its extension as browsers do.
#[must_use]
pub fn declared_content_type(path: &Path) -> &'static str {
    match path.extension() {
        Some(ext) if ext.eq_ignore_ascii_case("pdf") => PDF_CONTENT_TYPE,
        _ => UNKNOWN_CONTENT_TYPE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const API: &str = "http://127.0.0.1:9";

    #[rstest]
    #[case("report.pdf", PDF_CONTENT_TYPE)]
    #[case("REPORT.PDF", PDF_CONTENT_TYPE)]
    #[case("dir/report.Pdf", PDF_CONTENT_TYPE)]
    #[case("report.txt", UNKNOWN_CONTENT_TYPE)]
    #[case("report", UNKNOWN_CONTENT_TYPE)]
    #[case("pdf", UNKNOWN_CONTENT_TYPE)]
    #[trace]
    fn content_type_by_extension(#[case] path: &str, #[case] expected: &str) {
        assert_eq!(declared_content_type(Path::new(path)), expected);
    }

    #[test]
    fn new_rejects_bad_uri() {
        // Act
        let result = App::new("not a uri");

        // Assert
        assert!(matches!(result, Err(ClientError::InvalidUri(_))));
    }

    #[test]
    fn initial_state() {
        // Act
        let app = App::new(API).unwrap();

        // Assert
        assert_eq!(app.upload_state(), &UploadState::Idle);
        assert_eq!(app.listing(), &Listing::Loading);
        assert_eq!(app.viewer(), &Viewer::Closed);
        assert!(app.files().is_empty());
        assert!(app.message().is_empty());
    }

    #[test]
    fn select_pdf() {
        // Arrange
        let mut app = App::new(API).unwrap();

        // Act
        app.select_file("/tmp/docs/report.pdf").unwrap();

        // Assert
        assert_eq!(
            app.upload_state(),
            &UploadState::FileSelected(SelectedFile {
                path: PathBuf::from("/tmp/docs/report.pdf"),
                name: "report.pdf".to_owned(),
            })
        );
    }

    #[test]
    fn select_not_pdf_clears_selection() {
        // Arrange
        let mut app = App::new(API).unwrap();
        app.select_file("report.pdf").unwrap();

        // Act
        let result = app.select_file("notes.txt");

        // Assert
        let err = result.unwrap_err();
        assert_eq!(err.to_string(), "Only PDF files are allowed!");
        assert_eq!(app.upload_state(), &UploadState::Idle);
    }

    #[tokio::test]
    async fn upload_without_selection_is_noop() {
        // Arrange
        let mut app = App::new(API).unwrap();

        // Act
        let result = app.upload().await;

        // Assert
        assert!(result.is_none());
        assert_eq!(app.upload_state(), &UploadState::Idle);
        assert!(app.message().is_empty());
    }

    #[tokio::test]
    async fn upload_unreadable_file_fails() {
        // Arrange
        let mut app = App::new(API).unwrap();
        app.select_file("/definitely/not/here.pdf").unwrap();

        // Act
        let result = app.upload().await;

        // Assert
        assert!(result.is_none());
        assert_eq!(app.message(), UPLOAD_FAILED);
        assert_eq!(app.upload_state(), &UploadState::Idle);
    }

    #[test]
    fn viewer_open_close() {
        // Arrange
        let mut app = App::new(API).unwrap();

        // Act
        app.open_viewer("http://localhost/objects/a.pdf?expires=1&signature=00");
        let opened = app.viewer().clone();
        app.close_viewer();

        // Assert
        assert_eq!(
            opened,
            Viewer::Open("http://localhost/objects/a.pdf?expires=1&signature=00".to_owned())
        );
        assert_eq!(app.viewer(), &Viewer::Closed);
    }

    #[test]
    fn open_unknown_entry() {
        // Arrange
        let mut app = App::new(API).unwrap();

        // Act
        let result = app.open_entry("missing");

        // Assert
        assert!(matches!(result, Err(ClientError::NoSuchFile(id)) if id == "missing"));
        assert_eq!(app.viewer(), &Viewer::Closed);
    }

    #[tokio::test]
    async fn render_closed_viewer() {
        // Arrange
        let app = App::new(API).unwrap();

        // Act
        let result = app.render().await;

        // Assert
        assert!(matches!(result, Err(ClientError::ViewerClosed)));
    }
}
