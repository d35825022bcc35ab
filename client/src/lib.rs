use std::path::PathBuf;

use app::App;
use chrono::Local;
use comfy_table::{presets::UTF8_HORIZONTAL_ONLY, Attribute, Cell, ContentArrangement, Table};
use kernel::ViewEntry;
use thiserror::Error;

pub mod app;
pub mod endpoint;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Only PDF files are allowed!")]
    NotPdf(String),

    #[error("invalid API URL '{0}'")]
    InvalidUri(String),

    #[error("no file with id {0}")]
    NoSuchFile(String),

    #[error("viewer is closed")]
    ViewerClosed,

    #[error("Could not retrieve files")]
    ListingUnavailable,

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub struct UploadParams {
    pub uri: String,
    pub file: String,
}

pub struct ViewParams {
    pub uri: String,
    pub id: String,
    pub output: String,
}

pub async fn upload_file(params: UploadParams) -> Result<(), ClientError> {
    let mut app = App::load(&params.uri).await?;
    app.select_file(&params.file)?;
    app.upload().await;
    println!("{}", app.message());
    println!("{}", files_table(app.files()));
    Ok(())
}

pub async fn list_files(uri: &str) -> Result<(), ClientError> {
    let app = App::load(uri).await?;
    match app.listing() {
        app::Listing::Loaded(files) => {
            println!("{}", files_table(files));
            Ok(())
        }
        app::Listing::Loading => Err(ClientError::ListingUnavailable),
    }
}

/// Opens the viewer on one file and writes the document it shows to `output`.
pub async fn view_file(params: ViewParams) -> Result<(), ClientError> {
    let mut app = App::load(&params.uri).await?;
    app.open_entry(&params.id)?;
    let result = app.render().await;
    app.close_viewer();

    let data = result?;
    let output = PathBuf::from(&params.output);
    tokio::fs::write(&output, &data).await?;
    println!("{} bytes written to {}", data.len(), output.display());
    Ok(())
}

#[must_use]
pub fn files_table(files: &[ViewEntry]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_HORIZONTAL_ONLY)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120)
        .set_header(vec![
            Cell::new("File Name").add_attribute(Attribute::Bold),
            Cell::new("Upload Date").add_attribute(Attribute::Bold),
            Cell::new("Id").add_attribute(Attribute::Bold),
        ]);

    for f in files {
        let uploaded = f.record.upload_date.with_timezone(&Local);
        table.add_row(vec![
            Cell::new(&f.record.file_name),
            Cell::new(uploaded.format("%Y-%m-%d %H:%M:%S")),
            Cell::new(&f.record.id),
        ]);
    }
    table
}
