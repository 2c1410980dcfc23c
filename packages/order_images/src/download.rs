use crate::error::{BoxError, FetchError};
use crate::utils::file::remove_partial;

use futures::{Stream, StreamExt};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::{debug, info};
use reqwest::{Client, StatusCode};
use std::path::Path;
use tokio::fs::File as AsyncFile;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Downloads one image and streams it to `destination`
///
/// The scheme (`http`/`https`) is taken from the URL by the client. Only a
/// `200 OK` response is written; any failure after the file was created
/// removes it again.
///
/// # Arguments
/// * `client` - HTTP client instance
/// * `url` - Image URL
/// * `destination` - File to create
/// * `multi_progress` - Progress display to attach a bar to, if any
///
/// # Returns
/// Number of bytes written
pub async fn fetch(
    client: &Client,
    url: &str,
    destination: &Path,
    multi_progress: Option<&MultiProgress>,
) -> Result<u64, FetchError> {
    info!("Starting download: {} -> {}", url, destination.display());

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| FetchError::NetworkFailed(e.into()))?;

    let status = response.status();
    if status != StatusCode::OK {
        return Err(FetchError::BadStatus(status));
    }

    let pb = progress_bar(multi_progress, response.content_length(), destination);
    let result = persist(response.bytes_stream(), destination, &pb).await;
    pb.finish_and_clear();

    if let Ok(bytes) = &result {
        info!("Completed download: {} ({} bytes)", destination.display(), bytes);
    }
    result
}

/// Writes a body stream to a new file at `destination`.
///
/// On any error the partially written file is removed (best-effort) before
/// the error is returned.
pub async fn persist<S, B, E>(
    stream: S,
    destination: &Path,
    pb: &ProgressBar,
) -> Result<u64, FetchError>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Into<BoxError>,
{
    let file = AsyncFile::create(destination)
        .await
        .map_err(FetchError::WriteFailed)?;
    persist_into(stream, file, destination, pb).await
}

/// Streams into an already opened `writer` for `destination`, removing
/// `destination` if the body cannot be written completely.
async fn persist_into<S, B, E, W>(
    stream: S,
    mut writer: W,
    destination: &Path,
    pb: &ProgressBar,
) -> Result<u64, FetchError>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Into<BoxError>,
    W: AsyncWrite + Unpin,
{
    match write_body(stream, &mut writer, pb).await {
        Ok(written) => Ok(written),
        Err(e) => {
            drop(writer);
            debug!("Removing partial file {}", destination.display());
            remove_partial(destination).await;
            Err(e)
        }
    }
}

async fn write_body<S, B, E, W>(stream: S, writer: &mut W, pb: &ProgressBar) -> Result<u64, FetchError>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Into<BoxError>,
    W: AsyncWrite + Unpin,
{
    let mut stream = std::pin::pin!(stream);
    let mut written: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| FetchError::NetworkFailed(e.into()))?;
        let chunk = chunk.as_ref();
        writer.write_all(chunk).await.map_err(FetchError::WriteFailed)?;
        written += chunk.len() as u64;
        pb.set_position(written);
    }

    writer.flush().await.map_err(FetchError::WriteFailed)?;
    Ok(written)
}

fn progress_bar(
    multi_progress: Option<&MultiProgress>,
    total_bytes: Option<u64>,
    destination: &Path,
) -> ProgressBar {
    let Some(multi_progress) = multi_progress else {
        return ProgressBar::hidden();
    };

    let pb = match total_bytes {
        Some(total) => multi_progress.add(ProgressBar::new(total)),
        None => multi_progress.add(ProgressBar::no_length()),
    };
    let style = ProgressStyle::with_template(
        "{msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})",
    )
    .map(|style| style.progress_chars("#>-"))
    .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb.set_message(
        destination
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default(),
    );
    pb
}
