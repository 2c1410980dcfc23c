//! Drives a whole run: load the orders, prepare the output directories,
//! decide which images still need downloading and fetch them.
//!
//! Every image reference ends up as one [`ImageOutcome`] in the [`Report`],
//! in the order it appears in the orders file. Per-image failures are
//! recorded there and never stop the remaining downloads.

use crate::config::Settings;
use crate::download::fetch;
use crate::error::{FetchError, OrchestrationError};
use crate::loader::load_orders;
use crate::models::Order;
use crate::paths::{
    DELIVERY_PHOTOS_DIR, PRODUCT_THUMBNAILS_DIR, delivery_photo_file_name, thumbnail_file_name,
};
use crate::utils::file::create_dir;

use futures::StreamExt;
use indicatif::MultiProgress;
use log::{debug, info, warn};
use reqwest::Client;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Which kind of image a reference points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    DeliveryPhoto,
    Thumbnail,
}

impl fmt::Display for ImageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageKind::DeliveryPhoto => write!(f, "delivery photo"),
            ImageKind::Thumbnail => write!(f, "thumbnail"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// A file already exists at the destination
    AlreadyPresent,
    /// An earlier reference in this run already saved the same destination
    Duplicate,
}

#[derive(Debug)]
pub enum ImageStatus {
    Downloaded(u64),
    Skipped(SkipReason),
    Failed(FetchError),
}

/// Result for one image reference
#[derive(Debug)]
pub struct ImageOutcome {
    pub kind: ImageKind,
    /// Order timestamp for delivery photos, product name for thumbnails
    pub label: Option<String>,
    pub url: String,
    /// `None` when no file name could be derived from the reference
    pub destination: Option<PathBuf>,
    pub status: ImageStatus,
}

/// Per-image outcomes of a run, in orders-file order
#[derive(Debug, Default)]
pub struct Report {
    pub outcomes: Vec<ImageOutcome>,
}

impl Report {
    pub fn downloaded(&self) -> usize {
        self.count(|status| matches!(status, ImageStatus::Downloaded(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|status| matches!(status, ImageStatus::Skipped(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|status| matches!(status, ImageStatus::Failed(_)))
    }

    /// Outcomes whose download did not succeed, with their error
    pub fn failures(&self) -> impl Iterator<Item = (&ImageOutcome, &FetchError)> {
        self.outcomes.iter().filter_map(|outcome| match &outcome.status {
            ImageStatus::Failed(e) => Some((outcome, e)),
            _ => None,
        })
    }

    fn count(&self, pred: impl Fn(&ImageStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.status)).count()
    }
}

/// The two output directories under the save root
#[derive(Debug, Clone)]
pub struct OutputDirs {
    pub delivery_photos: PathBuf,
    pub product_thumbnails: PathBuf,
}

impl OutputDirs {
    /// Creates both output directories under `save_root` if missing
    pub fn prepare(save_root: &Path) -> Result<Self, OrchestrationError> {
        let dirs = Self {
            delivery_photos: save_root.join(DELIVERY_PHOTOS_DIR),
            product_thumbnails: save_root.join(PRODUCT_THUMBNAILS_DIR),
        };
        for dir in [&dirs.delivery_photos, &dirs.product_thumbnails] {
            create_dir(dir).map_err(|source| OrchestrationError::DirCreateFailed {
                path: dir.clone(),
                source,
            })?;
        }
        Ok(dirs)
    }
}

/// Directory the images are saved under: the one holding the orders file
pub fn save_root(orders_path: &Path) -> PathBuf {
    match orders_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// One image reference and what to do with it
#[derive(Debug)]
struct Candidate {
    /// Position in orders-file order
    index: usize,
    kind: ImageKind,
    label: Option<String>,
    url: String,
    destination: Option<PathBuf>,
    /// Already decided without a request (skip or derivation failure)
    resolved: Option<ImageStatus>,
}

/// Walks orders and items in order and decides, per image, whether a
/// download is needed. Images whose file already exists are skipped.
fn plan(orders: &[Order], dirs: &OutputDirs) -> Vec<Candidate> {
    let mut candidates = Vec::new();

    for order in orders {
        if let Some(url) = order.delivery_photo() {
            let name = delivery_photo_file_name(&order.date_time, url);
            candidates.push(candidate(
                candidates.len(),
                ImageKind::DeliveryPhoto,
                Some(order.date_time.clone()),
                url,
                name.map(|n| dirs.delivery_photos.join(n)),
            ));
        }

        for item in &order.items {
            if let Some(url) = item.thumbnail() {
                let name = thumbnail_file_name(url);
                candidates.push(candidate(
                    candidates.len(),
                    ImageKind::Thumbnail,
                    item.name.clone(),
                    url,
                    name.map(|n| dirs.product_thumbnails.join(n)),
                ));
            }
        }
    }

    candidates
}

fn candidate(
    index: usize,
    kind: ImageKind,
    label: Option<String>,
    url: &str,
    destination: Result<PathBuf, FetchError>,
) -> Candidate {
    let (destination, resolved) = match destination {
        Err(e) => (None, Some(ImageStatus::Failed(e))),
        Ok(path) if path.exists() => {
            info!("File already exists: {}. Skipping.", path.display());
            (Some(path), Some(ImageStatus::Skipped(SkipReason::AlreadyPresent)))
        }
        Ok(path) => (Some(path), None),
    };

    Candidate {
        index,
        kind,
        label,
        url: url.to_string(),
        destination,
        resolved,
    }
}

/// Splits candidates into download groups. Candidates that still need a
/// request and share a destination land in one group, in orders-file order,
/// so each destination has a single writer.
fn group_by_destination(candidates: Vec<Candidate>) -> Vec<Vec<Candidate>> {
    let mut groups: Vec<Vec<Candidate>> = Vec::new();
    let mut slots: HashMap<PathBuf, usize> = HashMap::new();

    for candidate in candidates {
        let key = match (&candidate.resolved, &candidate.destination) {
            (None, Some(path)) => Some(path.clone()),
            _ => None,
        };
        match key {
            Some(path) => match slots.get(&path) {
                Some(&slot) => groups[slot].push(candidate),
                None => {
                    slots.insert(path, groups.len());
                    groups.push(vec![candidate]);
                }
            },
            None => groups.push(vec![candidate]),
        }
    }

    groups
}

/// Tries the candidates of one destination in order. Once one of them has
/// saved the file the rest are skipped; until then each one is fetched.
async fn execute_group(
    client: &Client,
    group: Vec<Candidate>,
    multi_progress: Option<&MultiProgress>,
) -> Vec<(usize, ImageOutcome)> {
    let mut outcomes = Vec::with_capacity(group.len());
    let mut saved = false;

    for candidate in group {
        let index = candidate.index;
        let outcome = execute(client, candidate, saved, multi_progress).await;
        saved |= matches!(outcome.status, ImageStatus::Downloaded(_));
        outcomes.push((index, outcome));
    }

    outcomes
}

async fn execute(
    client: &Client,
    candidate: Candidate,
    saved: bool,
    multi_progress: Option<&MultiProgress>,
) -> ImageOutcome {
    let Candidate {
        index: _,
        kind,
        label,
        url,
        destination,
        resolved,
    } = candidate;

    let status = match (resolved, &destination) {
        (Some(status), _) => status,
        (None, Some(path)) if saved => {
            debug!("{} was saved earlier in this run", path.display());
            ImageStatus::Skipped(SkipReason::Duplicate)
        }
        (None, Some(path)) => match fetch(client, &url, path, multi_progress).await {
            Ok(bytes) => ImageStatus::Downloaded(bytes),
            Err(e) => ImageStatus::Failed(e),
        },
        (None, None) => ImageStatus::Failed(FetchError::InvalidUrl(url.clone())),
    };

    if let ImageStatus::Failed(e) = &status {
        warn!("Failed to download {} {}: {}", kind, url, e);
    }

    ImageOutcome {
        kind,
        label,
        url,
        destination,
        status,
    }
}

/// Runs the planned downloads with at most `concurrency` destinations in
/// flight. With `concurrency == 1` each download finishes before the next
/// starts.
async fn download_all(
    client: &Client,
    candidates: Vec<Candidate>,
    concurrency: usize,
    multi_progress: Option<&MultiProgress>,
) -> Report {
    let mut outcomes: Vec<(usize, ImageOutcome)> =
        futures::stream::iter(group_by_destination(candidates))
            .map(|group| execute_group(client, group, multi_progress))
            .buffered(concurrency.max(1))
            .flat_map(futures::stream::iter)
            .collect::<Vec<_>>()
            .await;
    outcomes.sort_by_key(|(index, _)| *index);

    Report {
        outcomes: outcomes.into_iter().map(|(_, outcome)| outcome).collect(),
    }
}

fn build_client(settings: &Settings) -> Result<Client, OrchestrationError> {
    let mut builder = Client::builder().user_agent(settings.user_agent.as_str());
    if let Some(timeout) = settings.timeout {
        builder = builder.timeout(timeout);
    }
    Ok(builder.build()?)
}

/// Downloads every missing image referenced by the orders file
///
/// # Arguments
/// * `orders_path` - Path to the orders JSON file
/// * `settings` - Effective run settings
///
/// # Returns
/// Per-image report. Only setup failures are returned as errors.
pub async fn run(orders_path: &Path, settings: &Settings) -> Result<Report, OrchestrationError> {
    let orders = load_orders(orders_path)?;
    info!("Loaded {} orders from {}", orders.len(), orders_path.display());

    let root = save_root(orders_path);
    let dirs = OutputDirs::prepare(&root)?;
    let client = build_client(settings)?;

    let candidates = plan(&orders, &dirs);
    let pending = candidates.iter().filter(|c| c.resolved.is_none()).count();
    info!(
        "{} image references, {} to download into {}",
        candidates.len(),
        pending,
        root.display()
    );

    let multi_progress = settings.progress.then(MultiProgress::new);
    Ok(download_all(&client, candidates, settings.concurrency, multi_progress.as_ref()).await)
}
