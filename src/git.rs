//! Mirror synchronization against the upstream data repository.
//! Clone when the mirror is absent, otherwise fetch and fast-forward.
//! "Already up to date" is a distinguished outcome, not an error: callers
//! use it to skip the rest of an ingestion cycle.

use std::path::Path;
use std::time::{Duration, Instant};

use git2::build::{CheckoutBuilder, RepoBuilder};
use git2::{FetchOptions, RemoteCallbacks, Repository};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Fresh mirror created; its working tree already holds upstream HEAD.
    Cloned,
    /// Fast-forwarded to new upstream commits.
    Updated,
    /// Upstream unchanged since the last sync.
    NoUpdate,
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("git operation exceeded its {0:?} deadline")]
    Timeout(Duration),
    #[error("git sync task aborted: {0}")]
    Aborted(#[from] tokio::task::JoinError),
    #[error(transparent)]
    Git(#[from] git2::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Brings the local mirror up to date within `deadline`.
///
/// The blocking libgit2 work runs on the blocking pool. The deadline is
/// enforced twice: a transfer-progress callback aborts the wire transfer
/// once the deadline passes, and an outer timeout bounds the await so the
/// caller regains control even if the callback is never polled. On-disk
/// state after a timeout is re-evaluated from scratch on the next cycle.
pub async fn sync_repo(
    repo_path: &Path,
    url: &str,
    deadline: Duration,
) -> Result<SyncOutcome, SyncError> {
    let path = repo_path.to_path_buf();
    let url = url.to_owned();
    let task = tokio::task::spawn_blocking(move || sync_repo_blocking(&path, &url, deadline));

    match tokio::time::timeout(deadline, task).await {
        Err(_elapsed) => Err(SyncError::Timeout(deadline)),
        Ok(joined) => joined?,
    }
}

fn sync_repo_blocking(
    repo_path: &Path,
    url: &str,
    deadline: Duration,
) -> Result<SyncOutcome, SyncError> {
    let started = Instant::now();
    let result = match Repository::open(repo_path) {
        Ok(repo) => fast_forward(&repo, started + deadline),
        Err(_) if !repo_path.exists() => clone_mirror(repo_path, url, started + deadline),
        Err(err) => Err(err.into()),
    };
    match result {
        // The progress callback aborts with a generic git error once the
        // deadline passes; report that case as a timeout, not a git fault.
        Err(SyncError::Git(err)) if started.elapsed() >= deadline => {
            warn!(error = %err, "git transfer aborted at deadline");
            Err(SyncError::Timeout(deadline))
        }
        other => other,
    }
}

fn clone_mirror(repo_path: &Path, url: &str, deadline: Instant) -> Result<SyncOutcome, SyncError> {
    if let Some(parent) = repo_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let cloned = RepoBuilder::new()
        .fetch_options(fetch_options(deadline))
        .clone(url, repo_path);
    match cloned {
        Ok(repo) => {
            repo.head()?;
            info!(url, path = %repo_path.display(), "cloned upstream repository");
            Ok(SyncOutcome::Cloned)
        }
        Err(err) => {
            // Leave no partial checkout behind; the next cycle retries the
            // clone from an absent mirror.
            if repo_path.exists() {
                let _ = std::fs::remove_dir_all(repo_path);
            }
            Err(err.into())
        }
    }
}

/// Fetch from origin and fast-forward the checked-out branch. Mirrors the
/// only history shape the upstream data repository produces; anything that
/// is not a fast-forward means the mirror needs manual attention.
fn fast_forward(repo: &Repository, deadline: Instant) -> Result<SyncOutcome, SyncError> {
    let mut remote = repo.find_remote("origin")?;
    remote.fetch(&[] as &[&str], Some(&mut fetch_options(deadline)), None)?;

    let fetch_head = repo.find_reference("FETCH_HEAD")?;
    let fetched = repo.reference_to_annotated_commit(&fetch_head)?;
    let (analysis, _preference) = repo.merge_analysis(&[&fetched])?;

    if analysis.is_up_to_date() {
        return Ok(SyncOutcome::NoUpdate);
    }
    if !analysis.is_fast_forward() {
        return Err(git2::Error::from_str("upstream history is not a fast-forward").into());
    }

    let head = repo.head()?;
    let branch_ref = head
        .name()
        .ok_or_else(|| git2::Error::from_str("HEAD is not a named branch"))?
        .to_owned();
    let mut reference = repo.find_reference(&branch_ref)?;
    reference.set_target(fetched.id(), "fast-forward")?;
    repo.set_head(&branch_ref)?;
    // Forced checkout so a dirtied mirror never wedges future pulls.
    repo.checkout_head(Some(CheckoutBuilder::default().force()))?;
    Ok(SyncOutcome::Updated)
}

fn fetch_options(deadline: Instant) -> FetchOptions<'static> {
    let mut callbacks = RemoteCallbacks::new();
    callbacks.transfer_progress(move |_progress| Instant::now() < deadline);
    let mut options = FetchOptions::new();
    options.remote_callbacks(callbacks);
    options
}
