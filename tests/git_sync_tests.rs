use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use git2::{IndexAddOption, Repository, Signature};

use epidaily::git::{sync_repo, SyncError, SyncOutcome};

const DEADLINE: Duration = Duration::from_secs(30);

fn unique_temp_dir(name: &str) -> PathBuf {
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock should be after unix epoch")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("epidaily-{name}-{stamp}"));
    fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

fn commit_all(repo: &Repository, message: &str) {
    let mut index = repo.index().expect("repo should have an index");
    index
        .add_all(["*"].iter(), IndexAddOption::DEFAULT, None)
        .expect("files should stage");
    index.write().expect("index should write");
    let tree_id = index.write_tree().expect("tree should write");
    let tree = repo.find_tree(tree_id).expect("tree should resolve");
    let signature =
        Signature::now("epidaily-test", "test@example.com").expect("signature should build");
    let parent = repo.head().ok().and_then(|head| head.peel_to_commit().ok());
    let parents: Vec<_> = parent.iter().collect();
    repo.commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)
        .expect("commit should succeed");
}

fn init_upstream(dir: &Path) -> Repository {
    let repo = Repository::init(dir).expect("upstream repo should init");
    fs::write(dir.join("01-22-2020.csv"), "Country/Region,Confirmed\nJapan,2\n")
        .expect("fixture should be written");
    commit_all(&repo, "first daily report");
    repo
}

#[tokio::test]
async fn clone_then_no_update_then_fast_forward() {
    let root = unique_temp_dir("git-sync");
    let upstream_dir = root.join("upstream");
    fs::create_dir_all(&upstream_dir).expect("upstream dir should be creatable");
    let upstream = init_upstream(&upstream_dir);
    let url = upstream_dir.to_str().expect("path should be utf-8").to_owned();
    let mirror = root.join("mirror");

    let outcome = sync_repo(&mirror, &url, DEADLINE)
        .await
        .expect("clone should succeed");
    assert_eq!(outcome, SyncOutcome::Cloned);
    assert!(mirror.join("01-22-2020.csv").exists());

    let outcome = sync_repo(&mirror, &url, DEADLINE)
        .await
        .expect("pull should succeed");
    assert_eq!(outcome, SyncOutcome::NoUpdate);

    fs::write(
        upstream_dir.join("01-23-2020.csv"),
        "Country/Region,Confirmed\nJapan,2\nThailand,4\n",
    )
    .expect("fixture should be written");
    commit_all(&upstream, "second daily report");

    let outcome = sync_repo(&mirror, &url, DEADLINE)
        .await
        .expect("pull should succeed");
    assert_eq!(outcome, SyncOutcome::Updated);
    assert!(mirror.join("01-23-2020.csv").exists());

    let _ = fs::remove_dir_all(root);
}

#[tokio::test]
async fn zero_deadline_surfaces_a_timeout() {
    let root = unique_temp_dir("git-timeout");
    let upstream_dir = root.join("upstream");
    fs::create_dir_all(&upstream_dir).expect("upstream dir should be creatable");
    init_upstream(&upstream_dir);
    let url = upstream_dir.to_str().expect("path should be utf-8").to_owned();
    let mirror = root.join("mirror");

    let err = sync_repo(&mirror, &url, Duration::ZERO)
        .await
        .expect_err("zero deadline cannot be met");
    assert!(matches!(err, SyncError::Timeout(_)));

    let _ = fs::remove_dir_all(root);
}

#[tokio::test]
async fn failed_clone_leaves_no_partial_mirror() {
    let root = unique_temp_dir("git-badclone");
    let mirror = root.join("mirror");

    let result = sync_repo(&mirror, root.join("does-not-exist").to_str().unwrap(), DEADLINE).await;
    assert!(result.is_err());
    // The next cycle must start from an absent mirror, not a half-clone.
    assert!(!mirror.exists());

    let _ = fs::remove_dir_all(root);
}

#[tokio::test]
async fn existing_non_repo_directory_is_an_error() {
    let root = unique_temp_dir("git-notrepo");
    let mirror = root.join("mirror");
    fs::create_dir_all(&mirror).expect("dir should be creatable");
    fs::write(mirror.join("stray.txt"), "not a repo").expect("fixture should be written");

    let result = sync_repo(&mirror, "file:///dev/null", DEADLINE).await;
    assert!(result.is_err());
    // Pre-existing non-repository content is never deleted.
    assert!(mirror.join("stray.txt").exists());

    let _ = fs::remove_dir_all(root);
}
