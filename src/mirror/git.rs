use std::path::{Path, PathBuf};

use async_trait::async_trait;
use git2::{
    build::RepoBuilder, Cred, CredentialType, ErrorCode, FetchOptions, PushOptions,
    RemoteCallbacks, Repository,
};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use crate::error::{Error, Result};
use crate::mirror::TagMirror;

pub const SOURCE_REMOTE: &str = "origin";
pub const DESTINATION_REMOTE: &str = "github";

const TAG_REFSPEC: &str = "+refs/tags/*:refs/tags/*";

#[derive(Debug, Clone)]
pub struct MirrorCredentials {
    pub source_username: String,
    pub source_token: String,
    pub destination_token: String,
}

/// Bare mirror of the source repository on local disk.
pub struct GitMirror {
    dir: PathBuf,
    credentials: MirrorCredentials,
    depth: Option<i32>,
    progress: MultiProgress,
}

/// Reject names that git could read as an option.
fn validate_tag_name(name: &str) -> Result<()> {
    if name.is_empty() || name.starts_with('-') {
        return Err(Error::Git(format!("Invalid tag name: {:?}", name)));
    }
    Ok(())
}

/// libgit2 keeps asking for credentials after a rejection, so only the first
/// request is answered.
fn credentials_callback<'a>(
    username: &'a str,
    token: &'a str,
) -> impl FnMut(&str, Option<&str>, CredentialType) -> std::result::Result<Cred, git2::Error> + 'a
{
    let mut attempts = 0;
    move |_url, _username_from_url, _allowed_types| {
        attempts += 1;
        if attempts > 1 {
            return Err(git2::Error::from_str("credentials were rejected"));
        }
        Cred::userpass_plaintext(username, token)
    }
}

fn transfer_progress_bar(progress: &MultiProgress, message: String) -> ProgressBar {
    let pb = progress.add(ProgressBar::new(0));
    let style = ProgressStyle::with_template(
        "{spinner:.green} {msg} [{bar:40.cyan/blue}] {pos}/{len} objects",
    )
    .map(|style| style.progress_chars("#>-"))
    .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb.set_message(message);
    pb
}

fn fetch_options<'a>(
    credentials: &'a MirrorCredentials,
    depth: Option<i32>,
    pb: &'a ProgressBar,
) -> FetchOptions<'a> {
    let mut callbacks = RemoteCallbacks::new();
    callbacks.credentials(credentials_callback(
        &credentials.source_username,
        &credentials.source_token,
    ));
    callbacks.transfer_progress(move |stats| {
        pb.set_length(stats.total_objects() as u64);
        pb.set_position(stats.received_objects() as u64);
        true
    });

    let mut opts = FetchOptions::new();
    opts.remote_callbacks(callbacks);
    if let Some(depth) = depth {
        opts.depth(depth);
    }
    opts
}

fn clone_blocking(
    url: &str,
    dir: &Path,
    credentials: &MirrorCredentials,
    depth: Option<i32>,
    progress: &MultiProgress,
) -> Result<()> {
    let pb = transfer_progress_bar(progress, format!("Cloning {}", url));
    let result = RepoBuilder::new()
        .bare(true)
        .fetch_options(fetch_options(credentials, depth, &pb))
        .clone(url, dir);
    pb.finish_and_clear();
    result?;
    Ok(())
}

fn fetch_tags_blocking(
    dir: &Path,
    credentials: &MirrorCredentials,
    depth: Option<i32>,
    progress: &MultiProgress,
) -> Result<()> {
    let repo = Repository::open(dir)?;
    let mut remote = repo.find_remote(SOURCE_REMOTE)?;
    let pb = transfer_progress_bar(progress, format!(
        "Fetching tags from {}",
        remote.url().unwrap_or(SOURCE_REMOTE)
    ));
    let mut opts = fetch_options(credentials, depth, &pb);
    let result = remote.fetch(&[TAG_REFSPEC], Some(&mut opts), None);
    pb.finish_and_clear();
    result?;
    Ok(())
}

fn ensure_remote_blocking(dir: &Path, name: &str, url: &str) -> Result<()> {
    let repo = Repository::open(dir)?;
    let remote = match repo.find_remote(name) {
        Ok(remote) => remote,
        Err(e) if e.code() == ErrorCode::NotFound => {
            tracing::info!("Adding {} as remote {}", url, name);
            repo.remote(name, url)?
        }
        Err(e) => return Err(e.into()),
    };

    match remote.url() {
        Some(existing) if existing == url => Ok(()),
        existing => Err(Error::Config(format!(
            "{} remote URL mismatch: {} != {}",
            name,
            existing.unwrap_or("<not utf-8>"),
            url
        ))),
    }
}

fn push_tag_blocking(dir: &Path, tag_name: &str, token: &str) -> Result<()> {
    let repo = Repository::open(dir)?;
    let tag_ref = format!("refs/tags/{}", tag_name);
    if let Err(e) = repo.find_reference(&tag_ref) {
        return Err(Error::Git(format!(
            "Tag {} is not present in the mirror: {}",
            tag_name,
            e.message()
        )));
    }

    let mut remote = repo.find_remote(DESTINATION_REMOTE)?;
    let refspec = format!("{0}:{0}", tag_ref);
    let mut rejection: Option<String> = None;
    {
        let mut callbacks = RemoteCallbacks::new();
        callbacks.credentials(credentials_callback("x-access-token", token));
        callbacks.push_update_reference(|refname, status| {
            if let Some(message) = status {
                rejection = Some(format!("{}: {}", refname, message));
            }
            Ok(())
        });
        let mut opts = PushOptions::new();
        opts.remote_callbacks(callbacks);
        remote.push(&[refspec.as_str()], Some(&mut opts))?;
    }

    match rejection {
        Some(reason) => Err(Error::Git(format!("Push rejected for {}", reason))),
        None => Ok(()),
    }
}

impl GitMirror {
    /// Clones `source_url` as a bare repository when `dir` does not exist,
    /// otherwise opens it and refreshes its tags. `depth` makes the clone
    /// and tag fetches shallow. Transfer bars are drawn inside `progress`.
    pub async fn open_or_clone(
        source_url: &str,
        dir: &Path,
        credentials: MirrorCredentials,
        depth: Option<i32>,
        progress: MultiProgress,
    ) -> Result<Self> {
        let mirror = Self {
            dir: dir.to_path_buf(),
            credentials,
            depth,
            progress,
        };

        if dir.exists() {
            tracing::info!("Fetching tags for {}", source_url);
            mirror.fetch_tags().await?;
        } else {
            tracing::info!("Cloning {} to {} (depth {:?})", source_url, dir.display(), depth);
            let url = source_url.to_string();
            let target = mirror.dir.clone();
            let credentials = mirror.credentials.clone();
            let progress = mirror.progress.clone();
            tokio::task::spawn_blocking(move || {
                clone_blocking(&url, &target, &credentials, depth, &progress)
            })
                .await
                .map_err(|e| Error::Git(format!("Clone task panicked: {}", e)))??;
        }

        Ok(mirror)
    }

    /// Adds the destination remote if missing. An existing remote with a
    /// different URL is a configuration error.
    pub async fn ensure_destination(&self, url: &str) -> Result<()> {
        let dir = self.dir.clone();
        let url = url.to_string();

        tokio::task::spawn_blocking(move || ensure_remote_blocking(&dir, DESTINATION_REMOTE, &url))
            .await
            .map_err(|e| Error::Git(format!("Remote check task panicked: {}", e)))?
    }
}

#[async_trait]
impl TagMirror for GitMirror {
    async fn fetch_tags(&self) -> Result<()> {
        let dir = self.dir.clone();
        let credentials = self.credentials.clone();
        let depth = self.depth;
        let progress = self.progress.clone();

        tokio::task::spawn_blocking(move || fetch_tags_blocking(&dir, &credentials, depth, &progress))
            .await
            .map_err(|e| Error::Git(format!("Fetch task panicked: {}", e)))?
    }

    async fn push_tag(&self, tag_name: &str) -> Result<()> {
        validate_tag_name(tag_name)?;

        let dir = self.dir.clone();
        let tag_name = tag_name.to_string();
        let token = self.credentials.destination_token.clone();

        tokio::task::spawn_blocking(move || push_tag_blocking(&dir, &tag_name, &token))
            .await
            .map_err(|e| Error::Git(format!("Push task panicked: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use git2::{Oid, Signature};

    fn credentials() -> MirrorCredentials {
        MirrorCredentials {
            source_username: "bot".to_string(),
            source_token: "bb-token".to_string(),
            destination_token: "gh-token".to_string(),
        }
    }

    fn init_source(dir: &Path) -> (Repository, Oid) {
        let repo = Repository::init(dir).unwrap();
        let sig = Signature::now("Test", "test@example.com").unwrap();
        let oid = {
            let tree_id = repo.index().unwrap().write_tree().unwrap();
            let tree = repo.find_tree(tree_id).unwrap();
            repo.commit(Some("HEAD"), &sig, &sig, "initial", &tree, &[])
                .unwrap()
        };
        (repo, oid)
    }

    fn path_str(path: &Path) -> String {
        path.to_str().unwrap().to_string()
    }

    async fn open_mirror(source_dir: &Path, mirror_dir: &Path) -> GitMirror {
        GitMirror::open_or_clone(
            &path_str(source_dir),
            mirror_dir,
            credentials(),
            None,
            MultiProgress::new(),
        )
        .await
        .unwrap()
    }

    #[test]
    fn test_validate_tag_name() {
        assert!(validate_tag_name("dig-pr_42").is_ok());
        assert!(validate_tag_name("--upload-pack").is_err());
        assert!(validate_tag_name("").is_err());
    }

    #[tokio::test]
    async fn test_clone_fetch_and_push_tag() {
        let tmp = tempfile::tempdir().unwrap();
        let source_dir = tmp.path().join("source");
        let mirror_dir = tmp.path().join("mirror");
        let dest_dir = tmp.path().join("dest.git");

        let (source, oid) = init_source(&source_dir);
        let destination = Repository::init_bare(&dest_dir).unwrap();

        let mirror = open_mirror(&source_dir, &mirror_dir).await;
        assert!(Repository::open(&mirror_dir).unwrap().is_bare());

        // the tag appears on the source after the mirror was cloned
        source
            .reference("refs/tags/dig-pr_42", oid, false, "tag pr 42")
            .unwrap();
        mirror.fetch_tags().await.unwrap();
        let mirrored = Repository::open(&mirror_dir).unwrap();
        assert_eq!(
            mirrored.refname_to_id("refs/tags/dig-pr_42").unwrap(),
            oid
        );

        mirror.ensure_destination(&path_str(&dest_dir)).await.unwrap();
        mirror.push_tag("dig-pr_42").await.unwrap();
        assert_eq!(
            destination.refname_to_id("refs/tags/dig-pr_42").unwrap(),
            oid
        );

        let err = mirror.push_tag("dig-pr_43").await.unwrap_err();
        assert!(err.to_string().contains("dig-pr_43"));
    }

    #[tokio::test]
    async fn test_existing_mirror_is_reopened() {
        let tmp = tempfile::tempdir().unwrap();
        let source_dir = tmp.path().join("source");
        let mirror_dir = tmp.path().join("mirror");

        let (source, oid) = init_source(&source_dir);
        open_mirror(&source_dir, &mirror_dir).await;

        source
            .reference("refs/tags/dig-pr_7", oid, false, "tag pr 7")
            .unwrap();
        open_mirror(&source_dir, &mirror_dir).await;

        let mirrored = Repository::open(&mirror_dir).unwrap();
        assert_eq!(mirrored.refname_to_id("refs/tags/dig-pr_7").unwrap(), oid);
    }

    #[tokio::test]
    async fn test_destination_url_mismatch_is_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let source_dir = tmp.path().join("source");
        let mirror_dir = tmp.path().join("mirror");
        init_source(&source_dir);

        let mirror = open_mirror(&source_dir, &mirror_dir).await;

        mirror
            .ensure_destination("https://github.com/acme/server")
            .await
            .unwrap();
        // same URL again is fine
        mirror
            .ensure_destination("https://github.com/acme/server")
            .await
            .unwrap();

        let err = mirror
            .ensure_destination("https://github.com/acme/other")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("mismatch"));
    }
}
