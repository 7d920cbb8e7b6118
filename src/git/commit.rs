use crate::log_debug;
use anyhow::{Result, anyhow};
use git2::{Commit, ErrorCode, Repository};

/// Results from a commit operation
#[derive(Debug)]
pub struct CommitResult {
    pub branch: String,
    pub commit_hash: String,
    pub files_changed: usize,
    /// First line of the message
    pub summary: String,
}

/// The commit HEAD points at, or `None` on an unborn branch.
pub fn head_commit(repo: &Repository) -> Result<Option<Commit<'_>>> {
    match repo.head() {
        Ok(head) => Ok(Some(head.peel_to_commit()?)),
        Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Commits the staged changes with `message`.
///
/// The signature comes from the git configuration. On an unborn branch the
/// commit has no parent. Fails when nothing is staged.
pub fn commit(repo: &Repository, message: &str) -> Result<CommitResult> {
    let signature = repo.signature()?;
    let mut index = repo.index()?;
    let tree_id = index.write_tree()?;
    let tree = repo.find_tree(tree_id)?;
    let parent = head_commit(repo)?;

    let parent_tree = parent.as_ref().map(Commit::tree).transpose()?;
    let unchanged = match &parent_tree {
        Some(parent_tree) => parent_tree.id() == tree_id,
        None => tree.is_empty(),
    };
    if unchanged {
        return Err(anyhow!("No changes staged for commit"));
    }

    let parents: Vec<&Commit> = parent.iter().collect();
    let commit_oid = repo.commit(
        Some("HEAD"),
        &signature,
        &signature,
        message,
        &tree,
        &parents,
    )?;
    log_debug!("Created commit {}", commit_oid);

    let diff = repo.diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), None)?;
    let files_changed = diff.stats()?.files_changed();

    let branch = repo.head()?.shorthand().unwrap_or("HEAD").to_string();
    let commit_hash = commit_oid.to_string().chars().take(7).collect();

    Ok(CommitResult {
        branch,
        commit_hash,
        files_changed,
        summary: message.lines().next().unwrap_or_default().to_string(),
    })
}
