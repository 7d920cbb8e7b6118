use crate::git::commit::{self, CommitResult};
use crate::{log_debug, log_error, log_warn};
use anyhow::{Context as AnyhowContext, Result, anyhow};
use git2::{ErrorCode, Repository};
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// A local Git working tree.
#[derive(Debug)]
pub struct GitRepo {
    repo_path: PathBuf,
}

impl GitRepo {
    /// Creates a new `GitRepo` for the repository containing `path`.
    pub fn new(path: &Path) -> Result<Self> {
        let repo = Repository::discover(path)
            .with_context(|| format!("Not in a Git repository: {}", path.display()))?;
        let repo_path = repo
            .workdir()
            .context("Repository has no working directory")?
            .to_path_buf();
        Ok(Self { repo_path })
    }

    /// Creates a `GitRepo` for the current directory.
    pub fn discover() -> Result<Self> {
        Self::new(&env::current_dir()?)
    }

    /// Open the repository at the stored path
    pub fn open_repo(&self) -> Result<Repository, git2::Error> {
        Repository::open(&self.repo_path)
    }

    /// Returns the working tree root
    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    /// Get the root directory of the current git repository
    pub fn repo_root() -> Result<PathBuf> {
        Ok(Self::discover()?.repo_path)
    }

    /// Retrieves the current branch name.
    ///
    /// On a fresh repository without commits this is the branch HEAD will
    /// create; a detached HEAD yields `None`.
    pub fn get_current_branch(&self) -> Result<Option<String>> {
        let repo = self.open_repo()?;
        let branch = match repo.head() {
            Ok(head) if head.is_branch() => head.shorthand().map(str::to_string),
            Ok(_) => None,
            Err(e) if e.code() == ErrorCode::UnbornBranch => repo
                .find_reference("HEAD")?
                .symbolic_target()
                .map(|target| target.trim_start_matches("refs/heads/").to_string()),
            Err(e) => return Err(e.into()),
        };
        log_debug!("Current branch: {:?}", branch);
        Ok(branch)
    }

    /// Executes a Git hook with `args`. A missing hook succeeds.
    pub fn execute_hook(&self, hook_name: &str, args: &[&str]) -> Result<()> {
        let repo = self.open_repo()?;
        let hook_path = repo.path().join("hooks").join(hook_name);

        if !hook_path.exists() {
            log_debug!("Hook '{}' not found at {:?}", hook_name, hook_path);
            return Ok(());
        }

        log_debug!("Executing hook: {}", hook_name);
        let repo_workdir = repo
            .workdir()
            .context("Repository has no working directory")?;

        let mut command = Command::new(&hook_path);
        command
            .args(args)
            .current_dir(repo_workdir)
            .env("GIT_DIR", repo.path())
            .env("GIT_WORK_TREE", repo_workdir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = command.spawn()?;

        let stdout = child.stdout.take().context("Could not get stdout")?;
        let stderr = child.stderr.take().context("Could not get stderr")?;

        let out = std::thread::spawn(move || {
            io::copy(&mut io::BufReader::new(stdout), &mut io::stdout())
        });
        let err = std::thread::spawn(move || {
            io::copy(&mut io::BufReader::new(stderr), &mut io::stderr())
        });

        let status = child.wait()?;
        let _ = out.join();
        let _ = err.join();

        if !status.success() {
            return Err(anyhow!(
                "Hook '{}' failed with exit code: {:?}",
                hook_name,
                status.code()
            ));
        }

        log_debug!("Hook '{}' executed successfully", hook_name);
        Ok(())
    }

    /// Commit changes to the repository, without hooks
    pub fn commit(&self, message: &str) -> Result<CommitResult> {
        let repo = self.open_repo()?;
        commit::commit(&repo, message)
    }

    /// Commits the way `git commit` would: `pre-commit` and `commit-msg` may
    /// veto the commit (the latter may also rewrite the message) and a failing
    /// `post-commit` is only logged. `verify = false` skips the first two.
    pub fn commit_and_verify(&self, message: &str, verify: bool) -> Result<CommitResult> {
        let repo = self.open_repo()?;

        let message = if verify {
            self.execute_hook("pre-commit", &[])?;

            let message_file = repo.path().join("COMMIT_EDITMSG");
            fs::write(&message_file, message)?;
            let file_arg = message_file.to_string_lossy().into_owned();
            self.execute_hook("commit-msg", &[&file_arg])?;
            fs::read_to_string(&message_file)?
        } else {
            message.to_string()
        };

        match commit::commit(&repo, &message) {
            Ok(result) => {
                if let Err(e) = self.execute_hook("post-commit", &[]) {
                    log_warn!("Post-commit hook failed: {}", e);
                }
                Ok(result)
            }
            Err(e) => {
                log_error!("Commit failed: {}", e);
                Err(e)
            }
        }
    }
}
