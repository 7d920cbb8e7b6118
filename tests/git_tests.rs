use anyhow::Result;
use cz_shortcut::config::Config;
use cz_shortcut::engine::{CommitMode, CommitSink, Engine, GitSink};
use git2::Repository;

use test_utils::{GitTestHelper, Reply, ScriptedPrompter, setup_empty_repo, setup_git_repo, typed};

#[test]
fn test_current_branch() -> Result<()> {
    let (temp_dir, git_repo) = setup_git_repo();
    assert_eq!(git_repo.get_current_branch()?.as_deref(), Some("main"));

    let repo = Repository::open(temp_dir.path())?;
    let head = repo.head()?.peel_to_commit()?;
    repo.branch("feature/sc-77-export", &head, false)?;
    repo.set_head("refs/heads/feature/sc-77-export")?;
    assert_eq!(
        git_repo.get_current_branch()?.as_deref(),
        Some("feature/sc-77-export")
    );
    Ok(())
}

#[test]
fn test_unborn_branch_name_is_reported() -> Result<()> {
    let (temp_dir, git_repo) = setup_empty_repo();
    let repo = Repository::open(temp_dir.path())?;
    repo.set_head("refs/heads/sc-9-first")?;
    assert_eq!(git_repo.get_current_branch()?.as_deref(), Some("sc-9-first"));
    Ok(())
}

#[test]
fn test_detached_head_has_no_branch() -> Result<()> {
    let (temp_dir, git_repo) = setup_git_repo();
    let repo = Repository::open(temp_dir.path())?;
    let head = repo.head()?.peel_to_commit()?.id();
    repo.set_head_detached(head)?;
    assert_eq!(git_repo.get_current_branch()?, None);
    Ok(())
}

#[test]
fn test_commit_staged_changes() -> Result<()> {
    let (temp_dir, git_repo) = setup_git_repo();
    let helper = GitTestHelper::new(&temp_dir)?;
    helper.create_and_stage_file("retry.rs", "fn retry() {}")?;

    let result = git_repo.commit("feat: sc-1 add retry\n\nWith backoff.")?;
    assert_eq!(result.files_changed, 1);
    assert_eq!(result.commit_hash.len(), 7);
    assert_eq!(result.branch, "main");
    assert_eq!(result.summary, "feat: sc-1 add retry");
    assert_eq!(helper.head_message()?, "feat: sc-1 add retry\n\nWith backoff.");
    Ok(())
}

#[test]
fn test_nothing_staged_is_an_error() {
    let (_temp_dir, git_repo) = setup_git_repo();
    let err = git_repo.commit("chore: nothing").expect_err("nothing staged");
    assert!(err.to_string().contains("No changes staged"));
}

#[test]
fn test_first_commit_has_no_parent() -> Result<()> {
    let (temp_dir, git_repo) = setup_empty_repo();
    let helper = GitTestHelper::new(&temp_dir)?;
    helper.create_and_stage_file("README.md", "# demo")?;

    git_repo.commit("docs: start readme")?;
    let head = helper.repo.head()?.peel_to_commit()?;
    assert_eq!(head.parent_count(), 0);
    Ok(())
}

#[test]
fn test_session_commits_through_git() -> Result<()> {
    let (temp_dir, git_repo) = setup_git_repo();
    let helper = GitTestHelper::new(&temp_dir)?;
    helper.create_and_stage_file("parser.rs", "// parser")?;

    let branch = git_repo.get_current_branch()?;
    let engine = Engine::new(Config::default(), branch.as_deref())?;
    let mut prompter = ScriptedPrompter::new([
        typed("fix"),
        typed("sc-5"),
        typed("handle null input"),
        Reply::Enter,
        Reply::No,
        Reply::Yes,
    ]);
    let mut sink = GitSink::new(git_repo, false);

    cz_shortcut::ui::set_quiet_mode(true);
    engine.run(&mut prompter, &mut sink, CommitMode::Test)?;

    assert_eq!(
        helper.head_message()?,
        "fix: sc-5 handle null input\n\n[no ci]"
    );
    assert_eq!(sink.last_commit().map(|c| c.files_changed), Some(1));
    Ok(())
}

#[test]
fn test_sink_reports_commit_failures() {
    let (_temp_dir, git_repo) = setup_git_repo();
    let mut sink = GitSink::new(git_repo, false);
    let err = sink.commit("chore: nothing").expect_err("nothing staged");
    assert!(format!("{err:#}").contains("No changes staged"));
    assert!(sink.last_commit().is_none());
}
