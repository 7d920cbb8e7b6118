// Git module: branch lookup and committing

mod commit;
mod repository;

pub use commit::{CommitResult, head_commit};
pub use repository::GitRepo;
