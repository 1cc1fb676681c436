pub mod github;

pub use github::GithubRepoWriter;

#[derive(Debug, thiserror::Error)]
pub enum GitOpsError {
    #[error("repository request failed: {0}")]
    Http(String),
    #[error("repository api error for `{path}`: {reason}")]
    Api { path: String, reason: String },
}

pub trait RepoWriter {
    fn write_file(
        &self,
        path: &str,
        content: &str,
        commit_message: &str,
    ) -> Result<(), GitOpsError>;
}
