use crate::gitops::{GitOpsError, RepoWriter};
use base64::Engine as _;
use serde::Deserialize;
use serde_json::json;

// Writes files through the GitHub contents API. Updates need the existing
// blob sha; a 404 on the pre-read means create.
#[derive(Debug, Clone)]
pub struct GithubRepoWriter {
    owner: String,
    repo: String,
    branch: String,
    token: String,
    api_base: String,
}

#[derive(Debug, Deserialize)]
struct ContentsEnvelope {
    sha: String,
}

impl GithubRepoWriter {
    pub fn new(
        owner: impl Into<String>,
        repo: impl Into<String>,
        branch: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        GithubRepoWriter {
            owner: owner.into(),
            repo: repo.into(),
            branch: branch.into(),
            token: token.into(),
            api_base: "https://api.github.com".to_string(),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn contents_url(&self, path: &str) -> String {
        let encoded = path
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        format!(
            "{}/repos/{}/{}/contents/{encoded}",
            self.api_base, self.owner, self.repo
        )
    }

    fn existing_sha(&self, path: &str) -> Result<Option<String>, GitOpsError> {
        let url = format!("{}?ref={}", self.contents_url(path), self.branch);
        match ureq::get(&url)
            .set("Authorization", &format!("Bearer {}", self.token))
            .set("User-Agent", "maestro-engine")
            .call()
        {
            Ok(response) => {
                let envelope: ContentsEnvelope =
                    response.into_json().map_err(|e| GitOpsError::Api {
                        path: path.to_string(),
                        reason: e.to_string(),
                    })?;
                Ok(Some(envelope.sha))
            }
            Err(ureq::Error::Status(404, _)) => Ok(None),
            Err(err) => Err(GitOpsError::Http(err.to_string())),
        }
    }
}

impl RepoWriter for GithubRepoWriter {
    fn write_file(
        &self,
        path: &str,
        content: &str,
        commit_message: &str,
    ) -> Result<(), GitOpsError> {
        let mut body = json!({
            "message": commit_message,
            "content": base64::engine::general_purpose::STANDARD.encode(content),
            "branch": self.branch,
        });
        if let Some(sha) = self.existing_sha(path)? {
            body["sha"] = json!(sha);
        }

        let response = ureq::put(&self.contents_url(path))
            .set("Authorization", &format!("Bearer {}", self.token))
            .set("User-Agent", "maestro-engine")
            .send_json(body)
            .map_err(|e| GitOpsError::Http(e.to_string()))?;

        if response.status() >= 300 {
            return Err(GitOpsError::Api {
                path: path.to_string(),
                reason: format!("unexpected status {}", response.status()),
            });
        }
        Ok(())
    }
}
