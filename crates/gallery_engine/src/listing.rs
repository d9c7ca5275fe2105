use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use gallery_logging::{gallery_debug, gallery_info};
use reqwest::header::LINK;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ListingError {
    #[error("invalid url {0}")]
    InvalidUrl(String),
    #[error("http status {status} from {url}")]
    HttpStatus { status: u16, url: String },
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("could not decode response: {0}")]
    Decode(String),
    #[error("submission {0} has no usable url")]
    MissingUrl(u64),
}

/// One submission record as returned by the listing endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Submission {
    pub id: u64,
    pub user_id: u64,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub workflow_state: String,
    #[serde(default)]
    pub submission_comments: Vec<SubmissionComment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SubmissionComment {
    #[serde(default)]
    pub comment: String,
}

impl Submission {
    pub fn direct_url(&self) -> Option<&str> {
        self.url.as_deref().map(str::trim).filter(|url| !url.is_empty())
    }

    /// First comment, when it is nothing but an http(s) URL.
    pub fn comment_url(&self) -> Option<&str> {
        self.submission_comments
            .first()
            .map(|c| c.comment.trim())
            .filter(|c| {
                (c.starts_with("https://") || c.starts_with("http://"))
                    && !c.contains(char::is_whitespace)
            })
    }

    pub fn submitted_url(&self, allow_comment_urls: bool) -> Option<&str> {
        self.direct_url().or_else(|| {
            if allow_comment_urls {
                self.comment_url()
            } else {
                None
            }
        })
    }

    pub fn is_turned_in(&self) -> bool {
        matches!(self.workflow_state.as_str(), "submitted" | "graded")
    }
}

/// Keeps turned-in submissions that carry a URL.
pub fn eligible_submissions(
    submissions: Vec<Submission>,
    allow_comment_urls: bool,
) -> Vec<Submission> {
    submissions
        .into_iter()
        .filter(|s| s.is_turned_in() && s.submitted_url(allow_comment_urls).is_some())
        .collect()
}

/// Confirmation that a submission's owner still resolves. Only the id is kept.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SubmissionDetail {
    #[serde(rename = "id")]
    pub user_id: u64,
}

#[async_trait::async_trait]
pub trait SubmissionSource: Send + Sync {
    async fn list_submissions(&self) -> Result<Vec<Submission>, ListingError>;
}

#[async_trait::async_trait]
pub trait DetailSource: Send + Sync {
    async fn fetch_detail(&self, submission: &Submission) -> Result<SubmissionDetail, ListingError>;
}

#[derive(Clone)]
pub struct ListingSettings {
    pub base_url: String,
    pub course_id: String,
    pub assignment_id: String,
    pub token: String,
    pub per_page: u32,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl ListingSettings {
    pub fn new(
        base_url: impl Into<String>,
        course_id: impl Into<String>,
        assignment_id: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            course_id: course_id.into(),
            assignment_id: assignment_id.into(),
            token: token.into(),
            per_page: 100,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl fmt::Debug for ListingSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListingSettings")
            .field("base_url", &self.base_url)
            .field("course_id", &self.course_id)
            .field("assignment_id", &self.assignment_id)
            .field("token", &"<redacted>")
            .field("per_page", &self.per_page)
            .field("connect_timeout", &self.connect_timeout)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

/// HTTP client for the course platform's REST API.
#[derive(Debug, Clone)]
pub struct CanvasClient {
    settings: ListingSettings,
    client: reqwest::Client,
}

impl CanvasClient {
    pub fn new(settings: ListingSettings) -> Result<Self, ListingError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| ListingError::Network(err.to_string()))?;
        Ok(Self { settings, client })
    }

    fn api_base(&self) -> String {
        format!(
            "{}/api/v1/courses/{}",
            self.settings.base_url.trim_end_matches('/'),
            self.settings.course_id
        )
    }

    fn submissions_url(&self) -> String {
        format!(
            "{}/assignments/{}/submissions?per_page={}",
            self.api_base(),
            self.settings.assignment_id,
            self.settings.per_page
        )
    }

    /// GETs `url` and decodes the JSON body. Also returns the `rel="next"`
    /// link, if the response carries one.
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
    ) -> Result<(T, Option<String>), ListingError> {
        let parsed =
            reqwest::Url::parse(url).map_err(|_| ListingError::InvalidUrl(url.to_string()))?;
        let response = self
            .client
            .get(parsed)
            .bearer_auth(&self.settings.token)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ListingError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let next = response
            .headers()
            .get(LINK)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| parse_link_header(value).remove("next"));
        let body = response.json::<T>().await.map_err(map_reqwest_error)?;
        Ok((body, next))
    }
}

#[async_trait::async_trait]
impl SubmissionSource for CanvasClient {
    async fn list_submissions(&self) -> Result<Vec<Submission>, ListingError> {
        let mut all = Vec::new();
        let mut next = Some(self.submissions_url());
        let mut page = 0;
        while let Some(url) = next {
            page += 1;
            gallery_info!("Fetching submissions page {}", page);
            let (batch, following): (Vec<Submission>, _) = self.get_json(&url).await?;
            all.extend(batch);
            next = following;
        }
        gallery_info!(
            "Retrieved {} submissions from {} pages",
            all.len(),
            page
        );
        Ok(all)
    }
}

#[async_trait::async_trait]
impl DetailSource for CanvasClient {
    async fn fetch_detail(&self, submission: &Submission) -> Result<SubmissionDetail, ListingError> {
        let url = format!("{}/users/{}", self.api_base(), submission.user_id);
        let (detail, _) = self.get_json::<SubmissionDetail>(&url).await?;
        gallery_debug!("Resolved owner of submission {}", submission.id);
        Ok(detail)
    }
}

/// Parses an RFC 8288 `Link` header into a `rel -> url` map.
pub fn parse_link_header(header: &str) -> HashMap<String, String> {
    let mut links = HashMap::new();
    for part in header.split(',') {
        let part = part.trim();
        let Some(rest) = part.strip_prefix('<') else {
            continue;
        };
        let Some((url, params)) = rest.split_once('>') else {
            continue;
        };
        for param in params.split(';') {
            let Some((key, value)) = param.trim().split_once('=') else {
                continue;
            };
            if key.trim().eq_ignore_ascii_case("rel") {
                let value = value.trim().trim_matches('"');
                for rel in value.split_whitespace() {
                    links.insert(rel.to_string(), url.to_string());
                }
            }
        }
    }
    links
}

fn map_reqwest_error(err: reqwest::Error) -> ListingError {
    if err.is_timeout() {
        return ListingError::Timeout(err.to_string());
    }
    if err.is_decode() {
        return ListingError::Decode(err.to_string());
    }
    ListingError::Network(err.to_string())
}
