use super::{Item, Kind, ShredError};
use crate::Credentials;
use chrono::{DateTime, Utc};
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Deserialize};
use tracing::debug;

/// Reddit serves at most this many entries per listing request.
pub const PAGE_SIZE: u32 = 100;

pub const AUTH_URL: &str = "https://www.reddit.com";
pub const API_URL: &str = "https://oauth.reddit.com";

/// One page of a user's history.
#[derive(Clone, Debug, Default)]
pub struct Page {
    pub items: Vec<Item>,
    /// Fullname to continue from, if there is more history.
    pub after: Option<String>,
}

/// The calls the shredder makes against Reddit.
pub trait RedditClient {
    fn history(&self, kind: Kind, after: Option<&str>) -> Result<Page, ShredError>;
    fn edit(&self, item: &Item, text: &str) -> Result<(), ShredError>;
    fn delete(&self, item: &Item) -> Result<(), ShredError>;
}

#[derive(Deserialize)]
struct Token {
    access_token: Option<String>,
    error: Option<String>,
}

#[derive(Deserialize)]
struct Thing<T> {
    data: T,
}

#[derive(Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct Listing<T> {
    after: Option<String>,
    #[serde(default)]
    children: Vec<Thing<T>>,
}

#[derive(Deserialize)]
struct CommentData {
    id: String,
    name: Option<String>,
    #[serde(default)]
    subreddit: String,
    #[serde(default)]
    body: String,
    #[serde(default)]
    score: i64,
    created_utc: f64,
    #[serde(default)]
    gilded: u64,
    distinguished: Option<String>,
    #[serde(default)]
    permalink: String,
}

#[derive(Deserialize)]
struct SubmissionData {
    id: String,
    name: Option<String>,
    #[serde(default)]
    subreddit: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    selftext: String,
    #[serde(default)]
    score: i64,
    created_utc: f64,
    #[serde(default)]
    gilded: u64,
    distinguished: Option<String>,
    #[serde(default)]
    is_self: bool,
    #[serde(default)]
    permalink: String,
}

fn timestamp(seconds: f64) -> DateTime<Utc> {
    DateTime::from_timestamp(seconds as i64, 0).unwrap_or_default()
}

fn fullname(kind: Kind, id: &str, name: Option<String>) -> String {
    name.unwrap_or_else(|| format!("{}_{id}", kind.prefix()))
}

impl From<CommentData> for Item {
    fn from(comment: CommentData) -> Self {
        Item {
            name: fullname(Kind::Comment, &comment.id, comment.name),
            id: comment.id,
            kind: Kind::Comment,
            subreddit: comment.subreddit,
            title: None,
            body: comment.body,
            score: comment.score,
            created: timestamp(comment.created_utc),
            gilded: comment.gilded > 0,
            distinguished: comment.distinguished.is_some(),
            is_self: false,
            permalink: comment.permalink,
        }
    }
}

impl From<SubmissionData> for Item {
    fn from(post: SubmissionData) -> Self {
        Item {
            name: fullname(Kind::Submission, &post.id, post.name),
            id: post.id,
            kind: Kind::Submission,
            subreddit: post.subreddit,
            title: Some(post.title),
            body: post.selftext,
            score: post.score,
            created: timestamp(post.created_utc),
            gilded: post.gilded > 0,
            distinguished: post.distinguished.is_some(),
            is_self: post.is_self,
            permalink: post.permalink,
        }
    }
}

/// An OAuth session for a script app, logged in with the password grant.
pub struct RedditApi {
    http: Client,
    api_url: String,
    username: String,
    token: String,
}

impl RedditApi {
    pub fn login(credentials: &Credentials) -> Result<Self, ShredError> {
        let http = Client::builder()
            .user_agent(credentials.user_agent.as_str())
            .build()
            .map_err(|err| ShredError::Api(format!("building the HTTP client: {err}")))?;
        Self::login_with(http, credentials, AUTH_URL, API_URL)
    }

    /// Exchanges the credentials for a bearer token at `auth_url`; API calls then go to `api_url`.
    pub fn login_with(
        http: Client,
        credentials: &Credentials,
        auth_url: &str,
        api_url: &str,
    ) -> Result<Self, ShredError> {
        debug!(username = %credentials.username, "Logging in");
        let login_error = |message: String| ShredError::Login {
            username: credentials.username.clone(),
            message,
        };

        let form = [
            ("grant_type", "password"),
            ("username", credentials.username.as_str()),
            ("password", credentials.password.as_str()),
        ];
        let response = http
            .post(format!("{auth_url}/api/v1/access_token"))
            .basic_auth(&credentials.client_id, Some(&credentials.client_secret))
            .form(&form)
            .send()
            .and_then(Response::error_for_status)
            .map_err(|err| login_error(err.to_string()))?;
        let token: Token = response.json().map_err(|err| login_error(err.to_string()))?;

        match token {
            Token {
                access_token: Some(token),
                ..
            } => Ok(Self {
                http,
                api_url: api_url.trim_end_matches('/').to_string(),
                username: credentials.username.clone(),
                token,
            }),
            Token { error, .. } => {
                Err(login_error(error.unwrap_or_else(|| "no access token".to_string())))
            }
        }
    }

    fn send(&self, request: RequestBuilder, what: &str) -> Result<Response, ShredError> {
        let response = request
            .bearer_auth(&self.token)
            .send()
            .map_err(|err| ShredError::Api(format!("{what}: {err}")))?;
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(ShredError::Api(format!("{what}: HTTP {status}")))
        }
    }

    fn listing<T: DeserializeOwned + Into<Item>>(
        &self,
        path: &str,
        after: Option<&str>,
    ) -> Result<Page, ShredError> {
        let url = format!("{}/user/{}/{path}", self.api_url, self.username);
        let limit = PAGE_SIZE.to_string();
        let mut query = vec![("limit", limit.as_str()), ("raw_json", "1")];
        if let Some(after) = after {
            query.push(("after", after));
        }

        let what = format!("listing {path}");
        let listing: Thing<Listing<T>> = self
            .send(self.http.get(url).query(&query), &what)?
            .json()
            .map_err(|err| ShredError::Api(format!("{what}: {err}")))?;
        Ok(Page {
            items: listing.data.children.into_iter().map(|child| child.data.into()).collect(),
            after: listing.data.after,
        })
    }

    fn post(&self, endpoint: &str, form: &[(&str, &str)]) -> Result<(), ShredError> {
        let url = format!("{}/{endpoint}", self.api_url);
        self.send(self.http.post(url).form(form), endpoint).map(|_| ())
    }
}

impl RedditClient for RedditApi {
    fn history(&self, kind: Kind, after: Option<&str>) -> Result<Page, ShredError> {
        match kind {
            Kind::Comment => self.listing::<CommentData>("comments", after),
            Kind::Submission => self.listing::<SubmissionData>("submitted", after),
        }
    }

    fn edit(&self, item: &Item, text: &str) -> Result<(), ShredError> {
        self.post("api/editusertext", &[("thing_id", item.name.as_str()), ("text", text)])
    }

    fn delete(&self, item: &Item) -> Result<(), ShredError> {
        self.post("api/del", &[("id", item.name.as_str())])
    }
}
