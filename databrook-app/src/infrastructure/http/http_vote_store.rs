use super::event_stream::tally_pushes;
use crate::application::{TallyStream, VoteStore};
use crate::domain::{TallyPush, VideoId, ViewerId, VoteMark};
use async_trait::async_trait;
use databrook_errors::AppError;
use reqwest::{header, Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Serialize, Deserialize)]
struct MarkBody {
    mark: Option<VoteMark>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Vote store reached over the databrook HTTP API.
///
/// Requests carry the viewer's session cookie; the server only accepts
/// writes for the viewer that cookie belongs to.
#[derive(Clone)]
pub struct HttpVoteStore {
    base_url: Url,
    http: reqwest::Client,
    session_cookie: Option<String>,
}

impl HttpVoteStore {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            http: reqwest::Client::new(),
            session_cookie: None,
        }
    }

    /// `cookie` is the raw `name=value` pair issued at sign-in.
    pub fn with_session_cookie(mut self, cookie: impl Into<String>) -> Self {
        self.session_cookie = Some(cookie.into());
        self
    }

    fn url(&self, path: &str) -> Result<Url, AppError> {
        self.base_url
            .join(path)
            .map_err(|e| AppError::Internal(format!("Invalid API url: {}", e)))
    }

    fn vote_url(&self, viewer: ViewerId, video: VideoId) -> Result<Url, AppError> {
        self.url(&format!("api/viewers/{}/votes/{}", viewer, video))
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.http.request(method, url);
        match &self.session_cookie {
            Some(cookie) => builder.header(header::COOKIE, cookie),
            None => builder,
        }
    }

    async fn write(&self, method: Method, url: Url, body: Option<MarkBody>) -> Result<TallyPush, AppError> {
        let mut request = self.request(method, url);
        if let Some(body) = body {
            request = request.json(&body);
        }
        let resp = request
            .send()
            .await
            .map_err(|e| AppError::RemotePersistFailure(e.to_string()))?;
        let resp = check(resp, AppError::RemotePersistFailure).await?;
        resp.json::<TallyPush>()
            .await
            .map_err(|e| AppError::RemotePersistFailure(e.to_string()))
    }
}

/// Map non-success statuses to the error taxonomy. Failures without a more
/// specific meaning are wrapped with `fallback`.
async fn check(resp: Response, fallback: fn(String) -> AppError) -> Result<Response, AppError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    match status {
        StatusCode::UNAUTHORIZED => Err(AppError::NotAuthenticated),
        StatusCode::FORBIDDEN => Err(AppError::Forbidden),
        StatusCode::NOT_FOUND => Err(AppError::NotFound),
        _ => {
            let message = resp
                .json::<ErrorBody>()
                .await
                .map(|body| body.message)
                .unwrap_or_else(|_| status.to_string());
            Err(fallback(message))
        }
    }
}

#[async_trait]
impl VoteStore for HttpVoteStore {
    async fn read_mark(&self, viewer: ViewerId, video: VideoId) -> Result<Option<VoteMark>, AppError> {
        let resp = self
            .request(Method::GET, self.vote_url(viewer, video)?)
            .send()
            .await
            .map_err(|e| AppError::RemoteReadFailure(e.to_string()))?;
        let resp = check(resp, AppError::RemoteReadFailure).await?;
        let body: MarkBody = resp
            .json()
            .await
            .map_err(|e| AppError::RemoteReadFailure(e.to_string()))?;
        Ok(body.mark)
    }

    async fn upsert_mark(
        &self,
        viewer: ViewerId,
        video: VideoId,
        mark: VoteMark,
    ) -> Result<TallyPush, AppError> {
        let url = self.vote_url(viewer, video)?;
        self.write(Method::PUT, url, Some(MarkBody { mark: Some(mark) })).await
    }

    async fn delete_mark(&self, viewer: ViewerId, video: VideoId) -> Result<TallyPush, AppError> {
        let url = self.vote_url(viewer, video)?;
        self.write(Method::DELETE, url, None).await
    }

    async fn subscribe_tally_changes(&self, video: VideoId) -> Result<TallyStream, AppError> {
        let url = self.url(&format!("api/videos/{}/tally/stream", video))?;
        let resp = self
            .request(Method::GET, url)
            .header(header::ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(|e| AppError::RemoteReadFailure(e.to_string()))?;
        let resp = check(resp, AppError::RemoteReadFailure).await?;
        tracing::debug!(video_id = %video, "tally stream connected");
        Ok(tally_pushes(resp.bytes_stream()))
    }
}
