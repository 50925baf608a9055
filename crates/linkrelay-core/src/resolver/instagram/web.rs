//! Instagram web API client
//!
//! Logs in through the browser login endpoint and looks posts up through the
//! GraphQL endpoint. Session cookies live in the client's cookie jar.

use super::{InstagramApi, InstagramError, InstagramPost};
use crate::config::InstagramCredentials;
use async_trait::async_trait;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::{Client as HttpClient, StatusCode, Url};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};

const BASE_URL: &str = "https://www.instagram.com";
const LOGIN_PAGE_PATH: &str = "/accounts/login/";
const LOGIN_AJAX_PATH: &str = "/api/v1/web/accounts/login/ajax/";
const GRAPHQL_PATH: &str = "/graphql/query";

/// Web app id sent as `X-IG-App-ID`
const WEB_APP_ID: &str = "936619743392459";
/// Persisted query id for a single post by shortcode
const POST_DOC_ID: &str = "8845758582119845";
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";
const CSRF_COOKIE: &str = "csrftoken";

/// [`InstagramApi`] over the public web endpoints
pub struct InstagramWebClient {
    http: HttpClient,
    jar: Arc<Jar>,
    base_url: Url,
}

impl InstagramWebClient {
    /// Create a client with an empty cookie jar.
    ///
    /// # Errors
    ///
    /// Returns `InstagramError::Http` if the HTTP client cannot be built.
    pub fn new() -> Result<Self, InstagramError> {
        let base_url = Url::parse(BASE_URL)
            .map_err(|e| InstagramError::UnexpectedResponse(e.to_string()))?;
        let jar = Arc::new(Jar::default());
        let http = HttpClient::builder()
            .cookie_provider(jar.clone())
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            http,
            jar,
            base_url,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, InstagramError> {
        self.base_url
            .join(path)
            .map_err(|e| InstagramError::UnexpectedResponse(e.to_string()))
    }

    fn csrf_token(&self) -> Option<String> {
        let header = self.jar.cookies(&self.base_url)?;
        csrf_from_cookie_header(header.to_str().ok()?)
    }

    async fn fetch_csrf_token(&self) -> Result<String, InstagramError> {
        self.http
            .get(self.endpoint(LOGIN_PAGE_PATH)?)
            .send()
            .await?
            .error_for_status()?;
        self.csrf_token().ok_or(InstagramError::MissingCsrfToken)
    }
}

#[async_trait]
impl InstagramApi for InstagramWebClient {
    async fn login(&self, credentials: &InstagramCredentials) -> Result<(), InstagramError> {
        let csrf = self.fetch_csrf_token().await?;
        let enc_password = format!(
            "#PWD_INSTAGRAM_BROWSER:0:{}:{}",
            chrono::Utc::now().timestamp(),
            credentials.password
        );

        let response = self
            .http
            .post(self.endpoint(LOGIN_AJAX_PATH)?)
            .header("X-CSRFToken", csrf)
            .header("X-IG-App-ID", WEB_APP_ID)
            .header("X-Requested-With", "XMLHttpRequest")
            .header("Referer", format!("{BASE_URL}{LOGIN_PAGE_PATH}"))
            .form(&[
                ("username", credentials.username.as_str()),
                ("enc_password", enc_password.as_str()),
                ("queryParams", "{}"),
                ("optIntoOneTap", "false"),
            ])
            .send()
            .await?;

        // Rejections come back as 400 with a JSON body worth reading
        let status = response.status();
        let body: LoginResponse = response.json().await.map_err(|e| {
            InstagramError::UnexpectedResponse(format!("login status {status}: {e}"))
        })?;
        body.into_result()?;

        info!(username = %credentials.username, "Instagram session established");
        Ok(())
    }

    async fn post_by_shortcode(&self, shortcode: &str) -> Result<InstagramPost, InstagramError> {
        debug!(shortcode = %shortcode, "Looking up Instagram post");

        let variables = json!({
            "shortcode": shortcode,
            "fetch_tagged_user_count": null,
            "hoisted_comment_id": null,
            "hoisted_reply_id": null,
        })
        .to_string();

        let mut request = self
            .http
            .post(self.endpoint(GRAPHQL_PATH)?)
            .header("X-IG-App-ID", WEB_APP_ID)
            .header("Referer", format!("{BASE_URL}/p/{shortcode}/"));
        if let Some(csrf) = self.csrf_token() {
            request = request.header("X-CSRFToken", csrf);
        }

        let response = request
            .form(&[("variables", variables.as_str()), ("doc_id", POST_DOC_ID)])
            .send()
            .await?;
        if let Some(reason) = session_rejection(response.status(), response.url()) {
            return Err(InstagramError::SessionExpired(reason));
        }

        let body: PostQueryResponse = response.error_for_status()?.json().await?;
        body.into_post(shortcode)
    }
}

/// Instagram answers a stale session with 401/403 or a redirect to the login page.
fn session_rejection(status: StatusCode, final_url: &Url) -> Option<String> {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Some(format!("HTTP {status}"));
    }
    if final_url.path().starts_with(LOGIN_PAGE_PATH) {
        return Some(format!("redirected to {}", final_url.path()));
    }
    None
}

fn csrf_from_cookie_header(header: &str) -> Option<String> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == CSRF_COOKIE)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

#[derive(Debug, Default, Deserialize)]
struct LoginResponse {
    #[serde(default)]
    authenticated: bool,
    #[serde(default)]
    two_factor_required: bool,
    checkpoint_url: Option<String>,
    message: Option<String>,
    status: Option<String>,
}

impl LoginResponse {
    fn into_result(self) -> Result<(), InstagramError> {
        if self.authenticated {
            return Ok(());
        }
        if self.two_factor_required {
            return Err(InstagramError::TwoFactorRequired);
        }
        if let Some(url) = self.checkpoint_url {
            return Err(InstagramError::CheckpointRequired(url));
        }
        let reason = self
            .message
            .or(self.status)
            .unwrap_or_else(|| "not authenticated".to_string());
        Err(InstagramError::LoginRejected(reason))
    }
}

#[derive(Debug, Deserialize)]
struct PostQueryResponse {
    data: Option<PostQueryData>,
}

#[derive(Debug, Deserialize)]
struct PostQueryData {
    xdt_shortcode_media: Option<ShortcodeMedia>,
}

#[derive(Debug, Deserialize)]
struct ShortcodeMedia {
    shortcode: Option<String>,
    #[serde(default)]
    is_video: bool,
    video_url: Option<String>,
    display_url: Option<String>,
}

impl PostQueryResponse {
    fn into_post(self, shortcode: &str) -> Result<InstagramPost, InstagramError> {
        let media = self
            .data
            .and_then(|data| data.xdt_shortcode_media)
            .ok_or_else(|| InstagramError::PostNotFound(shortcode.to_string()))?;

        Ok(InstagramPost {
            shortcode: media.shortcode.unwrap_or_else(|| shortcode.to_string()),
            is_video: media.is_video,
            video_url: media.video_url,
            display_url: media.display_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csrf_from_cookie_header() {
        assert_eq!(
            csrf_from_cookie_header("mid=abc; csrftoken=Tok3n; ig_did=X"),
            Some("Tok3n".to_string())
        );
        assert_eq!(csrf_from_cookie_header("mid=abc"), None);
        assert_eq!(csrf_from_cookie_header("csrftoken="), None);
    }

    #[test]
    fn test_session_rejection_signals() -> Result<(), Box<dyn std::error::Error>> {
        let graphql = Url::parse("https://www.instagram.com/graphql/query")?;
        let login = Url::parse("https://www.instagram.com/accounts/login/?next=%2Fgraphql%2Fquery")?;

        assert!(session_rejection(StatusCode::UNAUTHORIZED, &graphql).is_some());
        assert!(session_rejection(StatusCode::FORBIDDEN, &graphql).is_some());
        assert_eq!(
            session_rejection(StatusCode::OK, &login).as_deref(),
            Some("redirected to /accounts/login/")
        );
        assert_eq!(session_rejection(StatusCode::OK, &graphql), None);
        assert_eq!(session_rejection(StatusCode::NOT_FOUND, &graphql), None);
        assert_eq!(
            session_rejection(StatusCode::TOO_MANY_REQUESTS, &graphql),
            None
        );
        Ok(())
    }

    #[test]
    fn test_login_response_outcomes() -> Result<(), serde_json::Error> {
        let ok: LoginResponse =
            serde_json::from_str(r#"{"user": true, "authenticated": true, "status": "ok"}"#)?;
        assert!(ok.into_result().is_ok());

        let rejected: LoginResponse =
            serde_json::from_str(r#"{"user": true, "authenticated": false, "status": "ok"}"#)?;
        assert!(matches!(
            rejected.into_result(),
            Err(InstagramError::LoginRejected(_))
        ));

        let two_factor: LoginResponse =
            serde_json::from_str(r#"{"two_factor_required": true, "status": "fail"}"#)?;
        assert!(matches!(
            two_factor.into_result(),
            Err(InstagramError::TwoFactorRequired)
        ));

        let checkpoint: LoginResponse = serde_json::from_str(
            r#"{"message": "checkpoint_required", "checkpoint_url": "/challenge/1/"}"#,
        )?;
        assert!(matches!(
            checkpoint.into_result(),
            Err(InstagramError::CheckpointRequired(url)) if url == "/challenge/1/"
        ));
        Ok(())
    }

    #[test]
    fn test_post_response_video() -> Result<(), Box<dyn std::error::Error>> {
        let raw = r#"{"data": {"xdt_shortcode_media": {
            "__typename": "XDTGraphVideo",
            "shortcode": "C1abc",
            "is_video": true,
            "video_url": "https://scontent.cdninstagram.com/v/clip.mp4",
            "display_url": "https://scontent.cdninstagram.com/v/cover.jpg"
        }}, "status": "ok"}"#;
        let response: PostQueryResponse = serde_json::from_str(raw)?;
        let post = response.into_post("C1abc")?;
        assert!(post.is_video);
        assert_eq!(
            post.media_url(),
            Some("https://scontent.cdninstagram.com/v/clip.mp4")
        );
        Ok(())
    }

    #[test]
    fn test_post_response_missing() -> Result<(), serde_json::Error> {
        let response: PostQueryResponse =
            serde_json::from_str(r#"{"data": {"xdt_shortcode_media": null}, "status": "ok"}"#)?;
        assert!(matches!(
            response.into_post("GONE"),
            Err(InstagramError::PostNotFound(code)) if code == "GONE"
        ));
        Ok(())
    }

    #[test]
    fn test_client_builds() {
        let client = InstagramWebClient::new().expect("client should build");
        assert!(client.csrf_token().is_none());
        assert!(client.endpoint(LOGIN_AJAX_PATH).is_ok());
    }
}
