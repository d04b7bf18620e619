//! Facebook Graph API client
//!
//! Covers the calls a Messenger bot needs: the Send API, user profiles,
//! OAuth token exchange, page app subscription and the Messenger profile
//! (get started button, persistent menu).

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, error, info};

use crate::error::{GraphError, Result};
use crate::template::{PersistentMenu, Template};
use crate::types::*;
use crate::validate::Validate;

const GRAPH_BASE_URL: &str = "https://graph.facebook.com";

/// Graph API version used when none is configured
pub const DEFAULT_GRAPH_VERSION: &str = "v18.0";

/// Page webhook fields subscribed by [`GraphClient::subscribe_app`]
pub const DEFAULT_SUBSCRIBED_FIELDS: &[&str] = &[
    "messages",
    "messaging_postbacks",
    "message_echoes",
    "messaging_referrals",
    "standby",
];

const PROFILE_FIELDS: &str = "first_name,last_name,profile_pic,locale";

/// Graph API client bound to one page
#[derive(Clone)]
pub struct GraphClient {
    client: Client,
    page_id: String,
    access_token: String,
    app_id: Option<String>,
    app_secret: Option<String>,
    base_url: String,
}

impl GraphClient {
    /// Create a client for a page using its page access token
    pub fn new(page_id: &str, access_token: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            page_id: page_id.to_string(),
            access_token: access_token.to_string(),
            app_id: None,
            app_secret: None,
            base_url: format!("{}/{}", GRAPH_BASE_URL, DEFAULT_GRAPH_VERSION),
        })
    }

    /// Pin a Graph API version such as `v19.0`
    pub fn with_version(mut self, version: &str) -> Self {
        self.base_url = format!("{}/{}", GRAPH_BASE_URL, version);
        self
    }

    /// Point the client at another host (including the version segment)
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// App credentials, required for token exchange
    pub fn with_app_credentials(mut self, app_id: &str, app_secret: &str) -> Self {
        self.app_id = Some(app_id.to_string());
        self.app_secret = Some(app_secret.to_string());
        self
    }

    pub fn page_id(&self) -> &str {
        &self.page_id
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn token(&self) -> Result<&str> {
        if self.access_token.is_empty() {
            return Err(GraphError::AccessTokenNotSet);
        }
        Ok(&self.access_token)
    }

    fn app_credentials(&self) -> Result<(&str, &str)> {
        let app_id = self.app_id.as_deref().ok_or(GraphError::AppIdNotSet)?;
        let app_secret = self.app_secret.as_deref().ok_or(GraphError::AppSecretNotSet)?;
        Ok((app_id, app_secret))
    }

    fn authed(&self, request: RequestBuilder) -> Result<RequestBuilder> {
        Ok(request.query(&[("access_token", self.token()?)]))
    }

    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder, what: &str) -> Result<T> {
        let response = request.send().await?;
        let response = check_status(response, what).await?;
        Ok(response.json().await?)
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        what: &str,
    ) -> Result<T> {
        let request = self.authed(self.client.post(self.url(path)).json(body))?;
        self.execute(request, what).await
    }

    // =========================================================================
    // Send API
    // =========================================================================

    /// Validate and send a request through `/{page}/messages`
    pub async fn send_message(&self, request: &SendRequest) -> Result<SendResponse> {
        if let Some(message) = &request.message {
            message.validate()?;
        }

        debug!("Sending message to {}", request.recipient.id);
        let path = format!("{}/messages", self.page_id);
        let response: SendResponse = self.post_json(&path, request, "Send message").await?;

        info!("Message sent successfully: {:?}", response.message_id);
        Ok(response)
    }

    async fn reply(&self, recipient_id: &str, message: OutgoingMessage) -> Result<SendResponse> {
        self.send_message(&SendRequest::message(recipient_id, message))
            .await
    }

    pub async fn send_text(&self, recipient_id: &str, text: &str) -> Result<SendResponse> {
        self.reply(recipient_id, OutgoingMessage::text(text)).await
    }

    pub async fn send_quick_replies(
        &self,
        recipient_id: &str,
        text: &str,
        quick_replies: Vec<QuickReply>,
    ) -> Result<SendResponse> {
        let message = OutgoingMessage::text(text).with_quick_replies(quick_replies);
        self.reply(recipient_id, message).await
    }

    pub async fn send_template(&self, recipient_id: &str, template: Template) -> Result<SendResponse> {
        self.reply(recipient_id, OutgoingMessage::template(template))
            .await
    }

    /// Send an image, audio, video or file hosted at `url`
    pub async fn send_attachment_url(
        &self,
        recipient_id: &str,
        kind: AttachmentKind,
        url: &str,
    ) -> Result<SendResponse> {
        let attachment = OutgoingAttachment::from_url(kind, url);
        self.reply(recipient_id, OutgoingMessage::attachment(attachment))
            .await
    }

    pub async fn send_sender_action(&self, recipient_id: &str, action: SenderAction) -> Result<()> {
        debug!("Sending {:?} to {}", action, recipient_id);
        let path = format!("{}/messages", self.page_id);
        let _: Value = self
            .post_json(&path, &SendRequest::action(recipient_id, action), "Sender action")
            .await?;
        Ok(())
    }

    // =========================================================================
    // Users and tokens
    // =========================================================================

    /// Get the public profile of a page-scoped user id.
    ///
    /// An empty `fields` slice requests name, picture and locale.
    pub async fn get_user_profile(&self, user_id: &str, fields: &[&str]) -> Result<UserProfile> {
        let fields = if fields.is_empty() {
            PROFILE_FIELDS.to_string()
        } else {
            fields.join(",")
        };
        let request = self
            .authed(self.client.get(self.url(user_id)))?
            .query(&[("fields", fields)]);
        let profile: UserProfile = self.execute(request, "Get user profile").await?;

        debug!("Got user profile: {:?}", profile);
        Ok(profile)
    }

    /// Exchange an OAuth `code` for a user access token
    pub async fn exchange_code_for_token(&self, redirect_uri: &str, code: &str) -> Result<TokenResponse> {
        let (app_id, app_secret) = self.app_credentials()?;
        let request = self.client.get(self.url("oauth/access_token")).query(&[
            ("client_id", app_id),
            ("client_secret", app_secret),
            ("redirect_uri", redirect_uri),
            ("code", code),
        ]);
        self.execute(request, "Exchange code").await
    }

    /// Exchange a short-lived token for a long-lived one
    pub async fn exchange_long_lived_token(&self, short_lived_token: &str) -> Result<TokenResponse> {
        let (app_id, app_secret) = self.app_credentials()?;
        let request = self.client.get(self.url("oauth/access_token")).query(&[
            ("grant_type", "fb_exchange_token"),
            ("client_id", app_id),
            ("client_secret", app_secret),
            ("fb_exchange_token", short_lived_token),
        ]);
        self.execute(request, "Exchange long-lived token").await
    }

    // =========================================================================
    // Page subscription
    // =========================================================================

    /// Subscribe the app to the page's webhook fields
    pub async fn subscribe_app(&self, fields: &[&str]) -> Result<bool> {
        let path = format!("{}/subscribed_apps", self.page_id);
        let request = self
            .authed(self.client.post(self.url(&path)))?
            .query(&[("subscribed_fields", fields.join(","))]);
        let response: SuccessResponse = self.execute(request, "Subscribe app").await?;

        info!("Subscribed app to page {}: {}", self.page_id, fields.join(","));
        Ok(response.success)
    }

    pub async fn unsubscribe_app(&self) -> Result<bool> {
        let path = format!("{}/subscribed_apps", self.page_id);
        let request = self.authed(self.client.delete(self.url(&path)))?;
        let response: SuccessResponse = self.execute(request, "Unsubscribe app").await?;
        Ok(response.success)
    }

    pub async fn subscribed_apps(&self) -> Result<SubscribedApps> {
        let path = format!("{}/subscribed_apps", self.page_id);
        let request = self.authed(self.client.get(self.url(&path)))?;
        self.execute(request, "List subscribed apps").await
    }

    // =========================================================================
    // Messenger profile
    // =========================================================================

    /// Set the payload delivered when a user taps "Get Started"
    pub async fn set_get_started(&self, payload: &str) -> Result<bool> {
        let body = json!({ "get_started": { "payload": payload } });
        let response: SuccessResponse = self
            .post_json("me/messenger_profile", &body, "Set get started")
            .await?;
        Ok(response.success)
    }

    pub async fn set_persistent_menu(&self, menus: &[PersistentMenu]) -> Result<bool> {
        menus.iter().try_for_each(Validate::validate)?;
        let body = json!({ "persistent_menu": menus });
        let response: SuccessResponse = self
            .post_json("me/messenger_profile", &body, "Set persistent menu")
            .await?;
        Ok(response.success)
    }

    pub async fn delete_messenger_profile_fields(&self, fields: &[&str]) -> Result<bool> {
        let body = json!({ "fields": fields });
        let request = self.authed(
            self.client
                .delete(self.url("me/messenger_profile"))
                .json(&body),
        )?;
        let response: SuccessResponse = self
            .execute(request, "Delete messenger profile fields")
            .await?;
        Ok(response.success)
    }
}

/// Turn a non-2xx response into [`GraphError::Api`], preferring the Graph error body
async fn check_status(response: Response, what: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    error!("{} failed: {} - {}", what, status, body);

    let (message, code) = match serde_json::from_str::<GraphErrorBody>(&body) {
        Ok(parsed) => (parsed.error.message, parsed.error.code),
        Err(_) => (body, None),
    };
    Err(GraphError::Api {
        status: status.as_u16(),
        message,
        code,
    })
}
