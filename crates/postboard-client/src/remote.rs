//! Typed access to the REST API.
//!
//! [`Remote`] is the seam the store is written against; [`HttpRemote`] is the
//! reqwest implementation used outside of tests.

use std::future::Future;

use reqwest::{Client, RequestBuilder, Url, header};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use postboard_types::api::{
    CreateUserRequest, ErrorBody, SendMessageRequest, StatusBody, UpdateMessageRequest,
};
use postboard_types::{Message, MessageId, Snapshot, User, UserId};

use crate::config::ClientConfig;
use crate::error::{RemoteError, RemoteErrorKind};

/// One operation per resource action. Implementations never touch local state.
pub trait Remote: Send + Sync + 'static {
    fn list_users(&self) -> impl Future<Output = Result<Vec<User>, RemoteError>> + Send;

    fn create_user(&self, name: &str) -> impl Future<Output = Result<User, RemoteError>> + Send;

    /// Oldest first.
    fn list_messages(&self) -> impl Future<Output = Result<Vec<Message>, RemoteError>> + Send;

    fn send_message(
        &self,
        text: &str,
        sender_id: &UserId,
    ) -> impl Future<Output = Result<Message, RemoteError>> + Send;

    fn update_message(
        &self,
        id: &MessageId,
        text: &str,
    ) -> impl Future<Output = Result<Message, RemoteError>> + Send;

    fn delete_message(&self, id: &MessageId) -> impl Future<Output = Result<(), RemoteError>> + Send;

    /// Replace the server's whole data set.
    fn import_snapshot(
        &self,
        snapshot: &Snapshot,
    ) -> impl Future<Output = Result<(), RemoteError>> + Send;

    /// Fetch users and messages fresh from the server.
    fn export_snapshot(&self) -> impl Future<Output = Result<Snapshot, RemoteError>> + Send {
        async move {
            let (users, messages) = tokio::try_join!(self.list_users(), self.list_messages())?;
            Ok(Snapshot { users, messages })
        }
    }
}

/// [`Remote`] over HTTP.
///
/// Every request is bounded by the configured timeout and aborted when the
/// cancellation token fires; both surface as [`RemoteErrorKind::NetworkFailure`].
#[derive(Clone)]
pub struct HttpRemote {
    http: Client,
    base_url: String,
    cancel: CancellationToken,
}

impl HttpRemote {
    pub fn new(config: &ClientConfig) -> reqwest::Result<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            cancel: CancellationToken::new(),
        })
    }

    /// Token that aborts all outstanding and future requests of this client.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `/messages/{id}` with the id percent-encoded as a single path segment.
    fn message_url(&self, id: &MessageId) -> Result<Url, RemoteError> {
        let mut url = Url::parse(&self.base_url).map_err(|e| {
            RemoteError::new(RemoteErrorKind::BadRequest, format!("Invalid API URL: {e}"))
        })?;
        url.path_segments_mut()
            .map_err(|_| {
                RemoteError::new(RemoteErrorKind::BadRequest, "API URL cannot carry a path")
            })?
            .pop_if_empty()
            .extend(["messages", id.as_str()]);
        Ok(url)
    }

    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, RemoteError> {
        let response = tokio::select! {
            _ = self.cancel.cancelled() => {
                debug!("Request cancelled");
                return Err(RemoteError::network());
            }
            result = request.send() => result.map_err(transport_error)?,
        };

        let status = response.status();
        if !status.is_success() {
            let kind = RemoteErrorKind::from_status(status.as_u16());
            let message = response
                .json::<ErrorBody>()
                .await
                .ok()
                .map(|body| body.error);
            debug!("Request failed with {}: {:?}", status, message);
            return Err(RemoteError { kind, message });
        }

        tokio::select! {
            _ = self.cancel.cancelled() => Err(RemoteError::network()),
            body = response.json::<T>() => body.map_err(transport_error),
        }
    }
}

fn transport_error(err: reqwest::Error) -> RemoteError {
    if err.is_decode() {
        debug!("Undecodable response: {}", err);
        return RemoteError {
            kind: RemoteErrorKind::ServerError,
            message: None,
        };
    }
    debug!("Transport failure: {}", err);
    RemoteError::network()
}

impl Remote for HttpRemote {
    async fn list_users(&self) -> Result<Vec<User>, RemoteError> {
        self.execute(self.http.get(self.url("/users"))).await
    }

    async fn create_user(&self, name: &str) -> Result<User, RemoteError> {
        let body = CreateUserRequest {
            name: name.to_string(),
        };
        self.execute(self.http.post(self.url("/users")).json(&body)).await
    }

    async fn list_messages(&self) -> Result<Vec<Message>, RemoteError> {
        self.execute(self.http.get(self.url("/messages"))).await
    }

    async fn send_message(&self, text: &str, sender_id: &UserId) -> Result<Message, RemoteError> {
        let body = SendMessageRequest {
            text: text.to_string(),
            sender_id: Some(sender_id.clone()),
        };
        self.execute(self.http.post(self.url("/messages")).json(&body)).await
    }

    async fn update_message(&self, id: &MessageId, text: &str) -> Result<Message, RemoteError> {
        let body = UpdateMessageRequest {
            text: text.to_string(),
        };
        let url = self.message_url(id)?;
        self.execute(self.http.put(url).json(&body)).await
    }

    async fn delete_message(&self, id: &MessageId) -> Result<(), RemoteError> {
        let url = self.message_url(id)?;
        let _: StatusBody = self.execute(self.http.delete(url)).await?;
        Ok(())
    }

    async fn import_snapshot(&self, snapshot: &Snapshot) -> Result<(), RemoteError> {
        let file = serde_json::to_vec(snapshot).map_err(|e| {
            RemoteError::new(RemoteErrorKind::BadRequest, format!("Unserialisable snapshot: {e}"))
        })?;
        let request = self
            .http
            .post(self.url("/import"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(file);
        let _: StatusBody = self.execute(request).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_ids_are_escaped_as_one_segment() {
        let config = ClientConfig {
            api_url: "http://localhost:4000/api".into(),
            ..ClientConfig::default()
        };
        let remote = HttpRemote::new(&config).unwrap();

        let url = remote.message_url(&MessageId::from("a/b")).unwrap();
        assert_eq!(url.as_str(), "http://localhost:4000/api/messages/a%2Fb");

        let url = remote.message_url(&MessageId::from("c#d?e")).unwrap();
        assert_eq!(url.as_str(), "http://localhost:4000/api/messages/c%23d%3Fe");
    }
}
