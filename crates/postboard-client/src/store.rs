//! The reconciliation store: the client's single source of local state.
//!
//! All local copies of users and messages live here and change only through
//! the operations below. Network calls are the only suspension points; the
//! state lock is never held across one, so a background refresh can land
//! while a mutation is in flight. Whichever response is applied last wins.

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use postboard_types::models::sort_by_timestamp;
use postboard_types::{Message, MessageId, Snapshot, User, UserId};

use crate::error::{ClientError, RemoteError};
use crate::notify::Notifier;
use crate::remote::Remote;
use crate::view::{filter_messages, select_current_user};

const INITIAL_LOAD_FAILED: &str =
    "Could not connect to the server. Please check your connection and refresh.";
const NO_SENDER_SELECTED: &str = "Cannot send message: no sender selected.";
const EMPTY_MESSAGE: &str = "Message text cannot be empty.";
const EMPTY_USER_NAME: &str = "User name is required.";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LoadState {
    #[default]
    NotLoaded,
    Loading,
    Ready,
    /// The initial load failed; carries the text for a full-page error.
    Error(String),
}

#[derive(Debug, Default)]
struct State {
    load: LoadState,
    users: Vec<User>,
    messages: Vec<Message>,
    current_user: Option<UserId>,
    search_query: String,
    submitting: usize,
}

impl State {
    /// Replace users and messages with a fetched snapshot. Returns false when
    /// nothing differs, so identical polls do not register as changes.
    fn apply(&mut self, users: Vec<User>, mut messages: Vec<Message>) -> bool {
        sort_by_timestamp(&mut messages);
        let current = select_current_user(&users, self.current_user.as_ref());

        if users == self.users && messages == self.messages && current == self.current_user {
            return false;
        }
        self.users = users;
        self.messages = messages;
        self.current_user = current;
        true
    }

    fn current_user(&self) -> Option<&User> {
        let id = self.current_user.as_ref()?;
        self.users.iter().find(|u| &u.id == id)
    }
}

/// Everything the presentation layer reads, taken under one lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardView {
    pub load_state: LoadState,
    pub users: Vec<User>,
    pub current_user: Option<User>,
    /// Messages after the search filter, oldest first.
    pub messages: Vec<Message>,
    pub total_messages: usize,
    pub search_query: String,
    pub is_submitting: bool,
    pub revision: u64,
}

impl BoardView {
    /// Only a message's sender may edit or delete it.
    pub fn can_modify(&self, message: &Message) -> bool {
        self.current_user
            .as_ref()
            .is_some_and(|u| message.is_sent_by(&u.id))
    }

    pub fn can_compose(&self) -> bool {
        self.current_user.is_some()
    }
}

/// A downloadable export of the server's data set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub file_name: String,
    /// Pretty-printed `{users, messages}` JSON.
    pub contents: String,
}

pub struct Store<R> {
    remote: R,
    state: Mutex<State>,
    notifier: Notifier,
    revision: watch::Sender<u64>,
}

/// Holds the submitting flag up until dropped.
struct Submitting<'a, R> {
    store: &'a Store<R>,
}

impl<R> Drop for Submitting<'_, R> {
    fn drop(&mut self) {
        self.store.mutate(|s| s.submitting = s.submitting.saturating_sub(1));
    }
}

impl<R> Store<R> {
    pub fn new(remote: R) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            remote,
            state: Mutex::new(State::default()),
            notifier: Notifier::new(),
            revision,
        }
    }

    /// Seed the selection with a sender remembered from an earlier session.
    pub fn with_remembered_user(self, id: Option<UserId>) -> Self {
        self.lock().current_user = id;
        self
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    /// Receives the revision number each time local state changes.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    pub fn view(&self) -> BoardView {
        let state = self.lock();
        BoardView {
            load_state: state.load.clone(),
            users: state.users.clone(),
            current_user: state.current_user().cloned(),
            messages: filter_messages(&state.messages, &state.search_query),
            total_messages: state.messages.len(),
            search_query: state.search_query.clone(),
            is_submitting: state.submitting > 0,
            revision: *self.revision.borrow(),
        }
    }

    pub fn load_state(&self) -> LoadState {
        self.lock().load.clone()
    }

    pub fn users(&self) -> Vec<User> {
        self.lock().users.clone()
    }

    /// Every message, unfiltered, oldest first.
    pub fn messages(&self) -> Vec<Message> {
        self.lock().messages.clone()
    }

    pub fn filtered_messages(&self) -> Vec<Message> {
        let state = self.lock();
        filter_messages(&state.messages, &state.search_query)
    }

    pub fn current_user(&self) -> Option<User> {
        self.lock().current_user().cloned()
    }

    pub fn search_query(&self) -> String {
        self.lock().search_query.clone()
    }

    pub fn is_submitting(&self) -> bool {
        self.lock().submitting > 0
    }

    pub fn set_search_query(&self, query: impl Into<String>) {
        let query = query.into();
        self.mutate_if(|s| {
            if s.search_query == query {
                return false;
            }
            s.search_query = query;
            true
        });
    }

    pub fn set_current_user(&self, id: &UserId) -> Result<(), ClientError> {
        if !self.lock().users.iter().any(|u| &u.id == id) {
            return Err(self.reject("Unknown sender."));
        }
        self.mutate_if(|s| {
            if s.current_user.as_ref() == Some(id) {
                return false;
            }
            s.current_user = Some(id.clone());
            true
        });
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn mutate<T>(&self, f: impl FnOnce(&mut State) -> T) -> T {
        let mut state = self.lock();
        let out = f(&mut state);
        self.revision.send_modify(|r| *r += 1);
        out
    }

    fn mutate_if(&self, f: impl FnOnce(&mut State) -> bool) -> bool {
        let mut state = self.lock();
        let changed = f(&mut state);
        if changed {
            self.revision.send_modify(|r| *r += 1);
        }
        changed
    }

    fn begin_submit(&self) -> Submitting<'_, R> {
        self.mutate(|s| s.submitting += 1);
        Submitting { store: self }
    }

    /// Local validation failure: notify, never touch the network.
    fn reject(&self, message: &str) -> ClientError {
        self.notifier.error(message);
        ClientError::Validation(message.to_string())
    }

    fn fail(&self, err: RemoteError, fallback: &str) -> ClientError {
        let err = ClientError::from(err);
        warn!("{}: {}", fallback, err);
        self.notifier.error(err.user_message(fallback));
        err
    }
}

impl<R: Remote> Store<R> {
    async fn fetch(&self) -> Result<(Vec<User>, Vec<Message>), RemoteError> {
        tokio::try_join!(self.remote.list_users(), self.remote.list_messages())
    }

    /// First load. The only operation that passes through [`LoadState::Loading`];
    /// a failure parks the store in [`LoadState::Error`] without retrying.
    pub async fn initial_load(&self) -> Result<(), ClientError> {
        self.mutate(|s| s.load = LoadState::Loading);

        match self.fetch().await {
            Ok((users, messages)) => {
                self.mutate(|s| {
                    s.apply(users, messages);
                    s.load = LoadState::Ready;
                });
                let view = self.view();
                info!(
                    "Loaded {} users and {} messages",
                    view.users.len(),
                    view.total_messages
                );
                Ok(())
            }
            Err(err) => {
                warn!("Initial load failed: {}", err);
                self.mutate(|s| s.load = LoadState::Error(INITIAL_LOAD_FAILED.to_string()));
                Err(err.into())
            }
        }
    }

    /// Silent background reload. Leaves the load state alone and raises no
    /// notification; an unchanged snapshot leaves the revision untouched.
    pub async fn refresh(&self) -> Result<(), ClientError> {
        let (users, messages) = self.fetch().await?;
        if self.mutate_if(|s| s.apply(users, messages)) {
            debug!("Refresh applied new data");
        }
        Ok(())
    }

    /// The mutation itself already succeeded, so a failed reload is only logged.
    async fn refresh_after_mutation(&self) {
        if let Err(err) = self.refresh().await {
            warn!("Refresh after mutation failed: {}", err);
        }
    }

    pub async fn create_user(&self, name: &str) -> Result<User, ClientError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(self.reject(EMPTY_USER_NAME));
        }

        let _submitting = self.begin_submit();
        let user = self
            .remote
            .create_user(name)
            .await
            .map_err(|e| self.fail(e, "Failed to create user"))?;

        self.mutate(|s| {
            if !s.users.iter().any(|u| u.id == user.id) {
                s.users.push(user.clone());
            }
            if s.current_user().is_none() {
                s.current_user = Some(user.id.clone());
            }
        });
        self.notifier
            .success(format!("User \"{}\" created successfully!", user.name));
        Ok(user)
    }

    /// Post as the current sender, then reload so server-assigned fields
    /// (id, timestamp, sender name) come from the server.
    pub async fn send_message(&self, text: &str) -> Result<Message, ClientError> {
        let Some(sender_id) = self.lock().current_user().map(|u| u.id.clone()) else {
            return Err(self.reject(NO_SENDER_SELECTED));
        };
        let text = text.trim();
        if text.is_empty() {
            return Err(self.reject(EMPTY_MESSAGE));
        }

        let _submitting = self.begin_submit();
        let message = self
            .remote
            .send_message(text, &sender_id)
            .await
            .map_err(|e| self.fail(e, "Failed to send message"))?;

        self.refresh_after_mutation().await;
        Ok(message)
    }

    /// Not optimistic: local state changes only through the reload that follows success.
    pub async fn update_message(&self, id: &MessageId, text: &str) -> Result<Message, ClientError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(self.reject(EMPTY_MESSAGE));
        }

        let _submitting = self.begin_submit();
        let message = self
            .remote
            .update_message(id, text)
            .await
            .map_err(|e| self.fail(e, "Failed to update message"))?;

        self.refresh_after_mutation().await;
        self.notifier.success("Message updated.");
        Ok(message)
    }

    /// Optimistic: the message disappears locally before the server answers.
    /// On failure the exact pre-delete list is put back; no reload either way.
    pub async fn delete_message(&self, id: &MessageId) -> Result<(), ClientError> {
        let previous = self.mutate(|s| {
            let previous = s.messages.clone();
            s.messages.retain(|m| &m.id != id);
            previous
        });

        match self.remote.delete_message(id).await {
            Ok(()) => {
                self.notifier.success("Message deleted.");
                Ok(())
            }
            Err(err) => {
                self.mutate(|s| s.messages = previous);
                Err(self.fail(err, "Failed to delete message"))
            }
        }
    }

    /// Validate an uploaded export locally, replace the server's data set with
    /// it, then reload. A malformed file never reaches the network.
    pub async fn import_snapshot(&self, contents: &[u8]) -> Result<(), ClientError> {
        let snapshot = match Snapshot::parse(contents) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                let err = ClientError::ImportFormat(e.to_string());
                self.notifier.error(err.to_string());
                return Err(err);
            }
        };

        let _submitting = self.begin_submit();
        self.remote
            .import_snapshot(&snapshot)
            .await
            .map_err(|e| self.fail(e, "Failed to import data"))?;

        info!(
            "Imported {} users and {} messages",
            snapshot.users.len(),
            snapshot.messages.len()
        );
        self.refresh_after_mutation().await;
        self.notifier.success("Data imported successfully!");
        Ok(())
    }

    /// Fetch the data set fresh from the server (not from local state) and
    /// render it as a JSON file.
    pub async fn export_snapshot(&self) -> Result<ExportArtifact, ClientError> {
        let snapshot = self
            .remote
            .export_snapshot()
            .await
            .map_err(|e| self.fail(e, "Failed to export data"))?;

        let contents = serde_json::to_string_pretty(&snapshot).map_err(|e| {
            let err = ClientError::Export(e.to_string());
            self.notifier.error(err.to_string());
            err
        })?;

        self.notifier.success("Data exported successfully!");
        Ok(ExportArtifact {
            file_name: format!("postboard-export-{}.json", Utc::now().format("%Y-%m-%d")),
            contents,
        })
    }
}
