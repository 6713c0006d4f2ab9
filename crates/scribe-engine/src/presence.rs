//! Live per-document presence: cursors, selections, typing, liveness.
//!
//! Presence never passes through the edit sequencer: it does not mutate
//! document content and carries no ordering guarantee beyond
//! last-update-wins per field. Every mutation is broadcast immediately to
//! the session's event bus.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use scribe_core::{
    defaults, CollaborativeUser, Error, EventBus, PresenceMessage, Result, SelectionRange,
    SessionEvent, UserIdentity,
};

/// Configuration for presence liveness.
#[derive(Debug, Clone)]
pub struct PresenceConfig {
    /// A member silent for longer than this is evicted and a leave event
    /// is synthesized.
    pub timeout: Duration,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(defaults::PRESENCE_TIMEOUT_SECS),
        }
    }
}

impl PresenceConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `PRESENCE_TIMEOUT_SECS` | `60` | Idle seconds before eviction |
    pub fn from_env() -> Self {
        let timeout_secs = std::env::var("PRESENCE_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(defaults::PRESENCE_TIMEOUT_SECS);
        Self {
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Per-document registry of connected users.
pub struct PresenceRegistry {
    sessions: RwLock<HashMap<Uuid, HashMap<Uuid, CollaborativeUser>>>,
    /// session token → (document, user), for token-based leave.
    tokens: RwLock<HashMap<Uuid, (Uuid, Uuid)>>,
    events: Arc<EventBus>,
    config: PresenceConfig,
    color_offset: usize,
}

impl PresenceRegistry {
    pub fn new(events: Arc<EventBus>, config: PresenceConfig) -> Self {
        // Random palette offset so the first joiner isn't always red
        let color_offset = rand::thread_rng().gen_range(0..defaults::USER_COLORS.len());
        Self {
            sessions: RwLock::new(HashMap::new()),
            tokens: RwLock::new(HashMap::new()),
            events,
            config,
            color_offset,
        }
    }

    /// Add a user to a document session and return a session token.
    ///
    /// Rejoining refreshes the existing entry (same color, new
    /// `last_active`) and returns a fresh token.
    pub async fn join(&self, document_id: Uuid, identity: UserIdentity) -> Uuid {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let members = sessions.entry(document_id).or_default();

        let user = match members.get_mut(&identity.user_id) {
            Some(existing) => {
                existing.last_active = now;
                existing.clone()
            }
            None => {
                let palette = defaults::USER_COLORS;
                let color = palette[(self.color_offset + members.len()) % palette.len()];
                let user = CollaborativeUser {
                    user_id: identity.user_id,
                    name: identity.name,
                    email: identity.email,
                    color: color.to_string(),
                    cursor: None,
                    selection: None,
                    typing: false,
                    joined_at: now,
                    last_active: now,
                };
                members.insert(identity.user_id, user.clone());
                user
            }
        };
        drop(sessions);

        let token = Uuid::new_v4();
        self.tokens
            .write()
            .await
            .insert(token, (document_id, user.user_id));

        info!(document_id = %document_id, user_id = %user.user_id, "user joined session");
        self.events.emit(SessionEvent::UserJoined { document_id, user });
        token
    }

    /// Remove a user from a document session.
    pub async fn leave(&self, document_id: Uuid, user_id: Uuid) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        let members = sessions
            .get_mut(&document_id)
            .ok_or(Error::UnknownDocument(document_id))?;
        members
            .remove(&user_id)
            .ok_or(Error::UnknownUser(user_id))?;
        if members.is_empty() {
            sessions.remove(&document_id);
        }
        drop(sessions);

        self.tokens
            .write()
            .await
            .retain(|_, (d, u)| !(*d == document_id && *u == user_id));

        info!(document_id = %document_id, user_id = %user_id, "user left session");
        self.events.emit(SessionEvent::PresenceChanged {
            message: PresenceMessage::Leave {
                document_id,
                user_id,
            },
        });
        Ok(())
    }

    /// Remove the member a session token belongs to.
    pub async fn leave_by_token(&self, token: Uuid) -> Result<()> {
        let entry = self.tokens.write().await.remove(&token);
        let (document_id, user_id) =
            entry.ok_or_else(|| Error::InvalidInput(format!("unknown session token {token}")))?;
        self.leave(document_id, user_id).await
    }

    /// Overwrite a user's cursor offset.
    pub async fn update_cursor(&self, document_id: Uuid, user_id: Uuid, position: usize) -> Result<()> {
        self.touch(document_id, user_id, |user| user.cursor = Some(position))
            .await?;
        self.events.emit(SessionEvent::PresenceChanged {
            message: PresenceMessage::Cursor {
                document_id,
                user_id,
                position,
            },
        });
        Ok(())
    }

    /// Overwrite a user's selection range.
    pub async fn update_selection(
        &self,
        document_id: Uuid,
        user_id: Uuid,
        range: SelectionRange,
    ) -> Result<()> {
        if range.from > range.to {
            return Err(Error::InvalidInput(format!(
                "selection from {} after to {}",
                range.from, range.to
            )));
        }
        self.touch(document_id, user_id, |user| user.selection = Some(range))
            .await?;
        self.events.emit(SessionEvent::PresenceChanged {
            message: PresenceMessage::Selection {
                document_id,
                user_id,
                range,
            },
        });
        Ok(())
    }

    /// Set or clear a user's typing flag.
    pub async fn set_typing(&self, document_id: Uuid, user_id: Uuid, typing: bool) -> Result<()> {
        self.touch(document_id, user_id, |user| user.typing = typing)
            .await?;
        self.events.emit(SessionEvent::PresenceChanged {
            message: PresenceMessage::Typing {
                document_id,
                user_id,
                typing,
            },
        });
        Ok(())
    }

    /// Session members for a document, ordered by join time.
    pub async fn members(&self, document_id: Uuid) -> Vec<CollaborativeUser> {
        let sessions = self.sessions.read().await;
        let mut members: Vec<_> = sessions
            .get(&document_id)
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default();
        members.sort_by_key(|u| u.joined_at);
        members
    }

    /// Render the typing indicator line for a document.
    ///
    /// Users are deduplicated by id and ordered by join time:
    /// none → `None`, one → "A is typing...", two → "A and B are
    /// typing...", three or more → "A and N others are typing...".
    pub async fn typing_summary(&self, document_id: Uuid) -> Option<String> {
        let typing: Vec<CollaborativeUser> = self
            .members(document_id)
            .await
            .into_iter()
            .filter(|u| u.typing)
            .collect();

        match typing.as_slice() {
            [] => None,
            [a] => Some(format!("{} is typing...", a.name)),
            [a, b] => Some(format!("{} and {} are typing...", a.name, b.name)),
            [a, rest @ ..] => Some(format!(
                "{} and {} others are typing...",
                a.name,
                rest.len()
            )),
        }
    }

    /// Evict members with no activity inside the liveness window,
    /// synthesizing a leave event for each. Returns the eviction count.
    pub async fn evict_stale(&self) -> usize {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(self.config.timeout)
                .unwrap_or_else(|_| chrono::Duration::seconds(defaults::PRESENCE_TIMEOUT_SECS as i64));

        let mut evicted = Vec::new();
        {
            let mut sessions = self.sessions.write().await;
            for (document_id, members) in sessions.iter_mut() {
                members.retain(|user_id, user| {
                    let stale = user.last_active < cutoff;
                    if stale {
                        evicted.push((*document_id, *user_id));
                    }
                    !stale
                });
            }
            sessions.retain(|_, members| !members.is_empty());
        }

        if !evicted.is_empty() {
            let mut tokens = self.tokens.write().await;
            tokens.retain(|_, pair| !evicted.contains(pair));
        }

        for (document_id, user_id) in &evicted {
            debug!(document_id = %document_id, user_id = %user_id, "presence timeout, evicting");
            self.events.emit(SessionEvent::PresenceChanged {
                message: PresenceMessage::Leave {
                    document_id: *document_id,
                    user_id: *user_id,
                },
            });
        }
        evicted.len()
    }

    async fn touch<F>(&self, document_id: Uuid, user_id: Uuid, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut CollaborativeUser),
    {
        let mut sessions = self.sessions.write().await;
        let members = sessions
            .get_mut(&document_id)
            .ok_or(Error::UnknownDocument(document_id))?;
        let user = members
            .get_mut(&user_id)
            .ok_or(Error::UnknownUser(user_id))?;
        mutate(user);
        user.last_active = Utc::now();
        Ok(())
    }
}
