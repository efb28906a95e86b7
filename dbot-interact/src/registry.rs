//! Action registry: a bounded arena of actions addressed by opaque random tokens.
//!
//! Slots are keyed by a generation-tagged index ([`ActionKey`]); a reused slot bumps its
//! generation so stale keys stop resolving. When the arena is full the least-recently-created
//! action is evicted (or registration fails when eviction is disabled).

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use rand::Rng;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::action::Action;
use crate::error::RegistryError;

const TOKEN_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Re-rolls on collision at most this many times. With 62^26 possible tokens a second roll is
/// already unheard of.
const MAX_TOKEN_ATTEMPTS: usize = 8;

pub const DEFAULT_TOKEN_LENGTH: usize = 26;
pub const DEFAULT_CAPACITY: usize = 10_000;

/// Generates a random `[A-Za-z0-9]` token from the thread-local CSPRNG.
pub fn generate_token(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| {
            let idx = rng.gen_range(0..TOKEN_CHARSET.len());
            TOKEN_CHARSET[idx] as char
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub token_length: usize,
    pub capacity: usize,
    /// Evict the oldest action when full instead of failing.
    pub evict_oldest: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            token_length: DEFAULT_TOKEN_LENGTH,
            capacity: DEFAULT_CAPACITY,
            evict_oldest: true,
        }
    }
}

/// Generation-tagged arena index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActionKey {
    index: u32,
    generation: u32,
}

/// Result of a successful token lookup.
#[derive(Debug, Clone)]
pub struct ResolvedAction {
    pub key: ActionKey,
    pub action: Arc<Action>,
    /// The token is the confirmation leg of the action, not its primary trigger.
    pub is_confirmation: bool,
}

struct Entry {
    token: String,
    action: Arc<Action>,
    is_confirmation: bool,
}

struct Slot {
    generation: u32,
    entry: Option<Entry>,
}

#[derive(Default)]
struct Arena {
    slots: Vec<Slot>,
    free: Vec<u32>,
    by_token: HashMap<String, ActionKey>,
    order: VecDeque<ActionKey>,
}

impl Arena {
    fn len(&self) -> usize {
        self.by_token.len()
    }

    fn get(&self, key: ActionKey) -> Option<&Entry> {
        self.slots
            .get(key.index as usize)
            .filter(|slot| slot.generation == key.generation)
            .and_then(|slot| slot.entry.as_ref())
    }

    fn insert(&mut self, entry: Entry) -> ActionKey {
        let key = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.entry = Some(entry);
                ActionKey {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    entry: Some(entry),
                });
                ActionKey {
                    index,
                    generation: 0,
                }
            }
        };
        if let Some(entry) = self.get(key) {
            self.by_token.insert(entry.token.clone(), key);
        }
        self.order.push_back(key);
        key
    }

    fn remove(&mut self, key: ActionKey) -> Option<Entry> {
        let slot = self.slots.get_mut(key.index as usize)?;
        if slot.generation != key.generation {
            return None;
        }
        let entry = slot.entry.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(key.index);
        self.by_token.remove(&entry.token);
        Some(entry)
    }

    /// Removes the least-recently-created live entry.
    fn evict_oldest(&mut self) -> Option<Entry> {
        while let Some(key) = self.order.pop_front() {
            if let Some(entry) = self.remove(key) {
                return Some(entry);
            }
        }
        None
    }
}

/// Owns every registered [`Action`]. Lookups of unknown tokens return `None`, never an error.
pub struct ActionRegistry {
    config: RegistryConfig,
    arena: Mutex<Arena>,
    /// Posted message (`chat_id:message_id`) to the action its reactions trigger.
    reactions: Mutex<HashMap<String, ActionKey>>,
}

fn message_key(chat_id: i64, message_id: &str) -> String {
    format!("{}:{}", chat_id, message_id)
}

impl ActionRegistry {
    pub fn new(config: RegistryConfig) -> Self {
        let config = RegistryConfig {
            capacity: config.capacity.max(1),
            ..config
        };
        Self {
            config,
            arena: Mutex::new(Arena::default()),
            reactions: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    pub async fn len(&self) -> usize {
        self.arena.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Stores the action under a fresh token and returns the token.
    pub async fn register(&self, action: Arc<Action>) -> Result<String, RegistryError> {
        Ok(self.insert(action, false).await?.0)
    }

    /// Stores a second token for `action` that triggers its confirmation leg.
    pub async fn register_confirmation(&self, action: Arc<Action>) -> Result<String, RegistryError> {
        Ok(self.insert(action, true).await?.0)
    }

    /// Stores an action triggered by reactions rather than a button; bind it to messages with
    /// [`bind_reaction`](Self::bind_reaction).
    pub async fn register_for_reactions(&self, action: Arc<Action>) -> Result<ActionKey, RegistryError> {
        Ok(self.insert(action, false).await?.1)
    }

    /// Binds a posted message to an action. Bindings whose action was evicted are pruned once the
    /// map reaches the registry capacity.
    pub async fn bind_reaction(&self, chat_id: i64, message_id: &str, key: ActionKey) {
        let mut reactions = self.reactions.lock().await;
        if reactions.len() >= self.config.capacity {
            let arena = self.arena.lock().await;
            reactions.retain(|_, bound| arena.get(*bound).is_some());
        }
        reactions.insert(message_key(chat_id, message_id), key);
    }

    /// Token and action bound to the message, if the action is still registered.
    pub async fn reaction_action(&self, chat_id: i64, message_id: &str) -> Option<(String, Arc<Action>)> {
        let message = message_key(chat_id, message_id);
        let key = *self.reactions.lock().await.get(&message)?;
        let bound = self
            .arena
            .lock()
            .await
            .get(key)
            .map(|entry| (entry.token.clone(), entry.action.clone()));
        if bound.is_none() {
            self.reactions.lock().await.remove(&message);
        }
        bound
    }

    pub async fn resolve(&self, token: &str) -> Option<ResolvedAction> {
        let arena = self.arena.lock().await;
        let key = *arena.by_token.get(token)?;
        arena.get(key).map(|entry| ResolvedAction {
            key,
            action: entry.action.clone(),
            is_confirmation: entry.is_confirmation,
        })
    }

    /// Generation-checked lookup by key.
    pub async fn get(&self, key: ActionKey) -> Option<Arc<Action>> {
        self.arena
            .lock()
            .await
            .get(key)
            .map(|entry| entry.action.clone())
    }

    async fn insert(
        &self,
        action: Arc<Action>,
        is_confirmation: bool,
    ) -> Result<(String, ActionKey), RegistryError> {
        let mut arena = self.arena.lock().await;

        if arena.len() >= self.config.capacity {
            if !self.config.evict_oldest {
                return Err(RegistryError::Full {
                    capacity: self.config.capacity,
                });
            }
            if let Some(evicted) = arena.evict_oldest() {
                info!(
                    action = %evicted.action.description(),
                    capacity = self.config.capacity,
                    "Registry full, evicted oldest action"
                );
            }
        }

        let token = self.unique_token(&arena)?;
        let key = arena.insert(Entry {
            token: token.clone(),
            action,
            is_confirmation,
        });
        debug!(index = key.index, generation = key.generation, is_confirmation, "Action registered");
        Ok((token, key))
    }

    fn unique_token(&self, arena: &Arena) -> Result<String, RegistryError> {
        for _ in 0..MAX_TOKEN_ATTEMPTS {
            let token = generate_token(self.config.token_length);
            if !arena.by_token.contains_key(&token) {
                return Ok(token);
            }
        }
        Err(RegistryError::TokenSpaceExhausted {
            attempts: MAX_TOKEN_ATTEMPTS,
        })
    }
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::new(RegistryConfig::default())
    }
}
