//! Channel registry: the single source of truth for who is in which call.
//!
//! Locking is two-level. A short synchronous lock guards the name → channel
//! map and the reverse membership index; it is never held across an await.
//! Each channel has its own async mutex which callers hold for the whole of a
//! join, leave or relay, including the notification sends, so operations on
//! one channel are serialised while unrelated channels run in parallel.
//!
//! A channel whose last member leaves is removed from the map and marked
//! retired under both locks. Anyone who was queued on the retired channel's
//! mutex sees the flag and looks the name up again.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::debug;

use crate::domain::channel::Channel;
use crate::domain::error::HubError;
use crate::domain::identity::{ChannelName, ConnectionId};

// ---------------------------------------------------------------------------
// Internal state
// ---------------------------------------------------------------------------

struct Slot {
    channel: Channel,
    retired: bool,
}

type SlotHandle = Arc<AsyncMutex<Slot>>;

#[derive(Default)]
struct Index {
    channels: HashMap<ChannelName, SlotHandle>,
    memberships: HashMap<ConnectionId, BTreeSet<ChannelName>>,
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Thread-safe mapping from channel name to ordered member list.
#[derive(Default)]
pub struct ChannelRegistry {
    index: Mutex<Index>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the live channel called `name`, creating an empty one if needed.
    ///
    /// The returned guard must gain a member before it is dropped, otherwise
    /// the empty channel is discarded again.
    pub async fn ensure_channel(&self, name: &ChannelName) -> ChannelGuard<'_> {
        loop {
            let handle = {
                let mut index = self.index.lock();
                Arc::clone(index.channels.entry(name.clone()).or_insert_with(|| {
                    debug!(channel = %name, "Creating channel");
                    Arc::new(AsyncMutex::new(Slot {
                        channel: Channel::new(name.clone()),
                        retired: false,
                    }))
                }))
            };

            let slot = Arc::clone(&handle).lock_owned().await;
            if !slot.retired {
                return ChannelGuard {
                    registry: self,
                    handle,
                    slot,
                };
            }
        }
    }

    /// Lock the live channel called `name`, if there is one.
    pub async fn open(&self, name: &ChannelName) -> Option<ChannelGuard<'_>> {
        loop {
            let handle = Arc::clone(self.index.lock().channels.get(name)?);
            let slot = Arc::clone(&handle).lock_owned().await;
            if !slot.retired {
                return Some(ChannelGuard {
                    registry: self,
                    handle,
                    slot,
                });
            }
        }
    }

    /// Append `conn` to `name`, creating the channel on first use.
    pub async fn add_member(&self, name: &ChannelName, conn: &ConnectionId) -> Result<(), HubError> {
        self.ensure_channel(name).await.add(conn)
    }

    /// Remove `conn` from `name` and return who is left. The channel is
    /// deleted when nobody is.
    pub async fn remove_member(
        &self,
        name: &ChannelName,
        conn: &ConnectionId,
    ) -> Result<Vec<ConnectionId>, HubError> {
        let mut guard = self
            .open(name)
            .await
            .ok_or_else(|| HubError::ChannelNotFound(name.clone()))?;
        guard.remove(conn)
    }

    /// Members of `name` in join order.
    pub async fn members_of(&self, name: &ChannelName) -> Result<Vec<ConnectionId>, HubError> {
        self.open(name)
            .await
            .map(|guard| guard.members().to_vec())
            .ok_or_else(|| HubError::ChannelNotFound(name.clone()))
    }

    /// Snapshot of every channel `conn` currently belongs to.
    pub fn channels_containing(&self, conn: &ConnectionId) -> Vec<ChannelName> {
        self.index
            .lock()
            .memberships
            .get(conn)
            .map(|names| names.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn channel_count(&self) -> usize {
        self.index.lock().channels.len()
    }

    pub fn channel_names(&self) -> Vec<ChannelName> {
        let mut names: Vec<ChannelName> = self.index.lock().channels.keys().cloned().collect();
        names.sort();
        names
    }
}

// ---------------------------------------------------------------------------
// Locked channel
// ---------------------------------------------------------------------------

/// Exclusive access to one live channel.
pub struct ChannelGuard<'a> {
    registry: &'a ChannelRegistry,
    handle: SlotHandle,
    slot: OwnedMutexGuard<Slot>,
}

impl ChannelGuard<'_> {
    pub fn name(&self) -> &ChannelName {
        self.slot.channel.name()
    }

    pub fn members(&self) -> &[ConnectionId] {
        self.slot.channel.members()
    }

    pub fn contains(&self, conn: &ConnectionId) -> bool {
        self.slot.channel.contains(conn)
    }

    pub fn add(&mut self, conn: &ConnectionId) -> Result<(), HubError> {
        if !self.slot.channel.push(conn.clone()) {
            return Err(HubError::AlreadyAMember {
                channel: self.name().clone(),
                connection: conn.clone(),
            });
        }
        let name = self.name().clone();
        self.registry
            .index
            .lock()
            .memberships
            .entry(conn.clone())
            .or_default()
            .insert(name);
        Ok(())
    }

    /// Remove `conn`; returns the remaining members. Retires the channel when
    /// it becomes empty.
    pub fn remove(&mut self, conn: &ConnectionId) -> Result<Vec<ConnectionId>, HubError> {
        if !self.slot.channel.remove(conn) {
            return Err(HubError::NotAMember {
                channel: self.name().clone(),
                connection: conn.clone(),
            });
        }
        {
            let mut index = self.registry.index.lock();
            if let Some(names) = index.memberships.get_mut(conn) {
                names.remove(self.slot.channel.name());
                if names.is_empty() {
                    index.memberships.remove(conn);
                }
            }
        }
        self.retire_if_empty();
        Ok(self.members().to_vec())
    }

    fn retire_if_empty(&mut self) {
        if self.slot.retired || !self.slot.channel.is_empty() {
            return;
        }
        let name = self.slot.channel.name().clone();
        let mut index = self.registry.index.lock();
        if index
            .channels
            .get(&name)
            .is_some_and(|current| Arc::ptr_eq(current, &self.handle))
        {
            index.channels.remove(&name);
        }
        self.slot.retired = true;
        debug!(channel = %name, "Channel removed");
    }
}

impl Drop for ChannelGuard<'_> {
    fn drop(&mut self) {
        self.retire_if_empty();
    }
}
