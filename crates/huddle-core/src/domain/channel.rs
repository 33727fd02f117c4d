//! A named group of connections forming a mesh of peer connections.

use super::identity::{ChannelName, ConnectionId};

/// Ordered member list of one channel. Insertion order is join order.
#[derive(Debug, Clone)]
pub struct Channel {
    name: ChannelName,
    members: Vec<ConnectionId>,
}

impl Channel {
    pub fn new(name: ChannelName) -> Self {
        Self {
            name,
            members: Vec::new(),
        }
    }

    pub fn name(&self) -> &ChannelName {
        &self.name
    }

    pub fn members(&self) -> &[ConnectionId] {
        &self.members
    }

    pub fn contains(&self, conn: &ConnectionId) -> bool {
        self.members.contains(conn)
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Append `conn`. Returns false (and changes nothing) if already present.
    pub fn push(&mut self, conn: ConnectionId) -> bool {
        if self.contains(&conn) {
            return false;
        }
        self.members.push(conn);
        true
    }

    /// Remove `conn`, keeping the order of the others. Returns false if absent.
    pub fn remove(&mut self, conn: &ConnectionId) -> bool {
        match self.members.iter().position(|m| m == conn) {
            Some(idx) => {
                self.members.remove(idx);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn members_keep_join_order_without_duplicates() {
        let mut ch = Channel::new("x".into());
        assert!(ch.push("a".into()));
        assert!(ch.push("b".into()));
        assert!(!ch.push("a".into()));
        assert!(ch.push("c".into()));
        assert!(ch.remove(&"b".into()));
        assert!(!ch.remove(&"b".into()));

        let names: Vec<&str> = ch.members().iter().map(|m| m.as_str()).collect();
        assert_eq!(names, ["a", "c"]);
    }
}
