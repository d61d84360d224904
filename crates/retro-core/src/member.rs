//! Room membership, kept in join order.
//!
//! Usernames are the membership key and the display identity. The join
//! order is what makes owner succession deterministic: when the owner
//! leaves, the earliest-joined remaining member takes over.

use std::fmt;

/// Identifier for a connected client session.
///
/// Assigned by the connection layer and unique over the lifetime of the
/// process. Two connections with the same username have different
/// session ids, which is how a replaced connection is told apart from its
/// successor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A room's view of a connected client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub username: String,
    pub session: SessionId,
}

/// Join-ordered member list.
#[derive(Debug, Clone, Default)]
pub struct Members {
    members: Vec<Member>,
}

impl Members {
    pub fn new() -> Self {
        Members::default()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Iterate members, earliest join first.
    pub fn iter(&self) -> impl Iterator<Item = &Member> {
        self.members.iter()
    }

    /// Look up the member currently bound to `session`.
    pub fn by_session(&self, session: SessionId) -> Option<&Member> {
        self.members.iter().find(|m| m.session == session)
    }

    /// Look up the member currently using `username`.
    pub fn by_username(&self, username: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.username == username)
    }

    pub fn contains_username(&self, username: &str) -> bool {
        self.by_username(username).is_some()
    }

    /// Append a new member at the end of the join order.
    pub fn push(&mut self, username: impl Into<String>, session: SessionId) {
        self.members.push(Member {
            username: username.into(),
            session,
        });
    }

    /// Rebind `username` to a new session, keeping its join position.
    ///
    /// Returns the session that was replaced.
    pub fn rebind(&mut self, username: &str, session: SessionId) -> Option<SessionId> {
        let member = self.members.iter_mut().find(|m| m.username == username)?;
        Some(std::mem::replace(&mut member.session, session))
    }

    /// Remove the member bound to `session`.
    pub fn remove_session(&mut self, session: SessionId) -> Option<Member> {
        let index = self.members.iter().position(|m| m.session == session)?;
        Some(self.members.remove(index))
    }

    /// Earliest-joined member, if any.
    pub fn first(&self) -> Option<&Member> {
        self.members.first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_join_order_across_removals() {
        let mut members = Members::new();
        members.push("a", SessionId(1));
        members.push("b", SessionId(2));
        members.push("c", SessionId(3));

        members.remove_session(SessionId(1));
        assert_eq!(members.first().map(|m| m.username.as_str()), Some("b"));

        let order: Vec<_> = members.iter().map(|m| m.username.as_str()).collect();
        assert_eq!(order, vec!["b", "c"]);
    }

    #[test]
    fn rebind_keeps_position_and_returns_old_session() {
        let mut members = Members::new();
        members.push("a", SessionId(1));
        members.push("b", SessionId(2));

        assert_eq!(members.rebind("a", SessionId(9)), Some(SessionId(1)));
        assert_eq!(members.first().map(|m| m.session), Some(SessionId(9)));
        assert!(members.by_session(SessionId(1)).is_none());
        assert_eq!(members.rebind("nobody", SessionId(10)), None);
    }
}
