//! Replica pinning and session-key partitioning.

use std::fmt;

use super::ConnectionSettings;

/// Sticky cookie name used by CCv2 load balancers.
pub const CCV2_ROUTE_COOKIE_NAME: &str = "ROUTE";

/// Identifies one backend node behind a load balancer.
///
/// The cookie name/value pair pins every request of a session to that node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReplicaContext {
    replica_id: String,
    cookie_name: String,
    cookie_value: String,
}

impl ReplicaContext {
    /// Creates a replica pinned by `cookie_name=<replica_id>`.
    #[must_use]
    pub fn new(replica_id: impl Into<String>, cookie_name: impl Into<String>) -> Self {
        let replica_id = replica_id.into();
        Self {
            cookie_value: replica_id.clone(),
            replica_id,
            cookie_name: cookie_name.into(),
        }
    }

    /// Creates a CCv2 replica pinned by `ROUTE=.<replica_id>`.
    #[must_use]
    pub fn ccv2(replica_id: impl Into<String>) -> Self {
        let replica_id = replica_id.into();
        Self {
            cookie_value: format!(".{replica_id}"),
            replica_id,
            cookie_name: CCV2_ROUTE_COOKIE_NAME.to_string(),
        }
    }

    /// Overrides the pinning cookie value.
    #[must_use]
    pub fn with_cookie_value(mut self, value: impl Into<String>) -> Self {
        self.cookie_value = value.into();
        self
    }

    #[must_use]
    pub fn replica_id(&self) -> &str {
        &self.replica_id
    }

    #[must_use]
    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    #[must_use]
    pub fn cookie_value(&self) -> &str {
        &self.cookie_value
    }
}

/// Cookie-store partition key: `<connection id>_<replica id | auto>`.
///
/// Two requests with the same connection and same replica (or both without
/// one) share one cookie set; different replicas never do.
///
/// A replica whose id is literally `auto` maps to the same key as no replica.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionKey(String);

impl SessionKey {
    #[must_use]
    pub fn new(settings: &ConnectionSettings, replica: Option<&ReplicaContext>) -> Self {
        let replica_part = replica.map_or("auto", ReplicaContext::replica_id);
        Self(format!("{}_{replica_part}", settings.id()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How console actions pick the replicas they run against.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ReplicaSelection {
    /// Whatever node the load balancer routes to.
    #[default]
    Auto,
    /// An explicit list of pinned replicas.
    Manual(Vec<ReplicaContext>),
}

/// Replica selection for one console action.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConnectionContext {
    selection: ReplicaSelection,
}

impl ConnectionContext {
    #[must_use]
    pub fn auto() -> Self {
        Self::default()
    }

    /// Pins actions to the given replicas. An empty list behaves like [`auto`](Self::auto).
    #[must_use]
    pub fn manual(replicas: Vec<ReplicaContext>) -> Self {
        if replicas.is_empty() {
            return Self::auto();
        }
        Self {
            selection: ReplicaSelection::Manual(replicas),
        }
    }

    #[must_use]
    pub fn selection(&self) -> &ReplicaSelection {
        &self.selection
    }

    /// Targets an action fans out to; `[None]` means a single unpinned request.
    #[must_use]
    pub fn targets(&self) -> Vec<Option<ReplicaContext>> {
        match &self.selection {
            ReplicaSelection::Auto => vec![None],
            ReplicaSelection::Manual(replicas) => replicas.iter().cloned().map(Some).collect(),
        }
    }

    /// Multi-line description of the configured replicas, if any.
    #[must_use]
    pub fn description(&self) -> Option<String> {
        let ReplicaSelection::Manual(replicas) = &self.selection else {
            return None;
        };
        let mut counts: Vec<(&str, usize)> = Vec::new();
        for replica in replicas {
            match counts.iter_mut().find(|(name, _)| *name == replica.cookie_name()) {
                Some((_, count)) => *count += 1,
                None => counts.push((replica.cookie_name(), 1)),
            }
        }
        let mut lines = vec!["- Manually configured replica(s) -".to_string()];
        lines.extend(
            counts
                .into_iter()
                .map(|(name, count)| format!("Cookie: {name} ({count} replica(s))")),
        );
        Some(lines.join("\n"))
    }
}

impl fmt::Display for ConnectionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.selection {
            ReplicaSelection::Auto => f.write_str("Auto-discover replica"),
            ReplicaSelection::Manual(_) => f.write_str("Manual"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> ConnectionSettings {
        ConnectionSettings::new("https://localhost:9002/hac", "admin", "nimda").with_id("conn-1")
    }

    #[test]
    fn test_session_key_without_replica_uses_auto() {
        assert_eq!(SessionKey::new(&settings(), None).as_str(), "conn-1_auto");
    }

    #[test]
    fn test_session_key_replica_named_auto_shares_unpinned_key() {
        let replica = ReplicaContext::ccv2("auto");
        assert_eq!(
            SessionKey::new(&settings(), Some(&replica)),
            SessionKey::new(&settings(), None)
        );
    }

    #[test]
    fn test_session_key_with_replica_uses_replica_id() {
        let replica = ReplicaContext::new("node-a", "ROUTE");
        assert_eq!(
            SessionKey::new(&settings(), Some(&replica)).to_string(),
            "conn-1_node-a"
        );
    }

    #[test]
    fn test_session_key_distinct_per_replica() {
        let a = ReplicaContext::new("node-a", "ROUTE");
        let b = ReplicaContext::new("node-b", "ROUTE");
        assert_ne!(
            SessionKey::new(&settings(), Some(&a)),
            SessionKey::new(&settings(), Some(&b))
        );
        assert_eq!(
            SessionKey::new(&settings(), Some(&a)),
            SessionKey::new(&settings(), Some(&a.clone()))
        );
    }

    #[test]
    fn test_ccv2_replica_uses_route_cookie() {
        let replica = ReplicaContext::ccv2("backoffice-0");
        assert_eq!(replica.cookie_name(), "ROUTE");
        assert_eq!(replica.cookie_value(), ".backoffice-0");
        assert_eq!(replica.replica_id(), "backoffice-0");
    }

    #[test]
    fn test_connection_context_targets() {
        assert_eq!(ConnectionContext::auto().targets(), vec![None]);
        assert_eq!(ConnectionContext::manual(Vec::new()), ConnectionContext::auto());

        let replicas = vec![
            ReplicaContext::new("a", "ROUTE"),
            ReplicaContext::new("b", "ROUTE"),
        ];
        let context = ConnectionContext::manual(replicas.clone());
        assert_eq!(
            context.targets(),
            replicas.into_iter().map(Some).collect::<Vec<_>>()
        );
        assert_eq!(context.to_string(), "Manual");
    }

    #[test]
    fn test_connection_context_description_groups_by_cookie() {
        let context = ConnectionContext::manual(vec![
            ReplicaContext::new("a", "ROUTE"),
            ReplicaContext::new("b", "ROUTE"),
            ReplicaContext::new("c", "NODE"),
        ]);
        assert_eq!(
            context.description().as_deref(),
            Some("- Manually configured replica(s) -\nCookie: ROUTE (2 replica(s))\nCookie: NODE (1 replica(s))")
        );
        assert_eq!(ConnectionContext::auto().description(), None);
    }
}
