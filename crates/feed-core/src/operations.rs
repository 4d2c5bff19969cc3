//! Data operations merged into HEAD and the context they are applied under.

use serde::{Deserialize, Serialize};

use crate::identifiers::{ContentId, ContinuationToken, SessionId};

/// Content carried by an `UpdateOrAppend` operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Payload {
    /// A renderable stream feature (card, cluster, ...)
    Feature(Vec<u8>),
    /// Immutable blob shared across sessions, kept out of the ordered stream
    SharedState(Vec<u8>),
    /// Cursor for the next page of content
    Token(ContinuationToken),
}

impl Payload {
    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Feature(_) => "feature",
            Self::SharedState(_) => "shared_state",
            Self::Token(_) => "token",
        }
    }
}

/// A single normalized mutation of the content session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataOperation {
    /// Write or overwrite the payload stored under `id`
    UpdateOrAppend {
        /// Target content
        id: ContentId,
        /// New payload
        payload: Payload,
    },
    /// Tombstone `id`
    Remove {
        /// Target content
        id: ContentId,
    },
    /// Remove every known id in `namespace`, or everything when `None`
    ClearAll {
        /// Namespace to clear
        namespace: Option<String>,
    },
}

impl DataOperation {
    /// Build an update-or-append operation.
    pub fn update_or_append(id: impl Into<ContentId>, payload: Payload) -> Self {
        Self::UpdateOrAppend {
            id: id.into(),
            payload,
        }
    }

    /// Build a remove operation.
    pub fn remove(id: impl Into<ContentId>) -> Self {
        Self::Remove { id: id.into() }
    }

    /// Build a clear-all operation spanning every namespace.
    pub fn clear_all() -> Self {
        Self::ClearAll { namespace: None }
    }

    /// Build a clear-all operation limited to one namespace.
    pub fn clear_namespace(namespace: impl Into<String>) -> Self {
        Self::ClearAll {
            namespace: Some(namespace.into()),
        }
    }

    /// Content id targeted by the operation, if any.
    pub fn content_id(&self) -> Option<&ContentId> {
        match self {
            Self::UpdateOrAppend { id, .. } | Self::Remove { id } => Some(id),
            Self::ClearAll { .. } => None,
        }
    }
}

/// Why a batch of operations is being applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MutationOrigin {
    /// Full refresh response
    #[default]
    Refresh,
    /// Next-page response for a session's continuation token
    Pagination,
    /// Local dismiss issued through the action manager
    Dismiss,
    /// Arbitrary host-initiated mutation
    Host,
}

/// Scope for applying a batch: which session originated it and which
/// pagination request it answers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MutationContext {
    /// Originating session, `None` for HEAD-wide updates
    pub session: Option<SessionId>,
    /// Token of the page request this batch answers
    pub continuation_token: Option<ContinuationToken>,
    /// Why the batch is applied
    pub origin: MutationOrigin,
}

impl MutationContext {
    /// Context for a HEAD-wide refresh.
    pub fn refresh() -> Self {
        Self::default()
    }

    /// Context for a refresh requested by one session.
    pub fn for_session(session: SessionId) -> Self {
        Self {
            session: Some(session),
            ..Self::default()
        }
    }

    /// Context for the page response answering `token` on `session`.
    pub fn pagination(session: SessionId, token: ContinuationToken) -> Self {
        Self {
            session: Some(session),
            continuation_token: Some(token),
            origin: MutationOrigin::Pagination,
        }
    }

    /// Replace the origin.
    pub fn with_origin(mut self, origin: MutationOrigin) -> Self {
        self.origin = origin;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_all_has_no_content_id() {
        assert!(DataOperation::clear_all().content_id().is_none());
        assert_eq!(
            DataOperation::remove("card::1").content_id(),
            Some(&ContentId::new("card::1"))
        );
    }

    #[test]
    fn pagination_context_carries_token() {
        let session = SessionId::new_random();
        let ctx = MutationContext::pagination(session, ContinuationToken::new("page-2"));
        assert_eq!(ctx.session, Some(session));
        assert_eq!(ctx.origin, MutationOrigin::Pagination);
        assert_eq!(ctx.continuation_token.unwrap().as_str(), "page-2");
    }
}
