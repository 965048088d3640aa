//! Cart store models.

use std::fmt;

use trolley::{cart::MergeReport, items::LineItem, pricing::Totals, receipt::Receipt};

use crate::{auth::Identity, persistence::ScopeKey};

/// Whose cart the store is showing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CartContext {
    #[default]
    Guest,
    User(Identity),
}

impl CartContext {
    /// Storage scope of this context's own cart.
    #[must_use]
    pub fn scope(&self) -> ScopeKey {
        match self {
            Self::Guest => ScopeKey::Guest,
            Self::User(identity) => ScopeKey::User(identity.uuid),
        }
    }

    #[must_use]
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Self::Guest => None,
            Self::User(identity) => Some(identity),
        }
    }
}

impl From<Option<Identity>> for CartContext {
    fn from(identity: Option<Identity>) -> Self {
        identity.map_or(Self::Guest, Self::User)
    }
}

impl fmt::Display for CartContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Guest => f.write_str("guest"),
            Self::User(identity) => write!(f, "user {}", identity.email),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Unloaded,
    Loading,
    Ready,
}

/// Point-in-time copy of the store, handed to display code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartSnapshot {
    pub phase: Phase,
    pub context: CartContext,
    pub items: Vec<LineItem>,
    pub totals: Totals,
}

impl CartSnapshot {
    pub(crate) fn unloaded() -> Self {
        Self {
            phase: Phase::Unloaded,
            context: CartContext::Guest,
            items: Vec::new(),
            totals: Totals::from_items(&[]),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn receipt(&self) -> Receipt<'_> {
        Receipt::new(&self.items)
    }
}

/// How far a mutation's save got.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persistence {
    /// Written to the scope of the current context.
    Saved,

    /// The user scope could not be written; a copy was kept on this device instead.
    Degraded,

    /// Nothing could be written. The in-memory cart is the only copy.
    Unsaved,
}

impl Persistence {
    #[must_use]
    pub fn is_saved(self) -> bool {
        matches!(self, Self::Saved)
    }
}

/// Result of an operation that may turn out to be a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    Applied(Persistence),
    Unchanged,
}

impl Mutation {
    #[must_use]
    pub fn is_applied(self) -> bool {
        matches!(self, Self::Applied(_))
    }
}

/// Result of merging the guest cart into the user's cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub report: MergeReport,
    pub mutation: Mutation,

    /// Whether the guest scope holds no lines afterwards
    pub guest_cleared: bool,
}

/// What the checkout flow receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSummary {
    pub identity: Identity,
    pub items: Vec<LineItem>,
    pub totals: Totals,
}
