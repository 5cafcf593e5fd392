//! Backend and routing traits

use crate::error::Result;
use crate::traits::SchemaResolver;
use crate::types::{AttributeAssertion, Dn, Operation, ResultReport};
use async_trait::async_trait;
use std::sync::Arc;

/// Storage backend owning one or more naming contexts
///
/// Compare support is a capability: a backend either hands out a
/// [`CompareCapability`] or it does not.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Backend name for logging
    fn name(&self) -> &str;

    /// Naming contexts served by this backend (aliases included)
    fn suffixes(&self) -> &[Dn];

    /// Backend-specific operational restrictions
    fn check_restrictions(&self, op: &Operation) -> Result<()>;

    /// Referral objects on the path to `dn`
    ///
    /// `Err(report)` is a terminal result the caller must send unchanged.
    async fn check_referrals(
        &self,
        op: &Operation,
        dn: &Dn,
    ) -> std::result::Result<(), ResultReport>;

    /// Map a DN under an aliased suffix onto the real suffix
    fn resolve_suffix_alias(&self, dn: &Dn) -> Dn {
        dn.clone()
    }

    /// Compare capability, if the backend supports the operation
    fn compare_capability(&self) -> Option<&dyn CompareCapability> {
        None
    }
}

/// Full compare (entry retrieval, access check, matching) inside a backend
#[async_trait]
pub trait CompareCapability: Send + Sync {
    /// Compare `assertion` against the entry at `dn`
    ///
    /// `raw_dn` is the DN as received, for diagnostics. Stored values are
    /// matched against `schema`, the snapshot the assertion was built with.
    /// The returned report is authoritative.
    async fn compare(
        &self,
        op: &Operation,
        raw_dn: &str,
        dn: &Dn,
        assertion: &AttributeAssertion,
        schema: &dyn SchemaResolver,
    ) -> ResultReport;
}

/// Naming-context router
pub trait BackendRouter: Send + Sync {
    /// Backend whose naming context is the longest suffix of `dn`
    fn select_backend(&self, dn: &Dn) -> Option<Arc<dyn Backend>>;

    /// Referral URLs used when no backend holds a DN
    fn default_referrals(&self) -> &[String];

    /// All naming contexts, for the root entry
    fn naming_contexts(&self) -> Vec<Dn>;
}
