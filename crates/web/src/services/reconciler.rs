//! Address reconciliation.
//!
//! A submitted address is matched against the addresses already owned by the
//! contact being saved. Two addresses are the same when street, city, state
//! and postal code are all equal (exact, case-sensitive comparison of the
//! trimmed values).

use contact_manager_core::{AddressId, PostalAddress};

use crate::models::Address;

/// Outcome of reconciling one candidate address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// An identical address is already stored; keep using it.
    Reuse(AddressId),
    /// No match in scope; a new row is needed.
    CreateNew,
}

/// Reconcile a candidate against the addresses in scope.
#[must_use]
pub fn reconcile(candidate: &PostalAddress, scope: &[Address]) -> Resolution {
    scope
        .iter()
        .find(|stored| stored.postal == *candidate)
        .map_or(Resolution::CreateNew, |stored| Resolution::Reuse(stored.id))
}

/// What to write for a batch of submitted addresses.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InsertPlan {
    /// Addresses to insert, in submission order, without repeats.
    pub inserts: Vec<PostalAddress>,
    /// Stored addresses that matched a candidate.
    pub reused: Vec<AddressId>,
}

/// Plan a batch of candidates against `scope`.
///
/// Candidates already planned for insertion count as part of the scope for
/// the ones after them, so a batch repeating an address inserts it once.
#[must_use]
pub fn plan_inserts<I>(candidates: I, scope: &[Address]) -> InsertPlan
where
    I: IntoIterator<Item = PostalAddress>,
{
    let mut plan = InsertPlan::default();

    for candidate in candidates {
        match reconcile(&candidate, scope) {
            Resolution::Reuse(id) => {
                if !plan.reused.contains(&id) {
                    plan.reused.push(id);
                }
            }
            Resolution::CreateNew => {
                if !plan.inserts.contains(&candidate) {
                    plan.inserts.push(candidate);
                }
            }
        }
    }

    plan
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use contact_manager_core::ContactId;

    use super::*;

    fn postal(street: &str) -> PostalAddress {
        PostalAddress::parse(street, "Anytown", "AN", "12345").unwrap()
    }

    fn stored(id: i32, street: &str) -> Address {
        Address {
            id: AddressId::new(id),
            contact_id: ContactId::new(1),
            postal: postal(street),
        }
    }

    #[test]
    fn test_reconcile_reuses_identical_address() {
        let scope = [stored(1, "123 Main St"), stored(2, "789 Pine St")];
        assert_eq!(
            reconcile(&postal("789 Pine St"), &scope),
            Resolution::Reuse(AddressId::new(2))
        );
    }

    #[test]
    fn test_reconcile_empty_scope_creates() {
        assert_eq!(reconcile(&postal("123 Main St"), &[]), Resolution::CreateNew);
    }

    #[test]
    fn test_reconcile_requires_all_fields_equal() {
        let scope = [stored(1, "123 Main St")];
        let other_postal_code =
            PostalAddress::parse("123 Main St", "Anytown", "AN", "99999").unwrap();
        assert_eq!(reconcile(&other_postal_code, &scope), Resolution::CreateNew);
    }

    #[test]
    fn test_reconcile_is_case_sensitive() {
        let scope = [stored(1, "123 Main St")];
        assert_eq!(reconcile(&postal("123 MAIN ST"), &scope), Resolution::CreateNew);
    }

    #[test]
    fn test_plan_inserts_collapses_repeats() {
        let plan = plan_inserts([postal("123 Main St"), postal("123 Main St")], &[]);
        assert_eq!(plan.inserts, vec![postal("123 Main St")]);
        assert!(plan.reused.is_empty());
    }

    #[test]
    fn test_plan_inserts_mixes_reuse_and_create() {
        let scope = [stored(7, "123 Main St")];
        let plan = plan_inserts(
            [postal("123 Main St"), postal("456 Oak St"), postal("123 Main St")],
            &scope,
        );
        assert_eq!(plan.inserts, vec![postal("456 Oak St")]);
        assert_eq!(plan.reused, vec![AddressId::new(7)]);
    }
}
