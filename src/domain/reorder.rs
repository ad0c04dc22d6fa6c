//! Validation of explicit document reorders.
//!
//! A reorder replaces the whole ordering of one owner's documents. It is
//! checked against the owner's current member set and compiled into a batch
//! of position updates, one per document.

use crate::domain::document::{DocumentId, OwnerId};
use crate::domain::error::{CollectionError, ReorderConflict, ValidationFailure};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A requested total order over one owner's documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReorderRequest {
    pub owner_id: OwnerId,
    pub ordered_ids: Vec<DocumentId>,
}

/// New position for one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionUpdate {
    pub id: DocumentId,
    pub position: i64,
}

/// A validated reorder, ready to commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReorderPlan {
    updates: Vec<PositionUpdate>,
}

impl ReorderPlan {
    /// Position updates in list order.
    pub fn updates(&self) -> &[PositionUpdate] {
        &self.updates
    }

    /// Ids covered by the plan, in their new order.
    pub fn ids(&self) -> impl Iterator<Item = DocumentId> + '_ {
        self.updates.iter().map(|update| update.id)
    }

    pub fn len(&self) -> usize {
        self.updates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }
}

/// Check the shape of the list on its own: non-empty, no duplicates.
///
/// This runs before the store is consulted.
pub fn check_order(ordered_ids: &[DocumentId]) -> Result<(), ValidationFailure> {
    if ordered_ids.is_empty() {
        return Err(ValidationFailure::EmptyOrder);
    }

    let mut seen = HashSet::with_capacity(ordered_ids.len());
    for id in ordered_ids {
        if !seen.insert(*id) {
            return Err(ValidationFailure::DuplicateId(*id));
        }
    }
    Ok(())
}

/// Validate a reorder against the owner's current documents and compile it.
///
/// Checks run in order and stop at the first failure:
/// 1. the list is non-empty,
/// 2. the list has no duplicates,
/// 3. the list has as many ids as the owner has documents,
/// 4. every listed id belongs to the owner.
pub fn plan_reorder(
    ordered_ids: &[DocumentId],
    members: &[DocumentId],
) -> Result<ReorderPlan, CollectionError> {
    check_order(ordered_ids)?;

    let requested: HashSet<DocumentId> = ordered_ids.iter().copied().collect();
    if ordered_ids.len() != members.len() {
        let missing = members
            .iter()
            .filter(|id| !requested.contains(id))
            .copied()
            .collect();
        return Err(ReorderConflict::CountMismatch {
            expected: members.len(),
            actual: ordered_ids.len(),
            missing,
        }
        .into());
    }

    let owned: HashSet<DocumentId> = members.iter().copied().collect();
    let unknown: Vec<DocumentId> = ordered_ids
        .iter()
        .filter(|id| !owned.contains(id))
        .copied()
        .collect();
    if !unknown.is_empty() {
        return Err(ReorderConflict::UnknownIds { ids: unknown }.into());
    }

    let updates = ordered_ids
        .iter()
        .enumerate()
        .map(|(index, id)| PositionUpdate {
            id: *id,
            position: index as i64,
        })
        .collect();
    Ok(ReorderPlan { updates })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<DocumentId> {
        (0..n).map(|_| DocumentId::new()).collect()
    }

    #[test]
    fn test_plan_assigns_list_indices() {
        let members = ids(3);
        let order = vec![members[2], members[0], members[1]];

        let plan = plan_reorder(&order, &members).unwrap();
        let positions: Vec<_> = plan.updates().iter().map(|u| (u.id, u.position)).collect();
        assert_eq!(
            positions,
            vec![(members[2], 0), (members[0], 1), (members[1], 2)]
        );
        assert_eq!(plan.ids().collect::<Vec<_>>(), order);
    }

    #[test]
    fn test_empty_order() {
        assert_eq!(
            plan_reorder(&[], &ids(2)),
            Err(CollectionError::Validation(ValidationFailure::EmptyOrder))
        );
    }

    #[test]
    fn test_duplicates_rejected_before_membership() {
        let members = ids(2);
        let order = vec![members[0], members[0], members[1]];
        assert_eq!(
            plan_reorder(&order, &members),
            Err(CollectionError::Validation(ValidationFailure::DuplicateId(
                members[0]
            )))
        );
    }

    #[test]
    fn test_partial_order_reports_missing() {
        let members = ids(3);
        let order = vec![members[0], members[1]];
        assert_eq!(
            plan_reorder(&order, &members),
            Err(CollectionError::Conflict(ReorderConflict::CountMismatch {
                expected: 3,
                actual: 2,
                missing: vec![members[2]],
            }))
        );
    }

    #[test]
    fn test_foreign_id_rejected() {
        let members = ids(2);
        let stranger = DocumentId::new();
        let order = vec![members[0], stranger];
        assert_eq!(
            plan_reorder(&order, &members),
            Err(CollectionError::Conflict(ReorderConflict::UnknownIds {
                ids: vec![stranger]
            }))
        );
    }

    #[test]
    fn test_order_against_empty_collection() {
        let order = ids(1);
        assert!(matches!(
            plan_reorder(&order, &[]),
            Err(CollectionError::Conflict(ReorderConflict::CountMismatch {
                expected: 0,
                actual: 1,
                ..
            }))
        ));
    }
}
