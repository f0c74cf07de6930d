//! Deletion targets
//!
//! Which peers must hear about the deletion of an attribute, and with which
//! item, follows from the attribute variant alone:
//!
//! | Variant | Direct peer | Forwarding peers |
//! |---|---|---|
//! | own identity | none | `AttributeDeletedByOwner` |
//! | own relationship | `AttributeDeletedByOwner` | `AttributeDeletedByOwner` |
//! | peer relationship | `AttributeDeletedByPeer` | `AttributeDeletedByPeer` |
//! | peer identity, third-party | `ForwardedAttributeDeletedByPeer` | none |
//!
//! Direct peers always come first.
//!
//! Deleting an attribute also deletes its predecessors, so a deletion must
//! reach the holders of every version in the lineage. Each holder is told
//! once, about the newest version they hold.

use crate::attributes::LocalAttribute;
use crate::notifications::NotificationItem;
use std::collections::HashSet;
use tessera_core::Address;

/// One peer to tell about a deletion
#[derive(Debug, Clone, PartialEq)]
pub struct DeletionTarget {
    /// Recipient
    pub peer: Address,
    /// Item to send
    pub item: NotificationItem,
    /// Whether the recipient's copy is already gone
    pub copy_deleted: bool,
    /// Whether the recipient is the peer in the sharing info rather than a
    /// forwarding recipient
    pub direct: bool,
}

/// Peers that must hear about deleting `attribute`, direct peer first
pub fn deletion_targets(attribute: &LocalAttribute) -> Vec<DeletionTarget> {
    let attribute_id = attribute.id();
    let (direct_item, forwarded_item) = match attribute {
        LocalAttribute::OwnIdentity(_) => (
            None,
            Some(NotificationItem::AttributeDeletedByOwner { attribute_id }),
        ),
        LocalAttribute::OwnRelationship(_) => (
            Some(NotificationItem::AttributeDeletedByOwner { attribute_id }),
            Some(NotificationItem::AttributeDeletedByOwner { attribute_id }),
        ),
        LocalAttribute::PeerRelationship(_) => (
            Some(NotificationItem::AttributeDeletedByPeer { attribute_id }),
            Some(NotificationItem::AttributeDeletedByPeer { attribute_id }),
        ),
        LocalAttribute::PeerIdentity(_) | LocalAttribute::ThirdPartyRelationship(_) => (
            Some(NotificationItem::ForwardedAttributeDeletedByPeer { attribute_id }),
            None,
        ),
    };

    let mut targets = Vec::new();
    if let (Some(item), Some(peer)) = (direct_item, attribute.peer()) {
        targets.push(DeletionTarget {
            peer: peer.clone(),
            item,
            copy_deleted: attribute.counterpart_deleted(),
            direct: true,
        });
    }
    if let Some(item) = forwarded_item {
        targets.extend(attribute.forwarding_peers().iter().map(|details| DeletionTarget {
            peer: details.peer().clone(),
            item: item.clone(),
            copy_deleted: details.counterpart_deleted(),
            direct: false,
        }));
    }
    targets
}

/// Peers that must hear about deleting a lineage, given newest first
///
/// A peer named by several versions keeps the target of the newest one.
/// Direct peers come before forwarding recipients.
pub fn lineage_deletion_targets<'a, I>(versions: I) -> Vec<DeletionTarget>
where
    I: IntoIterator<Item = &'a LocalAttribute>,
{
    let mut seen = HashSet::new();
    let mut targets: Vec<DeletionTarget> = versions
        .into_iter()
        .flat_map(deletion_targets)
        .filter(|target| seen.insert(target.peer.clone()))
        .collect();
    // Stable, so each group keeps lineage order.
    targets.sort_by_key(|target| !target.direct);
    targets
}
