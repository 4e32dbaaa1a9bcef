//! Smoke screen unit tests for pickup coordination components
//!
//! These tests span the codebase, testing behavior in isolation from the
//! end-to-end scenarios. They are intended as smoke-screen coverage and
//! generally test one rule at a time.
//!
#![allow(unused_imports)]

use ewaste_pickup::{
    catalog::{Condition, ItemDraft, ItemKind, ListedItem, TimeStamp},
    collector::EmploymentStatus,
    error::CoreError,
    pickup::{CollectionStage, PickupStatus, Weight},
    roles::{CollectorView, DonorView, OrganizationView},
    service::PickupService,
    utils::new_uuid_to_bech32,
};
use std::sync::Arc;
use tempfile::TempDir;

/// Fresh service over its own temp db. The TempDir must stay alive for the
/// duration of the test, so it is handed back to the caller.
fn open_service(name: &str) -> (TempDir, PickupService) {
    let temp_dir = tempfile::tempdir().unwrap();
    let db = sled::open(temp_dir.path().join(name)).unwrap();
    let service = PickupService::open(Arc::new(db)).unwrap();
    (temp_dir, service)
}

fn draft(name: &str, address: &str) -> ItemDraft {
    ItemDraft::new()
        .set_name(name)
        .set_kind(ItemKind::Appliance)
        .set_condition(Condition::Working)
        .set_dimensions(60, 60, 85)
        .set_quantity(1)
        .set_address(address)
}

// UTILS MODULE TESTS
#[cfg(test)]
mod utils_tests {
    use super::*;

    /// Test that new_uuid_to_bech32 generates valid bech32-encoded strings
    /// with the correct human-readable prefix
    #[test]
    fn generates_valid_bech32_with_hrp() {
        let result = new_uuid_to_bech32("item");
        assert!(result.is_ok());

        let encoded = result.unwrap();
        assert!(encoded.starts_with("item1"));
        assert!(encoded.len() > 10); // UUID should produce substantial output
    }

    /// Test that the function handles empty strings appropriately
    #[test]
    fn handles_empty_hrp() {
        // Empty string should fail
        let result = new_uuid_to_bech32("");
        assert!(result.is_err());
    }

    /// Test that multiple calls generate unique identifiers
    #[test]
    fn generates_unique_ids() {
        let id1 = new_uuid_to_bech32("pickup").unwrap();
        let id2 = new_uuid_to_bech32("pickup").unwrap();
        let id3 = new_uuid_to_bech32("pickup").unwrap();

        assert_ne!(id1, id2);
        assert_ne!(id2, id3);
        assert_ne!(id1, id3);
    }
}

// ITEM CATALOG TESTS
#[cfg(test)]
mod catalog_tests {
    use super::*;

    #[test]
    fn update_while_unassigned_succeeds() {
        let (_dir, service) = open_service("catalog_update.db");
        let item = service.list_item("donor_a", draft("fridge", "9 Oak Rd")).unwrap();

        let updated = service
            .update_item(&item.id, ItemDraft::new().set_quantity(4))
            .unwrap();

        assert_eq!(updated.quantity, 4);
        assert_eq!(updated.id, item.id);
        assert_eq!(updated.address, "9 Oak Rd");
    }

    #[test]
    fn unknown_item_is_not_found() {
        let (_dir, service) = open_service("catalog_missing.db");

        let err = service.delete_item("item_missing").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CoreError>(),
            Some(CoreError::NotFound(_))
        ));
    }

    #[test]
    fn available_items_excludes_consumed_ones() {
        let (_dir, service) = open_service("catalog_available.db");
        let a = service.list_item("donor_a", draft("fridge", "9 Oak Rd")).unwrap();
        let b = service.list_item("donor_a", draft("kettle", "9 Oak Rd")).unwrap();
        let c = service.list_item("donor_a", draft("toaster", "4 Ash St")).unwrap();

        service
            .accept_items("org_a", None, &[a.id.clone(), b.id.clone()])
            .unwrap();

        let available = service.available_items().unwrap();
        assert_eq!(available.len(), 1);
        assert_eq!(available[0].id, c.id);
    }
}

// PICKUP AGGREGATOR TESTS
#[cfg(test)]
mod aggregator_tests {
    use super::*;

    #[test]
    fn one_pickup_per_address_group() {
        let (_dir, service) = open_service("agg_groups.db");
        let a = service.list_item("donor_a", draft("fridge", "9 Oak Rd")).unwrap();
        let b = service.list_item("donor_a", draft("kettle", "9 Oak Rd")).unwrap();
        let c = service.list_item("donor_a", draft("toaster", "4 Ash St")).unwrap();

        let pickups = service
            .accept_items("org_a", None, &[a.id.clone(), b.id.clone(), c.id.clone()])
            .unwrap();

        assert_eq!(pickups.len(), 2);
        assert_eq!(pickups[0].item_ids, vec![a.id, b.id]);
        assert_eq!(pickups[1].item_ids, vec![c.id]);
    }

    #[test]
    fn accepting_twice_is_idempotent() {
        let (_dir, service) = open_service("agg_idempotent.db");
        let a = service.list_item("donor_a", draft("fridge", "9 Oak Rd")).unwrap();

        let first = service.accept_items("org_a", None, &[a.id.clone()]).unwrap();
        let second = service.accept_items("org_a", None, &[a.id.clone()]).unwrap();

        // same pickup, no duplicate member
        assert_eq!(first[0].id, second[0].id);
        assert_eq!(second[0].item_ids, vec![a.id]);
        assert_eq!(service.pickups_by_organization("org_a").unwrap().len(), 1);
    }

    #[test]
    fn later_acceptance_joins_the_open_pickup() {
        let (_dir, service) = open_service("agg_join.db");
        let a = service.list_item("donor_a", draft("fridge", "9 Oak Rd")).unwrap();
        let b = service.list_item("donor_a", draft("kettle", "9 Oak Rd")).unwrap();

        let first = service.accept_items("org_a", None, &[a.id.clone()]).unwrap();
        let second = service.accept_items("org_a", None, &[b.id.clone()]).unwrap();

        assert_eq!(first[0].id, second[0].id);
        assert_eq!(second[0].item_ids, vec![a.id, b.id]);
    }

    #[test]
    fn different_collector_gets_a_separate_pickup() {
        let (_dir, service) = open_service("agg_collector_split.db");
        let col = service.add_collector("org_a", "Sam", "sam@example.org").unwrap();
        let a = service.list_item("donor_a", draft("fridge", "9 Oak Rd")).unwrap();
        let b = service.list_item("donor_a", draft("kettle", "9 Oak Rd")).unwrap();

        let first = service.accept_items("org_a", None, &[a.id.clone()]).unwrap();
        let second = service
            .accept_items("org_a", Some(&col.id), &[b.id.clone()])
            .unwrap();

        assert_ne!(first[0].id, second[0].id);
    }

    #[test]
    fn empty_batch_is_rejected() {
        let (_dir, service) = open_service("agg_empty.db");

        let err = service.accept_items("org_a", None, &[]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CoreError>(),
            Some(CoreError::InvalidSelection(_))
        ));
    }

    #[test]
    fn unknown_id_rejects_the_whole_batch() {
        let (_dir, service) = open_service("agg_unknown.db");
        let a = service.list_item("donor_a", draft("fridge", "9 Oak Rd")).unwrap();

        let err = service
            .accept_items("org_a", None, &[a.id.clone(), "item_bogus".into()])
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CoreError>(),
            Some(CoreError::InvalidSelection(_))
        ));

        // all-or-nothing: nothing was created for the known id either
        assert!(service.pickups_by_organization("org_a").unwrap().is_empty());
        assert_eq!(service.available_items().unwrap().len(), 1);
    }

    #[test]
    fn mixed_donors_reject_the_whole_batch() {
        let (_dir, service) = open_service("agg_mixed.db");
        let a = service.list_item("donor_a", draft("fridge", "9 Oak Rd")).unwrap();
        let b = service.list_item("donor_b", draft("kettle", "9 Oak Rd")).unwrap();

        let err = service
            .accept_items("org_a", None, &[a.id, b.id])
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CoreError>(),
            Some(CoreError::InvalidSelection(_))
        ));
        assert!(service.pickups_by_organization("org_a").unwrap().is_empty());
    }

    #[test]
    fn acceptance_with_unknown_collector_is_rejected() {
        let (_dir, service) = open_service("agg_bogus_collector.db");
        let a = service.list_item("donor_a", draft("fridge", "9 Oak Rd")).unwrap();

        let err = service
            .accept_items("org_a", Some("col_bogus"), &[a.id])
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CoreError>(),
            Some(CoreError::NotFound(_))
        ));
        assert!(service.pickups_by_organization("org_a").unwrap().is_empty());
    }

    #[test]
    fn acceptance_with_terminated_collector_is_rejected() {
        let (_dir, service) = open_service("agg_terminated_collector.db");
        let col = service.add_collector("org_a", "Sam", "sam@example.org").unwrap();
        service.terminate_collector(&col.id).unwrap();
        let a = service.list_item("donor_a", draft("fridge", "9 Oak Rd")).unwrap();

        let err = service
            .accept_items("org_a", Some(&col.id), &[a.id])
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CoreError>(),
            Some(CoreError::Locked(_))
        ));
        assert!(service.pickups_by_organization("org_a").unwrap().is_empty());
    }

    #[test]
    fn acceptance_with_foreign_collector_is_rejected() {
        let (_dir, service) = open_service("agg_foreign_collector.db");
        let col = service.add_collector("org_b", "Sam", "sam@example.org").unwrap();
        let a = service.list_item("donor_a", draft("fridge", "9 Oak Rd")).unwrap();

        let err = service
            .accept_items("org_a", Some(&col.id), &[a.id])
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CoreError>(),
            Some(CoreError::InvalidSelection(_))
        ));
        assert!(service.pickups_by_organization("org_a").unwrap().is_empty());
    }

    #[test]
    fn consumed_item_is_locked_for_other_organizations() {
        let (_dir, service) = open_service("agg_cross_org.db");
        let a = service.list_item("donor_a", draft("fridge", "9 Oak Rd")).unwrap();

        service.accept_items("org_a", None, &[a.id.clone()]).unwrap();

        let err = service.accept_items("org_b", None, &[a.id]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CoreError>(),
            Some(CoreError::Locked(_))
        ));
    }
}

// LIFECYCLE TESTS
#[cfg(test)]
mod lifecycle_tests {
    use super::*;

    #[test]
    fn collector_from_another_organization_cannot_be_assigned() {
        let (_dir, service) = open_service("lc_wrong_org.db");
        let col = service.add_collector("org_b", "Sam", "sam@example.org").unwrap();
        let a = service.list_item("donor_a", draft("fridge", "9 Oak Rd")).unwrap();
        let pickups = service.accept_items("org_a", None, &[a.id]).unwrap();

        let err = service
            .assign_collector(&pickups[0].id, &col.id)
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CoreError>(),
            Some(CoreError::InvalidSelection(_))
        ));
    }

    #[test]
    fn terminated_collector_cannot_be_assigned() {
        let (_dir, service) = open_service("lc_terminated.db");
        let col = service.add_collector("org_a", "Sam", "sam@example.org").unwrap();
        service.terminate_collector(&col.id).unwrap();

        let a = service.list_item("donor_a", draft("fridge", "9 Oak Rd")).unwrap();
        let pickups = service.accept_items("org_a", None, &[a.id]).unwrap();

        let err = service
            .assign_collector(&pickups[0].id, &col.id)
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CoreError>(),
            Some(CoreError::Locked(_))
        ));
    }

    #[test]
    fn unassigned_collector_cannot_report_weight() {
        let (_dir, service) = open_service("lc_not_assigned.db");
        let col = service.add_collector("org_a", "Sam", "sam@example.org").unwrap();
        let a = service.list_item("donor_a", draft("fridge", "9 Oak Rd")).unwrap();
        let pickups = service.accept_items("org_a", None, &[a.id]).unwrap();

        let err = service
            .complete_with_weight(&pickups[0].id, &col.id, Weight::parse_kg("3").unwrap())
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CoreError>(),
            Some(CoreError::Locked(_))
        ));
    }

    #[test]
    fn cancelled_pickup_cannot_be_completed() {
        let (_dir, service) = open_service("lc_finality.db");
        let a = service.list_item("donor_a", draft("fridge", "9 Oak Rd")).unwrap();
        let pickups = service.accept_items("org_a", None, &[a.id]).unwrap();

        service.mark_cancelled(&pickups[0].id).unwrap();

        let err = service.mark_completed(&pickups[0].id).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CoreError>(),
            Some(CoreError::InvalidTransition { .. })
        ));
    }
}

// REWARD LEDGER TESTS
#[cfg(test)]
mod ledger_tests {
    use super::*;

    #[test]
    fn history_is_newest_first() {
        let (_dir, service) = open_service("ledger_history.db");
        service.credit_points("donor_a", 500).unwrap();
        let reward = service.add_reward("tote bag", 100, "merch", 5).unwrap();

        let first = service.redeem("donor_a", &reward.id).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = service.redeem("donor_a", &reward.id).unwrap();

        let history = service.redemption_history("donor_a").unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].id, second.id);
        assert_eq!(history[1].id, first.id);
    }

    #[test]
    fn history_is_scoped_to_the_donor() {
        let (_dir, service) = open_service("ledger_scope.db");
        service.credit_points("donor_a", 100).unwrap();
        service.credit_points("donor_b", 100).unwrap();
        let reward = service.add_reward("tote bag", 100, "merch", 5).unwrap();

        service.redeem("donor_a", &reward.id).unwrap();
        service.redeem("donor_b", &reward.id).unwrap();

        assert_eq!(service.redemption_history("donor_a").unwrap().len(), 1);
        assert_eq!(service.redemption_history("donor_b").unwrap().len(), 1);
    }

    #[test]
    fn unknown_reward_is_not_found() {
        let (_dir, service) = open_service("ledger_missing.db");
        service.credit_points("donor_a", 100).unwrap();

        let err = service.redeem("donor_a", "reward_missing").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CoreError>(),
            Some(CoreError::NotFound(_))
        ));
    }
}

// COLLECTOR ROSTER TESTS
#[cfg(test)]
mod roster_tests {
    use super::*;

    #[test]
    fn terminate_is_soft_and_restorable() {
        let (_dir, service) = open_service("roster_soft.db");
        let col = service.add_collector("org_a", "Sam", "sam@example.org").unwrap();

        service.terminate_collector(&col.id).unwrap();
        let active = service.collectors_by_organization("org_a", true).unwrap();
        assert!(active.is_empty());
        let all = service.collectors_by_organization("org_a", false).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].status, EmploymentStatus::Terminated);

        service.restore_collector(&col.id).unwrap();
        let active = service.collectors_by_organization("org_a", true).unwrap();
        assert_eq!(active.len(), 1);
    }

    #[test]
    fn update_keeps_identity() {
        let (_dir, service) = open_service("roster_update.db");
        let col = service.add_collector("org_a", "Sam", "sam@example.org").unwrap();

        let col = service
            .update_collector(&col.id, "Sam Doe", "sdoe@example.org")
            .unwrap();

        assert_eq!(col.name, "Sam Doe");
        assert_eq!(col.organization_id, "org_a");
    }
}

// ROLE FACADE TESTS
#[cfg(test)]
mod role_tests {
    use super::*;

    #[test]
    fn views_share_one_core() {
        let (_dir, service) = open_service("roles_shared.db");
        let donor = DonorView::new(&service, "donor_a");
        let org = OrganizationView::new(&service, "org_a");

        let item = donor.list_item(draft("fridge", "9 Oak Rd")).unwrap();
        let collector = org.add_collector("Sam", "sam@example.org").unwrap();
        let pickups = org
            .accept_items(Some(&collector.id), &[item.id.clone()])
            .unwrap();

        let col_view = CollectorView::new(&service, &collector.id);
        assert_eq!(col_view.my_pickups().unwrap().len(), 1);

        // the lock shows through the donor view as well
        let err = donor.delete_item(&item.id).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CoreError>(),
            Some(CoreError::Locked(_))
        ));

        col_view
            .complete_with_weight(&pickups[0].id, Weight::parse_kg("12.75").unwrap())
            .unwrap();
        assert_eq!(donor.my_pickups().unwrap()[0].status, PickupStatus::Completed);
    }
}
