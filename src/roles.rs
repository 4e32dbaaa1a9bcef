//! Role-scoped facades over one shared [`PickupService`].
//!
//! Donor, organization and collector screens each see a narrow operation
//! set bound to the acting id. These are views, not separate cores: every
//! invariant stays enforced in the service underneath.
use super::catalog::{ItemDraft, ListedItem};
use super::collector::Collector;
use super::pickup::{CollectionStage, Pickup, Weight};
use super::rewards::{RedemptionRecord, RewardCatalogEntry};
use super::service::PickupService;

pub struct DonorView<'a> {
    service: &'a PickupService,
    donor_id: String,
}

pub struct OrganizationView<'a> {
    service: &'a PickupService,
    organization_id: String,
}

pub struct CollectorView<'a> {
    service: &'a PickupService,
    collector_id: String,
}

impl<'a> DonorView<'a> {
    pub fn new(service: &'a PickupService, donor_id: &str) -> Self {
        Self {
            service,
            donor_id: donor_id.to_owned(),
        }
    }

    pub fn list_item(&self, draft: ItemDraft) -> anyhow::Result<ListedItem> {
        self.service.list_item(&self.donor_id, draft)
    }
    pub fn update_item(&self, item_id: &str, draft: ItemDraft) -> anyhow::Result<ListedItem> {
        self.service.update_item(item_id, draft)
    }
    pub fn delete_item(&self, item_id: &str) -> anyhow::Result<()> {
        self.service.delete_item(item_id)
    }
    pub fn my_items(&self) -> anyhow::Result<Vec<ListedItem>> {
        self.service.items_by_donor(&self.donor_id)
    }
    pub fn my_pickups(&self) -> anyhow::Result<Vec<Pickup>> {
        self.service.pickups_by_donor(&self.donor_id)
    }
    pub fn balance(&self) -> anyhow::Result<u64> {
        self.service.balance(&self.donor_id)
    }
    pub fn redeem(&self, reward_id: &str) -> anyhow::Result<RedemptionRecord> {
        self.service.redeem(&self.donor_id, reward_id)
    }
    pub fn redemption_history(&self) -> anyhow::Result<Vec<RedemptionRecord>> {
        self.service.redemption_history(&self.donor_id)
    }
    pub fn rewards(&self) -> anyhow::Result<Vec<RewardCatalogEntry>> {
        self.service.rewards()
    }
}

impl<'a> OrganizationView<'a> {
    pub fn new(service: &'a PickupService, organization_id: &str) -> Self {
        Self {
            service,
            organization_id: organization_id.to_owned(),
        }
    }

    pub fn available_items(&self) -> anyhow::Result<Vec<ListedItem>> {
        self.service.available_items()
    }
    pub fn accept_items(
        &self,
        collector_id: Option<&str>,
        item_ids: &[String],
    ) -> anyhow::Result<Vec<Pickup>> {
        self.service
            .accept_items(&self.organization_id, collector_id, item_ids)
    }
    pub fn assign_collector(&self, pickup_id: &str, collector_id: &str) -> anyhow::Result<Pickup> {
        self.service.assign_collector(pickup_id, collector_id)
    }
    pub fn cancel_pickup(&self, pickup_id: &str) -> anyhow::Result<Pickup> {
        self.service.mark_cancelled(pickup_id)
    }
    pub fn complete_pickup(&self, pickup_id: &str) -> anyhow::Result<Pickup> {
        self.service.mark_completed(pickup_id)
    }
    pub fn my_pickups(&self) -> anyhow::Result<Vec<Pickup>> {
        self.service.pickups_by_organization(&self.organization_id)
    }
    pub fn add_collector(&self, name: &str, contact: &str) -> anyhow::Result<Collector> {
        self.service
            .add_collector(&self.organization_id, name, contact)
    }
    pub fn terminate_collector(&self, collector_id: &str) -> anyhow::Result<Collector> {
        self.service.terminate_collector(collector_id)
    }
    pub fn restore_collector(&self, collector_id: &str) -> anyhow::Result<Collector> {
        self.service.restore_collector(collector_id)
    }
    pub fn collectors(&self, only_active: bool) -> anyhow::Result<Vec<Collector>> {
        self.service
            .collectors_by_organization(&self.organization_id, only_active)
    }
}

impl<'a> CollectorView<'a> {
    pub fn new(service: &'a PickupService, collector_id: &str) -> Self {
        Self {
            service,
            collector_id: collector_id.to_owned(),
        }
    }

    pub fn my_pickups(&self) -> anyhow::Result<Vec<Pickup>> {
        self.service.pickups_by_collector(&self.collector_id)
    }
    pub fn advance_stage(&self, pickup_id: &str, next: CollectionStage) -> anyhow::Result<Pickup> {
        self.service.advance_stage(pickup_id, next)
    }
    pub fn complete_with_weight(&self, pickup_id: &str, weight: Weight) -> anyhow::Result<Pickup> {
        self.service
            .complete_with_weight(pickup_id, &self.collector_id, weight)
    }
}
