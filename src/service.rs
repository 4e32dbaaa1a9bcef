//! Service layer API for pickup coordination operations
use super::catalog::{ItemDraft, ListedItem};
use super::collector::{Collector, EmploymentStatus};
use super::error::CoreError;
use super::pickup::{CollectionStage, Pickup, PickupStatus, Weight};
use super::rewards::{RedemptionRecord, RewardCatalogEntry, mint_pin};
use super::store::Store;
use super::{catalog::TimeStamp, utils};
use std::sync::Arc;

pub struct PickupService {
    store: Store,
    // in future we could add a config for grouping constraints
}

impl PickupService {
    pub fn open(instance: Arc<sled::Db>) -> anyhow::Result<Self> {
        Ok(Self {
            store: Store::open(&instance)?,
        })
    }

    fn load_item(&self, item_id: &str) -> anyhow::Result<ListedItem> {
        self.store
            .get_item(item_id)?
            .ok_or_else(|| CoreError::NotFound(item_id.to_owned()).into())
    }

    fn load_pickup(&self, pickup_id: &str) -> anyhow::Result<Pickup> {
        self.store
            .get_pickup(pickup_id)?
            .ok_or_else(|| CoreError::NotFound(pickup_id.to_owned()).into())
    }

    fn load_collector(&self, collector_id: &str) -> anyhow::Result<Collector> {
        self.store
            .get_collector(collector_id)?
            .ok_or_else(|| CoreError::NotFound(collector_id.to_owned()).into())
    }

    /// A collector taking part in a pickup must exist, be on the roster of
    /// the organization in question and still be employed.
    fn validate_roster(
        &self,
        organization_id: &str,
        collector_id: &str,
    ) -> anyhow::Result<Collector> {
        let collector = self.load_collector(collector_id)?;
        if collector.organization_id != organization_id {
            return Err(CoreError::InvalidSelection(format!(
                "collector {collector_id} belongs to a different organization"
            ))
            .into());
        }
        if !collector.is_active() {
            return Err(CoreError::Locked(format!(
                "collector {collector_id} is terminated"
            ))
            .into());
        }
        Ok(collector)
    }

    /// Fails with `Locked` while the item belongs to a pickup whose overall
    /// status is still ongoing. Membership is the lock; there is no flag.
    fn ensure_unlocked(&self, item_id: &str) -> anyhow::Result<()> {
        if let Some(pickup) = self.store.ongoing_pickup_containing(item_id)? {
            return Err(CoreError::Locked(format!(
                "item {item_id} is in ongoing pickup {}",
                pickup.id
            ))
            .into());
        }
        Ok(())
    }

    // --- item catalog ---

    /// List a new e-waste item for the donor.
    pub fn list_item(&self, donor_id: &str, draft: ItemDraft) -> anyhow::Result<ListedItem> {
        let id = utils::new_uuid_to_bech32("item")?;
        let item = draft.finalise(id, donor_id.to_owned())?;

        self.store.put_item(&item)?;
        self.store.snapshot_item(&item)?;
        tracing::info!(item = %item.id, donor = %donor_id, "item listed");
        Ok(item)
    }

    /// Edit an item in place. Only allowed while it is not locked into an
    /// ongoing pickup.
    pub fn update_item(&self, item_id: &str, draft: ItemDraft) -> anyhow::Result<ListedItem> {
        let item = self.load_item(item_id)?;
        self.ensure_unlocked(item_id)?;

        let updated = draft.apply_to(&item);
        self.store.put_item(&updated)?;
        self.store.snapshot_item(&updated)?;
        tracing::info!(item = %item_id, "item updated");
        Ok(updated)
    }

    /// Soft-delete an item into history. Fails with `Locked` while the item
    /// is a member of an ongoing pickup.
    pub fn delete_item(&self, item_id: &str) -> anyhow::Result<()> {
        let item = self.load_item(item_id)?;
        self.ensure_unlocked(item_id)?;

        self.store.retire_item(&item)?;
        tracing::info!(item = %item_id, "item deleted");
        Ok(())
    }

    /// Items belonging to no ongoing pickup: candidates for a new one.
    pub fn available_items(&self) -> anyhow::Result<Vec<ListedItem>> {
        let mut consumed = std::collections::HashSet::new();
        for pickup in self.store.pickups()? {
            if pickup.status == PickupStatus::Ongoing {
                consumed.extend(pickup.item_ids.iter().cloned());
            }
        }
        Ok(self
            .store
            .items()?
            .into_iter()
            .filter(|item| !consumed.contains(&item.id))
            .collect())
    }

    pub fn items_by_donor(&self, donor_id: &str) -> anyhow::Result<Vec<ListedItem>> {
        Ok(self
            .store
            .items()?
            .into_iter()
            .filter(|item| item.donor_id == donor_id)
            .collect())
    }

    /// Resolves an item for display, falling back to the historical snapshot
    /// so completed and cancelled pickups keep renderable detail.
    pub fn item_detail(&self, item_id: &str) -> anyhow::Result<ListedItem> {
        if let Some(item) = self.store.get_item(item_id)? {
            return Ok(item);
        }
        self.store
            .get_item_snapshot(item_id)?
            .ok_or_else(|| CoreError::NotFound(item_id.to_owned()).into())
    }

    // --- pickup aggregation ---

    /// Accept a batch of selected items for an organization, grouping them
    /// by address into one pickup per address. Groups join an existing
    /// ongoing pickup when one matches organization, collector and address;
    /// otherwise a fresh pickup is created out-for-pickup.
    ///
    /// Validation is all-or-nothing: an empty batch, an unknown id or a
    /// batch spanning more than one donor rejects the whole selection
    /// before any state changes. After validation each address group
    /// commits independently.
    pub fn accept_items(
        &self,
        organization_id: &str,
        collector_id: Option<&str>,
        item_ids: &[String],
    ) -> anyhow::Result<Vec<Pickup>> {
        if item_ids.is_empty() {
            return Err(CoreError::InvalidSelection("empty batch".into()).into());
        }
        if let Some(collector_id) = collector_id {
            self.validate_roster(organization_id, collector_id)?;
        }

        // resolve the whole batch up front, deduplicating the selection
        let mut seen = std::collections::HashSet::new();
        let mut items = Vec::new();
        for id in item_ids {
            if !seen.insert(id.clone()) {
                continue;
            }
            let item = self
                .store
                .get_item(id)?
                .ok_or_else(|| CoreError::InvalidSelection(format!("unknown item id {id}")))?;
            items.push(item);
        }

        let donor_id = items[0].donor_id.clone();
        if items.iter().any(|item| item.donor_id != donor_id) {
            return Err(
                CoreError::InvalidSelection("batch spans more than one donor".into()).into(),
            );
        }

        // an item already consumed by another organization/collector pairing
        // violates single membership; the same pairing re-routes to the
        // dedup-append path below
        for item in &items {
            if let Some(pickup) = self.store.ongoing_pickup_containing(&item.id)? {
                let same_collector = pickup.collector_id.as_deref() == collector_id;
                if pickup.organization_id != organization_id || !same_collector {
                    return Err(CoreError::Locked(format!(
                        "item {} is in ongoing pickup {}",
                        item.id, pickup.id
                    ))
                    .into());
                }
            }
        }

        let mut results = Vec::new();
        for (address, group) in group_by_address(items) {
            let group_ids: Vec<String> = group.iter().map(|item| item.id.clone()).collect();

            match self.find_open_pickup(organization_id, collector_id, &address)? {
                Some(mut pickup) => {
                    pickup.append_items(group_ids);
                    self.store.put_pickup(&pickup)?;
                    tracing::info!(pickup = %pickup.id, %address, "items appended to open pickup");
                    results.push(pickup);
                }
                None => {
                    let id = utils::new_uuid_to_bech32("pickup")?;
                    let pickup = Pickup::new(
                        id,
                        organization_id.to_owned(),
                        collector_id.map(str::to_owned),
                        donor_id.clone(),
                        group_ids,
                    );
                    self.store.put_pickup(&pickup)?;
                    tracing::info!(pickup = %pickup.id, %address, "pickup created");
                    results.push(pickup);
                }
            }
        }
        Ok(results)
    }

    /// An ongoing pickup for the same organization and collector with at
    /// least one member item at this exact address.
    fn find_open_pickup(
        &self,
        organization_id: &str,
        collector_id: Option<&str>,
        address: &str,
    ) -> anyhow::Result<Option<Pickup>> {
        for pickup in self.store.pickups()? {
            if pickup.status != PickupStatus::Ongoing
                || pickup.organization_id != organization_id
                || pickup.collector_id.as_deref() != collector_id
            {
                continue;
            }
            for item_id in &pickup.item_ids {
                if self.item_detail(item_id)?.address == address {
                    return Ok(Some(pickup));
                }
            }
        }
        Ok(None)
    }

    // --- pickup lifecycle ---

    /// Assign a collector to a claimable pickup. The collector must be an
    /// active employee of the organization that owns the pickup.
    pub fn assign_collector(&self, pickup_id: &str, collector_id: &str) -> anyhow::Result<Pickup> {
        let mut pickup = self.load_pickup(pickup_id)?;
        self.validate_roster(&pickup.organization_id, collector_id)?;

        pickup.assign_collector(collector_id.to_owned())?;
        self.store.put_pickup(&pickup)?;
        tracing::info!(pickup = %pickup_id, collector = %collector_id, "collector assigned");
        Ok(pickup)
    }

    /// Advance the collection stage by exactly one step.
    pub fn advance_stage(
        &self,
        pickup_id: &str,
        next: CollectionStage,
    ) -> anyhow::Result<Pickup> {
        let mut pickup = self.load_pickup(pickup_id)?;
        pickup.advance_stage(next)?;
        self.store.put_pickup(&pickup)?;
        tracing::info!(pickup = %pickup_id, stage = next.label(), "stage advanced");
        Ok(pickup)
    }

    /// Terminal completion. Member items are snapshotted and released: they
    /// remain listed and become editable and deletable again.
    pub fn mark_completed(&self, pickup_id: &str) -> anyhow::Result<Pickup> {
        let mut pickup = self.load_pickup(pickup_id)?;
        pickup.mark_completed()?;
        self.store.put_pickup(&pickup)?;
        self.snapshot_members(&pickup)?;
        tracing::info!(pickup = %pickup_id, "pickup completed");
        Ok(pickup)
    }

    /// Terminal cancellation. Unlike completion this destroys the member
    /// items (see [`Self::destroy_cancelled_items`]).
    pub fn mark_cancelled(&self, pickup_id: &str) -> anyhow::Result<Pickup> {
        let mut pickup = self.load_pickup(pickup_id)?;
        pickup.mark_cancelled()?;
        self.store.put_pickup(&pickup)?;
        self.destroy_cancelled_items(&pickup)?;
        tracing::info!(pickup = %pickup_id, "pickup cancelled");
        Ok(pickup)
    }

    /// Terminal transition reported by the assigned collector, carrying the
    /// weighed load. Jumps the stage to recycled and completes the pickup;
    /// member items are snapshotted and released.
    pub fn complete_with_weight(
        &self,
        pickup_id: &str,
        collector_id: &str,
        weight: Weight,
    ) -> anyhow::Result<Pickup> {
        let mut pickup = self.load_pickup(pickup_id)?;
        if pickup.collector_id.as_deref() != Some(collector_id) {
            return Err(CoreError::Locked(format!(
                "pickup {pickup_id} is not assigned to collector {collector_id}"
            ))
            .into());
        }

        pickup.complete_with_weight(weight)?;
        self.store.put_pickup(&pickup)?;
        self.snapshot_members(&pickup)?;
        tracing::info!(pickup = %pickup_id, grams = weight.as_grams(), "pickup recycled");
        Ok(pickup)
    }

    pub fn pickups_by_organization(&self, organization_id: &str) -> anyhow::Result<Vec<Pickup>> {
        Ok(self
            .store
            .pickups()?
            .into_iter()
            .filter(|p| p.organization_id == organization_id)
            .collect())
    }

    pub fn pickups_by_donor(&self, donor_id: &str) -> anyhow::Result<Vec<Pickup>> {
        Ok(self
            .store
            .pickups()?
            .into_iter()
            .filter(|p| p.donor_id == donor_id)
            .collect())
    }

    pub fn pickups_by_collector(&self, collector_id: &str) -> anyhow::Result<Vec<Pickup>> {
        Ok(self
            .store
            .pickups()?
            .into_iter()
            .filter(|p| p.collector_id.as_deref() == Some(collector_id))
            .collect())
    }

    fn snapshot_members(&self, pickup: &Pickup) -> anyhow::Result<()> {
        for item_id in &pickup.item_ids {
            if let Some(item) = self.store.get_item(item_id)? {
                self.store.snapshot_item(&item)?;
            }
        }
        Ok(())
    }

    /// Cancellation policy: member items are deleted outright rather than
    /// merely released. Kept behind this one function so a product decision
    /// can flip it to a non-destructive release without touching the state
    /// machine.
    fn destroy_cancelled_items(&self, pickup: &Pickup) -> anyhow::Result<()> {
        for item_id in &pickup.item_ids {
            if let Some(item) = self.store.get_item(item_id)? {
                self.store.retire_item(&item)?;
                tracing::info!(item = %item_id, pickup = %pickup.id, "item destroyed on cancel");
            }
        }
        Ok(())
    }

    // --- reward ledger ---

    pub fn add_reward(
        &self,
        name: &str,
        cost: u64,
        category: &str,
        remaining: u32,
    ) -> anyhow::Result<RewardCatalogEntry> {
        let reward = RewardCatalogEntry {
            id: utils::new_uuid_to_bech32("reward")?,
            name: name.to_owned(),
            cost,
            category: category.to_owned(),
            available: true,
            remaining,
        };
        self.store.put_reward(&reward)?;
        Ok(reward)
    }

    pub fn rewards(&self) -> anyhow::Result<Vec<RewardCatalogEntry>> {
        self.store.rewards()
    }

    pub fn credit_points(&self, donor_id: &str, points: u64) -> anyhow::Result<u64> {
        let balance = self.store.credit_points(donor_id, points)?;
        tracing::info!(donor = %donor_id, points, balance, "points credited");
        Ok(balance)
    }

    pub fn balance(&self, donor_id: &str) -> anyhow::Result<u64> {
        self.store.balance(donor_id)
    }

    /// Redeem a reward: debit the balance, decrement the stock by one and
    /// append an immutable record with a freshly minted 10-digit PIN. All
    /// three happen atomically; on failure nothing changes.
    pub fn redeem(&self, donor_id: &str, reward_id: &str) -> anyhow::Result<RedemptionRecord> {
        let record = RedemptionRecord {
            id: utils::new_uuid_to_bech32("rdm")?,
            donor_id: donor_id.to_owned(),
            reward_id: reward_id.to_owned(),
            pin: mint_pin(),
            created_at: TimeStamp::new(),
        };
        let record = self.store.apply_redemption(&record)?;
        tracing::info!(donor = %donor_id, reward = %reward_id, "reward redeemed");
        Ok(record)
    }

    /// Past redemptions for the donor, newest first.
    pub fn redemption_history(&self, donor_id: &str) -> anyhow::Result<Vec<RedemptionRecord>> {
        let mut records = self.store.redemptions_by_donor(donor_id)?;
        records.sort_by(|a, b| {
            b.created_at
                .to_datetime_utc()
                .cmp(&a.created_at.to_datetime_utc())
        });
        Ok(records)
    }

    // --- collector roster ---

    pub fn add_collector(
        &self,
        organization_id: &str,
        name: &str,
        contact: &str,
    ) -> anyhow::Result<Collector> {
        let collector = Collector::new(
            utils::new_uuid_to_bech32("col")?,
            organization_id.to_owned(),
            name.to_owned(),
            contact.to_owned(),
        );
        self.store.put_collector(&collector)?;
        tracing::info!(collector = %collector.id, org = %organization_id, "collector added");
        Ok(collector)
    }

    pub fn update_collector(
        &self,
        collector_id: &str,
        name: &str,
        contact: &str,
    ) -> anyhow::Result<Collector> {
        let mut collector = self.load_collector(collector_id)?;
        collector.name = name.to_owned();
        collector.contact = contact.to_owned();
        self.store.put_collector(&collector)?;
        Ok(collector)
    }

    /// Soft delete: the collector stays on record for past pickups.
    pub fn terminate_collector(&self, collector_id: &str) -> anyhow::Result<Collector> {
        let mut collector = self.load_collector(collector_id)?;
        collector.status = EmploymentStatus::Terminated;
        self.store.put_collector(&collector)?;
        tracing::info!(collector = %collector_id, "collector terminated");
        Ok(collector)
    }

    pub fn restore_collector(&self, collector_id: &str) -> anyhow::Result<Collector> {
        let mut collector = self.load_collector(collector_id)?;
        collector.status = EmploymentStatus::Active;
        self.store.put_collector(&collector)?;
        tracing::info!(collector = %collector_id, "collector restored");
        Ok(collector)
    }

    pub fn collectors_by_organization(
        &self,
        organization_id: &str,
        only_active: bool,
    ) -> anyhow::Result<Vec<Collector>> {
        Ok(self
            .store
            .collectors()?
            .into_iter()
            .filter(|c| c.organization_id == organization_id)
            .filter(|c| !only_active || c.is_active())
            .collect())
    }
}

/// Partitions items into address groups, preserving first-seen order.
/// Matching is deliberately exact, case-sensitive string equality; no
/// normalization or geocoding is applied.
pub fn group_by_address(items: Vec<ListedItem>) -> Vec<(String, Vec<ListedItem>)> {
    let mut groups: Vec<(String, Vec<ListedItem>)> = Vec::new();
    for item in items {
        match groups.iter_mut().find(|(addr, _)| *addr == item.address) {
            Some((_, group)) => group.push(item),
            None => {
                let address = item.address.clone();
                groups.push((address, vec![item]));
            }
        }
    }
    groups
}
