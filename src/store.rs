//! Persistence boundary over sled.
//!
//! One named tree per entity family, records serialized with minicbor.
//! The service never touches sled directly; everything goes through here.
use super::catalog::ListedItem;
use super::collector::Collector;
use super::error::CoreError;
use super::pickup::{Pickup, PickupStatus};
use super::rewards::{RedemptionRecord, RewardCatalogEntry};
use sled::Transactional;
use sled::transaction::{ConflictableTransactionError, TransactionError};
use std::sync::Arc;

pub struct Store {
    items: sled::Tree,
    item_history: sled::Tree,
    pickups: sled::Tree,
    rewards: sled::Tree,
    balances: sled::Tree,
    redemptions: sled::Tree,
    collectors: sled::Tree,
}

fn decode<T>(bytes: &[u8]) -> anyhow::Result<T>
where
    T: for<'b> minicbor::Decode<'b, ()>,
{
    Ok(minicbor::decode(bytes)?)
}

impl Store {
    pub fn open(db: &Arc<sled::Db>) -> anyhow::Result<Self> {
        Ok(Self {
            items: db.open_tree("items")?,
            item_history: db.open_tree("item_history")?,
            pickups: db.open_tree("pickups")?,
            rewards: db.open_tree("rewards")?,
            balances: db.open_tree("balances")?,
            redemptions: db.open_tree("redemptions")?,
            collectors: db.open_tree("collectors")?,
        })
    }

    // --- items ---

    pub fn put_item(&self, item: &ListedItem) -> anyhow::Result<()> {
        self.items.insert(item.id.as_bytes(), minicbor::to_vec(item)?)?;
        Ok(())
    }

    pub fn get_item(&self, item_id: &str) -> anyhow::Result<Option<ListedItem>> {
        match self.items.get(item_id.as_bytes())? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn items(&self) -> anyhow::Result<Vec<ListedItem>> {
        let mut out = Vec::new();
        for entry in self.items.iter() {
            let (_, bytes) = entry?;
            out.push(decode(&bytes)?);
        }
        Ok(out)
    }

    /// Keeps a historical snapshot so terminal pickups stay renderable even
    /// after the active listing is gone.
    pub fn snapshot_item(&self, item: &ListedItem) -> anyhow::Result<()> {
        self.item_history
            .insert(item.id.as_bytes(), minicbor::to_vec(item)?)?;
        Ok(())
    }

    pub fn get_item_snapshot(&self, item_id: &str) -> anyhow::Result<Option<ListedItem>> {
        match self.item_history.get(item_id.as_bytes())? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Moves an item out of the active catalog into history, atomically.
    pub fn retire_item(&self, item: &ListedItem) -> anyhow::Result<()> {
        let encoded = minicbor::to_vec(item)?;
        let result = (&self.items, &self.item_history).transaction(
            |(items, history): &(
                sled::transaction::TransactionalTree,
                sled::transaction::TransactionalTree,
            )| {
                items.remove(item.id.as_bytes())?;
                history.insert(item.id.as_bytes(), encoded.clone())?;
                Ok::<
                    (),
                    ConflictableTransactionError<anyhow::Error>,
                >(())
            },
        );
        match result {
            Ok(()) => Ok(()),
            Err(TransactionError::Abort(e)) => Err(e),
            Err(TransactionError::Storage(e)) => Err(e.into()),
        }
    }

    // --- pickups ---

    pub fn put_pickup(&self, pickup: &Pickup) -> anyhow::Result<()> {
        self.pickups
            .insert(pickup.id.as_bytes(), minicbor::to_vec(pickup)?)?;
        Ok(())
    }

    pub fn get_pickup(&self, pickup_id: &str) -> anyhow::Result<Option<Pickup>> {
        match self.pickups.get(pickup_id.as_bytes())? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn pickups(&self) -> anyhow::Result<Vec<Pickup>> {
        let mut out = Vec::new();
        for entry in self.pickups.iter() {
            let (_, bytes) = entry?;
            out.push(decode(&bytes)?);
        }
        Ok(out)
    }

    /// The ongoing pickup an item currently belongs to, if any. By the
    /// single-membership invariant there is at most one.
    pub fn ongoing_pickup_containing(&self, item_id: &str) -> anyhow::Result<Option<Pickup>> {
        for pickup in self.pickups()? {
            if pickup.status == PickupStatus::Ongoing && pickup.contains_item(item_id) {
                return Ok(Some(pickup));
            }
        }
        Ok(None)
    }

    // --- rewards and balances ---

    pub fn put_reward(&self, reward: &RewardCatalogEntry) -> anyhow::Result<()> {
        self.rewards
            .insert(reward.id.as_bytes(), minicbor::to_vec(reward)?)?;
        Ok(())
    }

    pub fn get_reward(&self, reward_id: &str) -> anyhow::Result<Option<RewardCatalogEntry>> {
        match self.rewards.get(reward_id.as_bytes())? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn rewards(&self) -> anyhow::Result<Vec<RewardCatalogEntry>> {
        let mut out = Vec::new();
        for entry in self.rewards.iter() {
            let (_, bytes) = entry?;
            out.push(decode(&bytes)?);
        }
        Ok(out)
    }

    pub fn balance(&self, donor_id: &str) -> anyhow::Result<u64> {
        match self.balances.get(donor_id.as_bytes())? {
            Some(bytes) => decode(&bytes),
            None => Ok(0),
        }
    }

    pub fn credit_points(&self, donor_id: &str, points: u64) -> anyhow::Result<u64> {
        let result = self.balances.transaction(
            |balances: &sled::transaction::TransactionalTree| {
                let current: u64 = match balances.get(donor_id.as_bytes())? {
                    Some(bytes) => minicbor::decode(&bytes)
                        .map_err(|e| ConflictableTransactionError::Abort(anyhow::Error::from(e)))?,
                    None => 0,
                };
                let next = current.saturating_add(points);
                let encoded = minicbor::to_vec(next)
                    .map_err(|e| ConflictableTransactionError::Abort(anyhow::Error::from(e)))?;
                balances.insert(donor_id.as_bytes(), encoded)?;
                Ok(next)
            },
        );
        match result {
            Ok(next) => Ok(next),
            Err(TransactionError::Abort(e)) => Err(e),
            Err(TransactionError::Storage(e)) => Err(e.into()),
        }
    }

    /// The redemption hot path. Balance debit, stock decrement and record
    /// append happen in one transaction so racing donors cannot over-redeem
    /// the last unit; preconditions failing abort with no state change.
    pub fn apply_redemption(&self, record: &RedemptionRecord) -> anyhow::Result<RedemptionRecord> {
        let result = (&self.rewards, &self.balances, &self.redemptions).transaction(
            |(rewards, balances, redemptions): &(
                sled::transaction::TransactionalTree,
                sled::transaction::TransactionalTree,
                sled::transaction::TransactionalTree,
            )| {
                let abort =
                    |e: CoreError| ConflictableTransactionError::Abort(anyhow::Error::from(e));

                let mut reward: RewardCatalogEntry = match rewards.get(record.reward_id.as_bytes())?
                {
                    Some(bytes) => minicbor::decode(&bytes)
                        .map_err(|e| ConflictableTransactionError::Abort(anyhow::Error::from(e)))?,
                    None => return Err(abort(CoreError::NotFound(record.reward_id.clone()))),
                };
                if !reward.in_stock() {
                    return Err(abort(CoreError::OutOfStock));
                }

                let balance: u64 = match balances.get(record.donor_id.as_bytes())? {
                    Some(bytes) => minicbor::decode(&bytes)
                        .map_err(|e| ConflictableTransactionError::Abort(anyhow::Error::from(e)))?,
                    None => 0,
                };
                if balance < reward.cost {
                    return Err(abort(CoreError::InsufficientPoints {
                        balance,
                        cost: reward.cost,
                    }));
                }

                reward.remaining -= 1;
                rewards.insert(
                    record.reward_id.as_bytes(),
                    minicbor::to_vec(&reward)
                        .map_err(|e| ConflictableTransactionError::Abort(anyhow::Error::from(e)))?,
                )?;
                balances.insert(
                    record.donor_id.as_bytes(),
                    minicbor::to_vec(balance - reward.cost)
                        .map_err(|e| ConflictableTransactionError::Abort(anyhow::Error::from(e)))?,
                )?;
                redemptions.insert(
                    record.id.as_bytes(),
                    minicbor::to_vec(record)
                        .map_err(|e| ConflictableTransactionError::Abort(anyhow::Error::from(e)))?,
                )?;

                Ok(record.clone())
            },
        );
        match result {
            Ok(record) => Ok(record),
            Err(TransactionError::Abort(e)) => Err(e),
            Err(TransactionError::Storage(e)) => Err(e.into()),
        }
    }

    pub fn redemptions_by_donor(&self, donor_id: &str) -> anyhow::Result<Vec<RedemptionRecord>> {
        let mut out = Vec::new();
        for entry in self.redemptions.iter() {
            let (_, bytes) = entry?;
            let record: RedemptionRecord = decode(&bytes)?;
            if record.donor_id == donor_id {
                out.push(record);
            }
        }
        Ok(out)
    }

    // --- collectors ---

    pub fn put_collector(&self, collector: &Collector) -> anyhow::Result<()> {
        self.collectors
            .insert(collector.id.as_bytes(), minicbor::to_vec(collector)?)?;
        Ok(())
    }

    pub fn get_collector(&self, collector_id: &str) -> anyhow::Result<Option<Collector>> {
        match self.collectors.get(collector_id.as_bytes())? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn collectors(&self) -> anyhow::Result<Vec<Collector>> {
        let mut out = Vec::new();
        for entry in self.collectors.iter() {
            let (_, bytes) = entry?;
            out.push(decode(&bytes)?);
        }
        Ok(out)
    }
}
