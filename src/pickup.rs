//! Pickup record and its lifecycle state machine
use super::catalog::TimeStamp;
use super::error::CoreError;
use chrono::Utc;

/// Overall status. Both `Completed` and `Cancelled` are terminal; there is
/// no transition out of a terminal state.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, Eq, PartialEq)]
pub enum PickupStatus {
    #[n(0)]
    Ongoing,
    #[n(1)]
    Completed,
    #[n(2)]
    Cancelled,
}

/// Collection stage, meaningful only while the overall status is ongoing.
/// Advances monotonically, one step at a time.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, Eq, Ord, PartialEq, PartialOrd)]
pub enum CollectionStage {
    #[n(0)]
    OutForPickup,
    #[n(1)]
    Collected,
    #[n(2)]
    Recycled,
}

impl CollectionStage {
    pub fn successor(self) -> Option<CollectionStage> {
        match self {
            CollectionStage::OutForPickup => Some(CollectionStage::Collected),
            CollectionStage::Collected => Some(CollectionStage::Recycled),
            CollectionStage::Recycled => None,
        }
    }
    pub fn label(self) -> &'static str {
        match self {
            CollectionStage::OutForPickup => "Out for pickup",
            CollectionStage::Collected => "Collected",
            CollectionStage::Recycled => "Recycled",
        }
    }
}

impl PickupStatus {
    pub fn label(self) -> &'static str {
        match self {
            PickupStatus::Ongoing => "ongoing",
            PickupStatus::Completed => "completed",
            PickupStatus::Cancelled => "cancelled",
        }
    }
}

/// Collected weight in whole grams. Built from a decimal kilogram string
/// with at most three decimal places, so the stored value is exact.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, Eq, Ord, PartialEq, PartialOrd)]
#[cbor(transparent)]
pub struct Weight(#[n(0)] u64);

impl Weight {
    /// Parses a non-negative decimal kilogram value, e.g. `"2.5"` or `"0.125"`.
    /// Rejects signs, more than three decimal places and anything non-numeric.
    pub fn parse_kg(input: &str) -> anyhow::Result<Self> {
        let raw = input.trim();
        if raw.is_empty() {
            return Err(CoreError::InvalidWeight("weight is empty".into()).into());
        }
        let (whole, frac) = match raw.split_once('.') {
            Some((w, f)) => (w, f),
            None => (raw, ""),
        };
        if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CoreError::InvalidWeight(format!("not a non-negative number: {raw}")).into());
        }
        if raw.contains('.') && (frac.is_empty() || !frac.bytes().all(|b| b.is_ascii_digit())) {
            return Err(CoreError::InvalidWeight(format!("not a non-negative number: {raw}")).into());
        }
        if frac.len() > 3 {
            return Err(
                CoreError::InvalidWeight(format!("more than three decimal places: {raw}")).into(),
            );
        }

        let kg: u64 = whole.parse()?;
        let mut grams = kg
            .checked_mul(1000)
            .ok_or_else(|| CoreError::InvalidWeight(format!("weight out of range: {raw}")))?;
        if !frac.is_empty() {
            let scale = 10u64.pow(3 - frac.len() as u32);
            grams = grams
                .checked_add(frac.parse::<u64>()? * scale)
                .ok_or_else(|| CoreError::InvalidWeight(format!("weight out of range: {raw}")))?;
        }
        Ok(Weight(grams))
    }
    pub fn as_grams(self) -> u64 {
        self.0
    }
}

/// A batch of one or more listed items traveling together through
/// collection. The unit of collector assignment.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq)]
pub struct Pickup {
    #[n(0)]
    pub id: String, // uuid7, bech32 encoded with hrp "pickup"
    #[n(1)]
    pub organization_id: String,
    #[n(2)]
    pub collector_id: Option<String>,
    #[n(3)]
    pub donor_id: String,
    #[n(4)]
    pub item_ids: Vec<String>, // ordered, no duplicates, one donor
    #[n(5)]
    pub status: PickupStatus,
    #[n(6)]
    pub stage: CollectionStage,
    #[n(7)]
    pub recycled_weight: Option<Weight>,
    #[n(8)]
    pub created_at: TimeStamp<Utc>,
    #[n(9)]
    pub updated_at: TimeStamp<Utc>,
}

impl Pickup {
    pub fn new(
        id: String,
        organization_id: String,
        collector_id: Option<String>,
        donor_id: String,
        item_ids: Vec<String>,
    ) -> Self {
        let now = TimeStamp::new();
        Self {
            id,
            organization_id,
            collector_id,
            donor_id,
            item_ids,
            status: PickupStatus::Ongoing,
            stage: CollectionStage::OutForPickup,
            recycled_weight: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status != PickupStatus::Ongoing
    }

    /// Derived, never stored: a pickup is claimable while ongoing with no
    /// collector assigned yet.
    pub fn is_claimable(&self) -> bool {
        self.status == PickupStatus::Ongoing && self.collector_id.is_none()
    }

    pub fn contains_item(&self, item_id: &str) -> bool {
        self.item_ids.iter().any(|id| id == item_id)
    }

    /// Appends member items, skipping ids already present.
    pub fn append_items(&mut self, item_ids: impl IntoIterator<Item = String>) {
        for id in item_ids {
            if !self.contains_item(&id) {
                self.item_ids.push(id);
            }
        }
        self.updated_at = TimeStamp::new();
    }

    pub fn assign_collector(&mut self, collector_id: String) -> anyhow::Result<()> {
        if self.is_terminal() {
            return Err(self.terminal_transition("assign collector"));
        }
        if let Some(current) = &self.collector_id {
            return Err(CoreError::Locked(format!(
                "pickup {} already has collector {}",
                self.id, current
            ))
            .into());
        }
        self.collector_id = Some(collector_id);
        self.updated_at = TimeStamp::new();
        Ok(())
    }

    /// Moves the collection stage to `next`, which must be the immediate
    /// successor of the current stage.
    pub fn advance_stage(&mut self, next: CollectionStage) -> anyhow::Result<()> {
        if self.is_terminal() {
            return Err(self.terminal_transition(next.label()));
        }
        if self.stage.successor() != Some(next) {
            return Err(CoreError::InvalidTransition {
                from: self.stage.label().into(),
                to: next.label().into(),
            }
            .into());
        }
        self.stage = next;
        self.updated_at = TimeStamp::new();
        Ok(())
    }

    pub fn mark_completed(&mut self) -> anyhow::Result<()> {
        if self.is_terminal() {
            return Err(self.terminal_transition("completed"));
        }
        self.status = PickupStatus::Completed;
        self.updated_at = TimeStamp::new();
        Ok(())
    }

    pub fn mark_cancelled(&mut self) -> anyhow::Result<()> {
        if self.is_terminal() {
            return Err(self.terminal_transition("cancelled"));
        }
        self.status = PickupStatus::Cancelled;
        self.updated_at = TimeStamp::new();
        Ok(())
    }

    /// Terminal transition reported by the assigned collector: records the
    /// weighed load, jumps the stage to recycled and completes the pickup.
    pub fn complete_with_weight(&mut self, weight: Weight) -> anyhow::Result<()> {
        if self.is_terminal() {
            return Err(self.terminal_transition("completed"));
        }
        self.recycled_weight = Some(weight);
        self.stage = CollectionStage::Recycled;
        self.status = PickupStatus::Completed;
        self.updated_at = TimeStamp::new();
        Ok(())
    }

    fn terminal_transition(&self, to: &str) -> anyhow::Error {
        CoreError::InvalidTransition {
            from: self.status.label().into(),
            to: to.into(),
        }
        .into()
    }
}
