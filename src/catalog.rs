//! Listed item model and the draft builder donors fill in
use super::error::CoreError;
use chrono::{DateTime, TimeZone, Utc};

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Eq, Ord, PartialEq, PartialOrd)]
pub enum ItemKind {
    #[n(0)]
    Appliance,
    #[n(1)]
    Computing,
    #[n(2)]
    Mobile,
    #[n(3)]
    Battery,
    #[n(4)]
    Other,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Eq, Ord, PartialEq, PartialOrd)]
pub enum Condition {
    #[n(0)]
    Working,
    #[n(1)]
    Damaged,
    #[n(2)]
    Scrap,
}

/// Physical dimensions in whole centimetres.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Eq, PartialEq)]
pub struct Dimensions {
    #[n(0)]
    pub length_cm: u32,
    #[n(1)]
    pub width_cm: u32,
    #[n(2)]
    pub height_cm: u32,
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone)]
pub struct TimeStamp<T: TimeZone>(DateTime<T>);

impl TimeStamp<Utc> {
    pub fn new() -> Self {
        Self(Utc::now())
    }
    pub fn new_with(year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) -> Self {
        Utc.with_ymd_and_hms(year, month, day, hour, min, sec)
            .unwrap()
            .into()
    }
    pub fn to_datetime_utc(&self) -> DateTime<Utc> {
        self.0
    }
}

/// A donor-submitted e-waste entry.
///
/// An item has exactly one owner and belongs to at most one pickup whose
/// overall status is still ongoing; that membership is what locks it
/// against edits and deletion.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq)]
pub struct ListedItem {
    #[n(0)]
    pub id: String, // uuid7, bech32 encoded with hrp "item"
    #[n(1)]
    pub donor_id: String,
    #[n(2)]
    pub name: String,
    #[n(3)]
    pub kind: ItemKind,
    #[n(4)]
    pub condition: Condition,
    #[n(5)]
    pub dimensions: Dimensions,
    #[n(6)]
    pub quantity: u32,
    #[n(7)]
    pub address: String, // free text, grouped by exact string equality
    #[n(8)]
    pub created_at: TimeStamp<Utc>,
}

/// Draft attributes for listing or editing an item.
#[derive(Debug, Default, Clone)]
pub struct ItemDraft {
    name: Option<String>,
    kind: Option<ItemKind>,
    condition: Option<Condition>,
    dimensions: Option<Dimensions>,
    quantity: u32,
    address: Option<String>,
}

impl ItemDraft {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn set_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_owned());
        self
    }
    pub fn set_kind(mut self, kind: ItemKind) -> Self {
        self.kind = Some(kind);
        self
    }
    pub fn set_condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }
    pub fn set_dimensions(mut self, length_cm: u32, width_cm: u32, height_cm: u32) -> Self {
        self.dimensions = Some(Dimensions {
            length_cm,
            width_cm,
            height_cm,
        });
        self
    }
    pub fn set_quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity;
        self
    }
    pub fn set_address(mut self, address: &str) -> Self {
        self.address = Some(address.to_owned());
        self
    }

    /// Checks the draft and folds it into a [`ListedItem`] owned by `donor_id`.
    pub fn finalise(self, id: String, donor_id: String) -> anyhow::Result<ListedItem> {
        let name = match self.name {
            Some(n) if !n.trim().is_empty() => n,
            _ => return Err(CoreError::InvalidDraft("item name is empty".into()).into()),
        };
        let address = match self.address {
            Some(a) if !a.trim().is_empty() => a,
            _ => return Err(CoreError::InvalidDraft("pickup address is empty".into()).into()),
        };
        let kind = self
            .kind
            .ok_or_else(|| CoreError::InvalidDraft("item kind is not set".into()))?;
        let condition = self
            .condition
            .ok_or_else(|| CoreError::InvalidDraft("item condition is not set".into()))?;
        let dimensions = self
            .dimensions
            .ok_or_else(|| CoreError::InvalidDraft("item dimensions are not set".into()))?;
        if self.quantity == 0 {
            return Err(CoreError::InvalidDraft("quantity is set to zero".into()).into());
        }

        Ok(ListedItem {
            id,
            donor_id,
            name,
            kind,
            condition,
            dimensions,
            quantity: self.quantity,
            address,
            created_at: TimeStamp::new(),
        })
    }

    /// Applies the draft on top of an existing item, keeping id, owner and
    /// creation timestamp. Unset fields keep their previous value.
    pub fn apply_to(self, item: &ListedItem) -> ListedItem {
        ListedItem {
            id: item.id.clone(),
            donor_id: item.donor_id.clone(),
            name: self.name.unwrap_or_else(|| item.name.clone()),
            kind: self.kind.unwrap_or_else(|| item.kind.clone()),
            condition: self.condition.unwrap_or_else(|| item.condition.clone()),
            dimensions: self.dimensions.unwrap_or_else(|| item.dimensions.clone()),
            quantity: if self.quantity == 0 {
                item.quantity
            } else {
                self.quantity
            },
            address: self.address.unwrap_or_else(|| item.address.clone()),
            created_at: item.created_at.clone(),
        }
    }
}

impl<T: TimeZone> From<DateTime<T>> for TimeStamp<T> {
    fn from(value: DateTime<T>) -> Self {
        TimeStamp(value)
    }
}
impl<C> minicbor::Encode<C> for TimeStamp<Utc> {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        if let Some(nsec) = self.0.timestamp_nanos_opt() {
            return e.i64(nsec)?.ok();
        }

        Err(minicbor::encode::Error::message(
            "failed to encode timestamp. timestamp_nanos_opt returned None",
        ))
    }
}
impl<'b, C> minicbor::Decode<'b, C> for TimeStamp<Utc> {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        let nsecs = d.i64()?;

        Ok(TimeStamp(DateTime::from_timestamp_nanos(nsecs)))
    }
}
