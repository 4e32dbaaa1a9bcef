//! Reward catalog entries, redemption records and PIN minting
use super::catalog::TimeStamp;
use chrono::Utc;
use rand::Rng;

pub const PIN_LEN: usize = 10;

/// Admin-managed catalog entry. `remaining` is decremented on redemption
/// inside the same transaction that debits the donor balance.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq)]
pub struct RewardCatalogEntry {
    #[n(0)]
    pub id: String, // uuid7, bech32 encoded with hrp "reward"
    #[n(1)]
    pub name: String,
    #[n(2)]
    pub cost: u64, // points
    #[n(3)]
    pub category: String,
    #[n(4)]
    pub available: bool,
    #[n(5)]
    pub remaining: u32,
}

impl RewardCatalogEntry {
    pub fn in_stock(&self) -> bool {
        self.available && self.remaining > 0
    }
}

/// One past redemption. Immutable once created; the history is append-only.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq)]
pub struct RedemptionRecord {
    #[n(0)]
    pub id: String, // uuid7, bech32 encoded with hrp "rdm"
    #[n(1)]
    pub donor_id: String,
    #[n(2)]
    pub reward_id: String,
    #[n(3)]
    pub pin: String, // exactly PIN_LEN ascii digits
    #[n(4)]
    pub created_at: TimeStamp<Utc>,
}

/// Mints a fixed-length numeric PIN, uniform over its digit space.
///
/// The PIN is a display code shown at the counter, not a credential, so the
/// thread rng is sufficient. Collisions across the history are tolerated.
pub fn mint_pin() -> String {
    let mut rng = rand::thread_rng();
    (0..PIN_LEN)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}
