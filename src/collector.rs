//! Collector roster model
use super::catalog::TimeStamp;
use chrono::Utc;

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, Eq, PartialEq)]
pub enum EmploymentStatus {
    #[n(0)]
    Active,
    #[n(1)]
    Terminated,
}

/// An organization employee who physically retrieves items. Termination is
/// a soft status flip so past pickups keep a resolvable collector.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq)]
pub struct Collector {
    #[n(0)]
    pub id: String, // uuid7, bech32 encoded with hrp "col"
    #[n(1)]
    pub organization_id: String,
    #[n(2)]
    pub name: String,
    #[n(3)]
    pub contact: String,
    #[n(4)]
    pub status: EmploymentStatus,
    #[n(5)]
    pub created_at: TimeStamp<Utc>,
}

impl Collector {
    pub fn new(id: String, organization_id: String, name: String, contact: String) -> Self {
        Self {
            id,
            organization_id,
            name,
            contact,
            status: EmploymentStatus::Active,
            created_at: TimeStamp::new(),
        }
    }
    pub fn is_active(&self) -> bool {
        self.status == EmploymentStatus::Active
    }
}
