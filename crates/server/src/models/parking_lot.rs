//! Parking lot domain type.

use chrono::{DateTime, Utc};
use serde::Serialize;

use garagem_core::{Email, ParkingLotId, UserId};

/// Name shown for a lot whose stored name is blank.
pub const UNKNOWN_LOT_NAME: &str = "Desconhecido";

/// A parking facility owned by one user and optionally shared by email.
///
/// `owner_id` never changes after creation. `shared_with` never contains the
/// owner's email and holds no duplicates; the record store enforces the
/// latter with atomic set operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParkingLot {
    pub id: ParkingLotId,
    pub name: String,
    pub owner_id: UserId,
    pub shared_with: Vec<Email>,
    pub created_at: DateTime<Utc>,
}

impl ParkingLot {
    /// Whether `user` owns this lot.
    #[must_use]
    pub fn is_owner(&self, user: UserId) -> bool {
        self.owner_id == user
    }

    /// Whether the lot has been shared with `email`.
    #[must_use]
    pub fn is_shared_with(&self, email: &Email) -> bool {
        self.shared_with.contains(email)
    }

    /// Whether the user may operate on this lot (owner or shared).
    #[must_use]
    pub fn can_access(&self, user: UserId, email: &Email) -> bool {
        self.is_owner(user) || self.is_shared_with(email)
    }

    /// The lot name, or [`UNKNOWN_LOT_NAME`] when it is blank.
    #[must_use]
    pub fn display_name(&self) -> &str {
        let name = self.name.trim();
        if name.is_empty() { UNKNOWN_LOT_NAME } else { name }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn lot(shared: &[&str]) -> ParkingLot {
        ParkingLot {
            id: ParkingLotId::generate(),
            name: "Centro".to_string(),
            owner_id: UserId::generate(),
            shared_with: shared.iter().map(|e| Email::parse(e).unwrap()).collect(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_access_rules() {
        let lot = lot(&["ana@garagem.app"]);
        let ana = Email::parse("ana@garagem.app").unwrap();
        let bia = Email::parse("bia@garagem.app").unwrap();

        assert!(lot.can_access(lot.owner_id, &bia));
        assert!(lot.can_access(UserId::generate(), &ana));
        assert!(!lot.can_access(UserId::generate(), &bia));
    }

    #[test]
    fn test_blank_name_falls_back() {
        let mut lot = lot(&[]);
        lot.name = "   ".to_string();
        assert_eq!(lot.display_name(), "Desconhecido");
    }
}
