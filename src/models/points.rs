use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Earn,
    Redeem,
    Revert,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Earn => "earn",
            TransactionKind::Redeem => "redeem",
            TransactionKind::Revert => "revert",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "earn" => Some(TransactionKind::Earn),
            "redeem" => Some(TransactionKind::Redeem),
            "revert" => Some(TransactionKind::Revert),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointsTransaction {
    pub id: i64,
    pub user_id: i64,
    pub points: i64,
    pub kind: TransactionKind,
    pub reverts: Option<TransactionKind>,
    pub booking_id: Option<i64>,
    pub description: Option<String>,
    pub created_at: NaiveDateTime,
}

impl PointsTransaction {
    pub fn signed_points(&self) -> i64 {
        match (self.kind, self.reverts) {
            (TransactionKind::Earn, _) => self.points,
            (TransactionKind::Redeem, _) => -self.points,
            (TransactionKind::Revert, Some(TransactionKind::Redeem)) => self.points,
            (TransactionKind::Revert, _) => -self.points,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(kind: TransactionKind, reverts: Option<TransactionKind>, points: i64) -> PointsTransaction {
        PointsTransaction {
            id: 1,
            user_id: 1,
            points,
            kind,
            reverts,
            booking_id: None,
            description: None,
            created_at: NaiveDateTime::parse_from_str("2024-01-01 00:00:00", "%Y-%m-%d %H:%M:%S")
                .unwrap(),
        }
    }

    #[test]
    fn test_signed_points() {
        assert_eq!(tx(TransactionKind::Earn, None, 30).signed_points(), 30);
        assert_eq!(tx(TransactionKind::Redeem, None, 10).signed_points(), -10);
        assert_eq!(
            tx(TransactionKind::Revert, Some(TransactionKind::Earn), 30).signed_points(),
            -30
        );
        assert_eq!(
            tx(TransactionKind::Revert, Some(TransactionKind::Redeem), 10).signed_points(),
            10
        );
    }

    #[test]
    fn test_kind_round_trips_through_storage_tag() {
        for kind in [TransactionKind::Earn, TransactionKind::Redeem, TransactionKind::Revert] {
            assert_eq!(TransactionKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(TransactionKind::parse("bonus"), None);
    }
}
