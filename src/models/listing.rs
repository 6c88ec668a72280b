use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
    pub id: i64,
    pub owner_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub price: f64,
    pub currency: String,
    pub rooms_available: i64,
    pub is_approved: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewListing {
    pub owner_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    #[serde(default)]
    pub price: f64,
    pub currency: Option<String>,
    pub rooms_available: i64,
}

impl NewListing {
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("title must not be empty".to_string());
        }
        if self.rooms_available < 0 {
            return Err("rooms_available must not be negative".to_string());
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err("price must be a non-negative number".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListingUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub price: Option<f64>,
    pub rooms_available: Option<i64>,
}

impl ListingUpdate {
    pub fn apply(self, listing: &mut Listing) -> Result<(), String> {
        if let Some(title) = self.title {
            if title.trim().is_empty() {
                return Err("title must not be empty".to_string());
            }
            listing.title = title;
        }
        if let Some(description) = self.description {
            listing.description = Some(description);
        }
        if let Some(location) = self.location {
            listing.location = Some(location);
        }
        if let Some(price) = self.price {
            if !price.is_finite() || price < 0.0 {
                return Err("price must be a non-negative number".to_string());
            }
            listing.price = price;
        }
        if let Some(rooms) = self.rooms_available {
            if rooms < 0 {
                return Err("rooms_available must not be negative".to_string());
            }
            listing.rooms_available = rooms;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryEntry {
    pub listing_id: i64,
    pub date: NaiveDate,
    pub rooms_booked: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing() -> Listing {
        let ts = NaiveDateTime::parse_from_str("2024-01-01 00:00:00", "%Y-%m-%d %H:%M:%S").unwrap();
        Listing {
            id: 1,
            owner_id: 7,
            title: "Jungle Lodge".to_string(),
            description: None,
            location: Some("Sinharaja".to_string()),
            price: 12000.0,
            currency: "LKR".to_string(),
            rooms_available: 4,
            is_approved: true,
            created_at: ts,
            updated_at: ts,
        }
    }

    #[test]
    fn test_update_keeps_absent_fields() {
        let mut l = listing();
        let update = ListingUpdate {
            rooms_available: Some(6),
            ..Default::default()
        };
        update.apply(&mut l).unwrap();
        assert_eq!(l.rooms_available, 6);
        assert_eq!(l.title, "Jungle Lodge");
        assert_eq!(l.location.as_deref(), Some("Sinharaja"));
    }

    #[test]
    fn test_update_rejects_negative_capacity() {
        let mut l = listing();
        let update = ListingUpdate {
            rooms_available: Some(-1),
            ..Default::default()
        };
        assert!(update.apply(&mut l).is_err());
        assert_eq!(l.rooms_available, 4);
    }

    #[test]
    fn test_new_listing_requires_title() {
        let new = NewListing {
            owner_id: 1,
            title: "  ".to_string(),
            description: None,
            location: None,
            price: 0.0,
            currency: None,
            rooms_available: 1,
        };
        assert!(new.validate().is_err());
    }
}
