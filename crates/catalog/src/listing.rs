use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use doyashop_core::{require_email, require_non_blank, DocumentId, DomainResult, Entity, Price};

/// Stock status of a listing. Flips both ways via seller action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockStatus {
    #[default]
    Unsold,
    Sold,
}

impl StockStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockStatus::Unsold => "unsold",
            StockStatus::Sold => "sold",
        }
    }
}

impl From<StockStatus> for Value {
    fn from(value: StockStatus) -> Self {
        Value::String(value.as_str().to_string())
    }
}

/// Advertisement flag. Set once by the seller; never unset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdFlag {
    #[default]
    Off,
    Add,
}

impl AdFlag {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdFlag::Off => "off",
            AdFlag::Add => "add",
        }
    }
}

impl From<AdFlag> for Value {
    fn from(value: AdFlag) -> Self {
        Value::String(value.as_str().to_string())
    }
}

/// A phone offered for resale by a seller, within one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    #[serde(rename = "_id")]
    pub id: DocumentId,
    pub name: String,
    pub category_id: DocumentId,
    /// Seller email.
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seller_name: Option<String>,
    pub resale_price: Price,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_price: Option<Price>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub years_of_use: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, alias = "stokeStatus")]
    pub stock_status: StockStatus,
    #[serde(default)]
    pub is_ad: AdFlag,
    pub posted_at: DateTime<Utc>,
}

impl Listing {
    pub const CATEGORY_ID: &'static str = "categoryId";
    pub const EMAIL: &'static str = "email";
    pub const STOCK_STATUS: &'static str = "stockStatus";
    pub const IS_AD: &'static str = "isAd";

    /// Build a new, unsold, un-advertised listing owned by `seller_email`.
    pub fn create(
        id: DocumentId,
        seller_email: &str,
        req: NewListing,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        require_non_blank("name", &req.name)?;
        require_email("email", seller_email)?;

        Ok(Self {
            id,
            name: req.name.trim().to_string(),
            category_id: req.category_id,
            email: seller_email.trim().to_string(),
            seller_name: req.seller_name,
            resale_price: req.resale_price,
            original_price: req.original_price,
            years_of_use: req.years_of_use,
            condition: req.condition,
            location: req.location,
            contact: req.contact,
            image: req.image,
            description: req.description,
            stock_status: StockStatus::Unsold,
            is_ad: AdFlag::Off,
            posted_at: now,
        })
    }
}

impl Entity for Listing {
    fn id(&self) -> DocumentId {
        self.id
    }
}

/// Listing creation payload.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewListing {
    pub name: String,
    pub category_id: DocumentId,
    /// Seller email; defaults to the authenticated identity.
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub seller_name: Option<String>,
    pub resale_price: Price,
    #[serde(default)]
    pub original_price: Option<Price>,
    #[serde(default)]
    pub years_of_use: Option<u32>,
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub contact: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Listing read queries, expressed as field-equality criteria.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingQuery {
    /// Category browsing: sold listings are excluded.
    UnsoldInCategory(DocumentId),
    /// Promotional feed: unsold and advertised.
    Advertised,
    /// Everything a seller has posted, any status.
    BySeller(String),
}

impl ListingQuery {
    pub fn criteria(&self) -> Vec<(&'static str, Value)> {
        match self {
            ListingQuery::UnsoldInCategory(category_id) => vec![
                (Listing::CATEGORY_ID, (*category_id).into()),
                (Listing::STOCK_STATUS, StockStatus::Unsold.into()),
            ],
            ListingQuery::Advertised => vec![
                (Listing::STOCK_STATUS, StockStatus::Unsold.into()),
                (Listing::IS_AD, AdFlag::Add.into()),
            ],
            ListingQuery::BySeller(email) => {
                vec![(Listing::EMAIL, Value::String(email.clone()))]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doyashop_infra::{to_document, Filter};

    /// Evaluate `query` the way the store does: as a document filter.
    fn selects(query: &ListingQuery, listing: &Listing) -> bool {
        Filter::from_criteria(query.criteria()).matches(&to_document(listing).unwrap())
    }

    fn listing_in(category_id: DocumentId) -> Listing {
        Listing::create(DocumentId::new(), "s@x.com", new_listing(category_id), Utc::now()).unwrap()
    }

    fn new_listing(category_id: DocumentId) -> NewListing {
        NewListing {
            name: "Pixel 7".to_string(),
            category_id,
            email: None,
            seller_name: Some("Sam".to_string()),
            resale_price: Price::new(320.0).unwrap(),
            original_price: Some(Price::new(599.0).unwrap()),
            years_of_use: Some(1),
            condition: Some("good".to_string()),
            location: Some("Dhaka".to_string()),
            contact: None,
            image: None,
            description: None,
        }
    }

    #[test]
    fn created_listing_is_unsold_and_not_advertised() {
        let listing = listing_in(DocumentId::new());
        assert_eq!(listing.stock_status, StockStatus::Unsold);
        assert_eq!(listing.is_ad, AdFlag::Off);
        assert_eq!(listing.email, "s@x.com");
    }

    #[test]
    fn stored_shape_uses_filter_field_names() {
        let listing = listing_in(DocumentId::new());
        let json = serde_json::to_value(&listing).unwrap();
        for (field, _) in ListingQuery::UnsoldInCategory(listing.category_id).criteria() {
            assert!(json.get(field).is_some(), "missing {field}");
        }
        assert!(json.get(Listing::IS_AD).is_some());
        assert!(json.get(Listing::EMAIL).is_some());
    }

    #[test]
    fn legacy_stoke_status_field_is_accepted() {
        let mut json = serde_json::to_value(listing_in(DocumentId::new())).unwrap();
        let obj = json.as_object_mut().unwrap();
        obj.remove(Listing::STOCK_STATUS);
        obj.insert("stokeStatus".to_string(), Value::String("sold".to_string()));

        let listing: Listing = serde_json::from_value(json).unwrap();
        assert_eq!(listing.stock_status, StockStatus::Sold);
    }

    #[test]
    fn category_browse_excludes_sold() {
        let category = DocumentId::new();
        let mut listing = listing_in(category);
        let query = ListingQuery::UnsoldInCategory(category);
        assert!(selects(&query, &listing));
        assert!(!selects(&ListingQuery::UnsoldInCategory(DocumentId::new()), &listing));

        listing.stock_status = StockStatus::Sold;
        assert!(!selects(&query, &listing));
    }

    #[test]
    fn ads_feed_requires_unsold_and_flag() {
        let mut listing = listing_in(DocumentId::new());
        assert!(!selects(&ListingQuery::Advertised, &listing));

        listing.is_ad = AdFlag::Add;
        assert!(selects(&ListingQuery::Advertised, &listing));

        listing.stock_status = StockStatus::Sold;
        assert!(!selects(&ListingQuery::Advertised, &listing));
    }

    #[test]
    fn seller_query_matches_any_status() {
        let mut listing = listing_in(DocumentId::new());
        listing.stock_status = StockStatus::Sold;
        assert!(selects(&ListingQuery::BySeller("s@x.com".to_string()), &listing));
        assert!(!selects(&ListingQuery::BySeller("t@x.com".to_string()), &listing));
    }

    #[test]
    fn invalid_payload_is_rejected() {
        let mut req = new_listing(DocumentId::new());
        req.name = "  ".to_string();
        assert!(Listing::create(DocumentId::new(), "s@x.com", req, Utc::now()).is_err());
        let bad_email = Listing::create(
            DocumentId::new(),
            "not-an-email",
            new_listing(DocumentId::new()),
            Utc::now(),
        );
        assert!(bad_email.is_err());
    }
}
