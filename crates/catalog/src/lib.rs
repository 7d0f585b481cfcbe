//! Catalog domain: categories and phone listings.

pub mod category;
pub mod listing;

pub use category::{Category, CategoryName, NewCategory};
pub use listing::{AdFlag, Listing, ListingQuery, NewListing, StockStatus};
