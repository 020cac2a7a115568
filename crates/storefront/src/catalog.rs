//! Client-side filtering and sorting of a fetched product list.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::Product;

/// Number of products shown in the featured strip.
pub const FEATURED_COUNT: usize = 4;

/// Errors parsing filter options.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FilterError {
    #[error("unknown price range {0:?} (expected 0-50, 50-100, 100-500 or 500+)")]
    PriceRange(String),
    #[error("unknown sort key {0:?} (expected name, price-low, price-high or rating)")]
    SortKey(String),
}

/// Price buckets offered by the product listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceRange {
    /// `<= 50`
    UpTo50,
    /// `> 50` and `<= 100`
    From50To100,
    /// `> 100` and `<= 500`
    From100To500,
    /// `> 500`
    Over500,
}

impl PriceRange {
    #[must_use]
    pub fn contains(self, price: Decimal) -> bool {
        let fifty = Decimal::from(50);
        let hundred = Decimal::ONE_HUNDRED;
        let five_hundred = Decimal::from(500);

        match self {
            Self::UpTo50 => price <= fifty,
            Self::From50To100 => price > fifty && price <= hundred,
            Self::From100To500 => price > hundred && price <= five_hundred,
            Self::Over500 => price > five_hundred,
        }
    }
}

impl FromStr for PriceRange {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "0-50" => Ok(Self::UpTo50),
            "50-100" => Ok(Self::From50To100),
            "100-500" => Ok(Self::From100To500),
            "500+" => Ok(Self::Over500),
            other => Err(FilterError::PriceRange(other.to_string())),
        }
    }
}

/// Listing sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Name,
    PriceLow,
    PriceHigh,
    Rating,
}

impl SortKey {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::PriceLow => "price-low",
            Self::PriceHigh => "price-high",
            Self::Rating => "rating",
        }
    }

    /// Field name for the API's `sort` query parameter.
    #[must_use]
    pub const fn api_field(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::PriceLow | Self::PriceHigh => "price",
            Self::Rating => "rating",
        }
    }

    fn compare(self, a: &Product, b: &Product) -> Ordering {
        match self {
            Self::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            Self::PriceLow => a.price.cmp(&b.price),
            Self::PriceHigh => b.price.cmp(&a.price),
            Self::Rating => by_rating_desc(a, b),
        }
    }
}

impl FromStr for SortKey {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "name" => Ok(Self::Name),
            "price-low" => Ok(Self::PriceLow),
            "price-high" => Ok(Self::PriceHigh),
            "rating" => Ok(Self::Rating),
            other => Err(FilterError::SortKey(other.to_string())),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn by_rating_desc(a: &Product, b: &Product) -> Ordering {
    b.rating
        .unwrap_or(0.0)
        .total_cmp(&a.rating.unwrap_or(0.0))
}

/// Filters applied to the product listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    /// Exact category match.
    pub category: Option<String>,
    pub price_range: Option<PriceRange>,
    /// Case-insensitive substring of name, description or category.
    pub search: Option<String>,
    pub sort: SortKey,
}

impl ProductFilter {
    /// Whether `product` passes every set filter.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        if let Some(category) = self.category.as_deref()
            && !category.is_empty()
            && product.category != category
        {
            return false;
        }

        if let Some(range) = self.price_range
            && !range.contains(product.price)
        {
            return false;
        }

        match self.search.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => {
                let term = term.to_lowercase();
                product.name.to_lowercase().contains(&term)
                    || product.description.to_lowercase().contains(&term)
                    || product.category.to_lowercase().contains(&term)
            }
            _ => true,
        }
    }

    /// Filter then sort. The sort is stable, so ties keep API order.
    #[must_use]
    pub fn apply(&self, products: &[Product]) -> Vec<Product> {
        let mut filtered: Vec<Product> = products
            .iter()
            .filter(|product| self.matches(product))
            .cloned()
            .collect();
        filtered.sort_by(|a, b| self.sort.compare(a, b));
        filtered
    }
}

/// The `count` best-rated products.
#[must_use]
pub fn featured(products: &[Product], count: usize) -> Vec<Product> {
    let mut ranked = products.to_vec();
    ranked.sort_by(by_rating_desc);
    ranked.truncate(count);
    ranked
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn catalog() -> Vec<Product> {
        serde_json::from_value(serde_json::json!([
            {"id": 1, "name": "basil Seeds", "description": "Sabja", "category": "seeds", "price": 45, "rating": 4.1},
            {"id": 2, "name": "Almonds", "description": "California almonds", "category": "dry-fruits", "price": 650, "rating": 4.8},
            {"id": 3, "name": "Chia Seeds", "description": "Omega rich", "category": "seeds", "price": 120},
            {"id": 4, "name": "Dates", "description": "Medjool", "category": "dry-fruits", "price": 100, "rating": 3.9},
            {"id": 5, "name": "Flax", "description": "Roasted flax seeds", "category": "seeds", "price": 50, "rating": 4.8}
        ]))
        .unwrap()
    }

    fn ids(products: &[Product]) -> Vec<i64> {
        products.iter().map(|p| p.id.as_i64()).collect()
    }

    #[test]
    fn test_price_range_boundaries() {
        assert!(PriceRange::UpTo50.contains(Decimal::from(50)));
        assert!(!PriceRange::From50To100.contains(Decimal::from(50)));
        assert!(PriceRange::From50To100.contains(Decimal::from(100)));
        assert!(PriceRange::From100To500.contains(Decimal::from(500)));
        assert!(!PriceRange::Over500.contains(Decimal::from(500)));
        assert!(PriceRange::Over500.contains(Decimal::new(50001, 2)));
    }

    #[test]
    fn test_parse_options() {
        assert_eq!("500+".parse::<PriceRange>(), Ok(PriceRange::Over500));
        assert!("cheap".parse::<PriceRange>().is_err());
        assert_eq!("price-high".parse::<SortKey>(), Ok(SortKey::PriceHigh));
        assert!("newest".parse::<SortKey>().is_err());
    }

    #[test]
    fn test_default_sorts_by_name_case_insensitive() {
        let result = ProductFilter::default().apply(&catalog());
        assert_eq!(ids(&result), vec![2, 1, 3, 4, 5]);
    }

    #[test]
    fn test_category_and_price() {
        let filter = ProductFilter {
            category: Some("seeds".to_string()),
            price_range: Some(PriceRange::UpTo50),
            ..ProductFilter::default()
        };
        assert_eq!(ids(&filter.apply(&catalog())), vec![1, 5]);
    }

    #[test]
    fn test_search_matches_description_and_category() {
        let filter = ProductFilter {
            search: Some("  SEEDS ".to_string()),
            sort: SortKey::PriceLow,
            ..ProductFilter::default()
        };
        assert_eq!(ids(&filter.apply(&catalog())), vec![1, 5, 3]);

        let filter = ProductFilter {
            search: Some("medjool".to_string()),
            ..ProductFilter::default()
        };
        assert_eq!(ids(&filter.apply(&catalog())), vec![4]);
    }

    #[test]
    fn test_sort_by_rating_is_stable() {
        let filter = ProductFilter {
            sort: SortKey::Rating,
            ..ProductFilter::default()
        };
        // 2 and 5 tie at 4.8 and keep API order; unrated sorts last
        let result = filter.apply(&catalog());
        assert_eq!(ids(&result), vec![2, 5, 1, 4, 3]);
    }

    #[test]
    fn test_sort_price_high() {
        let filter = ProductFilter {
            sort: SortKey::PriceHigh,
            ..ProductFilter::default()
        };
        assert_eq!(ids(&filter.apply(&catalog())), vec![2, 3, 4, 5, 1]);
    }

    #[test]
    fn test_featured() {
        assert_eq!(ids(&featured(&catalog(), FEATURED_COUNT)), vec![2, 5, 1, 4]);
        assert!(featured(&[], FEATURED_COUNT).is_empty());
    }
}
