use crate::utils::error::EstimatorError;
use crate::utils::validation::validate_non_negative;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 使用者輸入的車輛資料 (每次估價一筆)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleInput {
    pub brand: String,
    pub model: String,
    pub year: i32,
    pub mileage: f64,
    pub is_auction: bool,
}

impl VehicleInput {
    pub fn new(
        brand: impl Into<String>,
        model: impl Into<String>,
        year: i32,
        mileage: f64,
        is_auction: bool,
    ) -> Self {
        Self {
            brand: brand.into(),
            model: model.into(),
            year,
            mileage,
            is_auction,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingType {
    BuyItNow,
    Auction,
}

impl ListingType {
    pub fn is_auction(self) -> bool {
        matches!(self, ListingType::Auction)
    }
}

impl FromStr for ListingType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "auction" | "true" | "1" | "yes" => Ok(ListingType::Auction),
            "buy_it_now" | "bin" | "false" | "0" | "no" | "" => Ok(ListingType::BuyItNow),
            other => Err(format!("unknown listing type '{}'", other)),
        }
    }
}

impl fmt::Display for ListingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListingType::BuyItNow => write!(f, "Buy It Now"),
            ListingType::Auction => write!(f, "Auction"),
        }
    }
}

/// 模型輸入特徵；名稱與訓練時的欄位名稱一致
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    CarAge,
    Mileage,
    MilesPerYear,
    BrandTier,
    ModelRarity,
    BrandEncoded,
    ModelEncoded,
    IsAuction,
}

impl Feature {
    /// Assembly order of the derived features.
    pub const ALL: [Feature; 8] = [
        Feature::CarAge,
        Feature::Mileage,
        Feature::MilesPerYear,
        Feature::BrandTier,
        Feature::ModelRarity,
        Feature::BrandEncoded,
        Feature::ModelEncoded,
        Feature::IsAuction,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Feature::CarAge => "car_age",
            Feature::Mileage => "mileage",
            Feature::MilesPerYear => "miles_per_year",
            Feature::BrandTier => "brand_tier",
            Feature::ModelRarity => "model_rarity",
            Feature::BrandEncoded => "brand_encoded",
            Feature::ModelEncoded => "model_encoded",
            Feature::IsAuction => "is_auction",
        }
    }

    pub fn from_name(name: &str) -> Option<Feature> {
        Feature::ALL.into_iter().find(|f| f.as_str() == name)
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Anything that can answer "what is the value of feature `name`".
pub trait FeatureSource {
    fn feature_value(&self, name: &str) -> Option<f64>;
}

/// 由單筆輸入推導出的特徵 (尚未依 feature order 排序)
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleFeatures {
    pub car_age: i32,
    pub mileage: f64,
    pub miles_per_year: f64,
    pub brand_tier: i64,
    pub model_rarity: f64,
    pub brand_encoded: i64,
    pub model_encoded: i64,
    pub is_auction: bool,
}

impl VehicleFeatures {
    pub fn value(&self, feature: Feature) -> f64 {
        match feature {
            Feature::CarAge => self.car_age as f64,
            Feature::Mileage => self.mileage,
            Feature::MilesPerYear => self.miles_per_year,
            Feature::BrandTier => self.brand_tier as f64,
            Feature::ModelRarity => self.model_rarity,
            Feature::BrandEncoded => self.brand_encoded as f64,
            Feature::ModelEncoded => self.model_encoded as f64,
            Feature::IsAuction => {
                if self.is_auction {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }
}

impl FeatureSource for VehicleFeatures {
    fn feature_value(&self, name: &str) -> Option<f64> {
        Feature::from_name(name).map(|f| self.value(f))
    }
}

/// 依 feature order 排好的數值序列，可直接交給 scaler
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedFeatures {
    names: Vec<String>,
    values: Vec<f64>,
}

impl OrderedFeatures {
    pub(crate) fn new(names: Vec<String>, values: Vec<f64>) -> Self {
        debug_assert_eq!(names.len(), values.len());
        Self { names, values }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }
}

impl FeatureSource for OrderedFeatures {
    fn feature_value(&self, name: &str) -> Option<f64> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.values[i])
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PriceEstimate {
    /// Price after the floor is applied.
    pub price: f64,
    pub raw_price: f64,
    pub features: OrderedFeatures,
}

impl PriceEstimate {
    pub fn was_floored(&self) -> bool {
        self.raw_price < self.price
    }
}

/// 批次輸入 CSV 的一列；欄位保留原始文字，解析失敗只影響該列
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleRecord {
    pub brand: String,
    pub model: String,
    pub year: String,
    pub mileage: String,
    pub listing: String,
    /// Set when the CSV reader could not decode the row at all.
    #[serde(skip)]
    pub read_error: Option<String>,
}

impl VehicleRecord {
    pub fn unreadable(reason: impl Into<String>) -> Self {
        Self {
            read_error: Some(reason.into()),
            ..Self::default()
        }
    }

    pub fn to_input(&self) -> Result<VehicleInput, EstimatorError> {
        if let Some(reason) = &self.read_error {
            return Err(invalid("row", reason.clone()));
        }

        let year: i32 = self
            .year
            .trim()
            .parse()
            .map_err(|e| invalid("year", format!("'{}' is not a whole number: {}", self.year, e)))?;
        let mileage: f64 = self
            .mileage
            .trim()
            .parse()
            .map_err(|e| invalid("mileage", format!("'{}' is not a number: {}", self.mileage, e)))?;
        validate_non_negative("mileage", mileage)?;
        let listing: ListingType = self.listing.parse().map_err(|e| invalid("listing", e))?;

        Ok(VehicleInput::new(
            self.brand.trim(),
            self.model.trim(),
            year,
            mileage,
            listing.is_auction(),
        ))
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> EstimatorError {
    EstimatorError::InvalidInput {
        field: field.to_string(),
        reason: reason.into(),
    }
}

/// 批次輸出 CSV 的一列；失敗的列 `estimated_price` 為空並填入 `error`
///
/// `year` and `mileage` echo the input text so unparsable rows stay readable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimateRecord {
    pub brand: String,
    pub model: String,
    pub year: String,
    pub mileage: String,
    pub is_auction: bool,
    pub estimated_price: Option<f64>,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BatchResult {
    pub records: Vec<EstimateRecord>,
    pub succeeded: usize,
    pub failed: usize,
}
