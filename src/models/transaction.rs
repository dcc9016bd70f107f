use crate::models::time_window::iso_date;
use crate::models::Coordinates;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use time::Date;

/// Property type as recorded in the price-paid data (single-character code).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum PropertyType {
    #[serde(rename = "D")]
    Detached,
    #[serde(rename = "S")]
    SemiDetached,
    #[serde(rename = "T")]
    Terraced,
    #[serde(rename = "F")]
    Flat,
    #[serde(rename = "O")]
    Other,
}

impl PropertyType {
    pub fn code(self) -> &'static str {
        match self {
            PropertyType::Detached => "D",
            PropertyType::SemiDetached => "S",
            PropertyType::Terraced => "T",
            PropertyType::Flat => "F",
            PropertyType::Other => "O",
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for PropertyType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "d" | "detached" => Ok(PropertyType::Detached),
            "s" | "semi-detached" | "semi_detached" | "semi" => Ok(PropertyType::SemiDetached),
            "t" | "terraced" | "terrace" => Ok(PropertyType::Terraced),
            "f" | "flat" => Ok(PropertyType::Flat),
            "o" | "other" => Ok(PropertyType::Other),
            _ => Err(format!(
                "Invalid property type: {} (expected one of D, S, T, F, O)",
                s
            )),
        }
    }
}

/// One price-paid transaction as held by the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionRecord {
    pub id: i64,
    /// Price paid, whole currency units
    pub price: i64,
    #[serde(with = "iso_date")]
    pub date_of_transfer: Date,
    pub postcode: String,
    pub property_type: PropertyType,
    pub new_build_flag: String,
    pub tenure_type: String,
    pub locality: String,
    pub town_city: String,
    pub district: String,
    pub county: String,
}

/// Postcode centroid from the postcode reference table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostcodeLocation {
    pub postcode: String,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// A transaction joined to its postcode coordinates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparableRecord {
    pub price: i64,
    #[serde(with = "iso_date")]
    pub date_of_transfer: Date,
    pub postcode: String,
    pub property_type: PropertyType,
    pub new_build_flag: String,
    pub tenure_type: String,
    pub locality: String,
    pub town_city: String,
    pub district: String,
    pub county: String,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Opaque store key; not part of the record's identity
    pub id: i64,
}

impl ComparableRecord {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates {
            lat: self.latitude,
            lng: self.longitude,
        }
    }

    /// Every column except `id`. Two records with equal keys are exact
    /// duplicates.
    pub fn identity_key(&self) -> ComparableKey<'_> {
        ComparableKey {
            price: self.price,
            date_of_transfer: self.date_of_transfer,
            postcode: &self.postcode,
            property_type: self.property_type,
            new_build_flag: &self.new_build_flag,
            tenure_type: &self.tenure_type,
            locality: &self.locality,
            town_city: &self.town_city,
            district: &self.district,
            county: &self.county,
            country: &self.country,
            latitude_bits: self.latitude.to_bits(),
            longitude_bits: self.longitude.to_bits(),
        }
    }
}

/// Borrowed identity of a [`ComparableRecord`]. Coordinates compare by bit
/// pattern, which is exact equality for the values a store hands back.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ComparableKey<'a> {
    price: i64,
    date_of_transfer: Date,
    postcode: &'a str,
    property_type: PropertyType,
    new_build_flag: &'a str,
    tenure_type: &'a str,
    locality: &'a str,
    town_city: &'a str,
    district: &'a str,
    county: &'a str,
    country: &'a str,
    latitude_bits: u64,
    longitude_bits: u64,
}

/// A comparable annotated with the number of POIs within the buffer radius.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedRecord {
    #[serde(flatten)]
    pub record: ComparableRecord,
    pub poi_count: u32,
}
