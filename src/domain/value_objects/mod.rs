//! Value Objects for drone delivery

use chrono::{Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

mod drone_data;

pub use drone_data::{DroneData, NegligenceActionForm, Orientation, MAX_ANGLE, MIN_ANGLE};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    #[error("identifier must be positive, got {0}")]
    NonPositiveIdentifier(u64),
    #[error("{0} cannot be empty")]
    Empty(&'static str),
    #[error("invalid date `{0}`, expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("drone data out of range: {0}")]
    InvalidDroneData(String),
    #[error("sensor reading out of range: {0}")]
    InvalidReading(String),
}

/// Monotonically assigned order identifier, starting at 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct OrderIdentifier(u64);

impl OrderIdentifier {
    pub const FIRST: OrderIdentifier = OrderIdentifier(1);

    pub fn new(value: u64) -> Result<Self, ValueError> {
        if value == 0 { return Err(ValueError::NonPositiveIdentifier(value)); }
        Ok(Self(value))
    }
    pub fn as_u64(&self) -> u64 { self.0 }
    pub fn next(&self) -> Self { Self(self.0 + 1) }
}

impl TryFrom<u64> for OrderIdentifier {
    type Error = ValueError;
    fn try_from(value: u64) -> Result<Self, Self::Error> { Self::new(value) }
}

impl From<OrderIdentifier> for u64 {
    fn from(id: OrderIdentifier) -> Self { id.0 }
}

impl fmt::Display for OrderIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

/// Day-granular date used for placing and arrival dates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrderDate(NaiveDate);

impl OrderDate {
    pub fn today() -> Self { Self(Utc::now().date_naive()) }
    pub fn tomorrow() -> Self { Self::today().plus_days(1) }
    pub fn from_naive(date: NaiveDate) -> Self { Self(date) }
    pub fn parse(value: &str) -> Result<Self, ValueError> {
        NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
            .map(Self)
            .map_err(|_| ValueError::InvalidDate(value.to_string()))
    }
    pub fn plus_days(&self, days: u64) -> Self { Self(self.0.checked_add_days(Days::new(days)).unwrap_or(self.0)) }
    pub fn as_naive(&self) -> NaiveDate { self.0 }
    pub fn is_before(&self, other: &OrderDate) -> bool { self.0 < other.0 }
    pub fn is_after(&self, other: &OrderDate) -> bool { self.0 > other.0 }
}

impl fmt::Display for OrderDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0.format("%Y-%m-%d")) }
}

fn non_empty(value: String, what: &'static str) -> Result<String, ValueError> {
    let value = value.trim().to_string();
    if value.is_empty() { return Err(ValueError::Empty(what)); }
    Ok(value)
}

macro_rules! text_value {
    ($(#[$meta:meta])* $name:ident, $what:literal) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Result<Self, ValueError> {
                non_empty(value.into(), $what).map(Self)
            }
            pub fn as_str(&self) -> &str { &self.0 }
        }

        impl TryFrom<String> for $name {
            type Error = ValueError;
            fn try_from(value: String) -> Result<Self, Self::Error> { Self::new(value) }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self { value.0 }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
        }
    };
}

text_value!(
    /// Name of the product carried by an order.
    Product, "product name"
);
text_value!(
    /// Client an order is delivered to.
    Client, "client"
);
text_value!(
    /// Account name of a courier or maintainer.
    Username, "username"
);
text_value!(
    /// Identity of a drone; routing key of its order topic before assignment.
    DroneId, "drone identifier"
);
text_value!(
    /// Courier under review in a negligence report.
    Negligent, "negligent"
);
text_value!(
    /// Maintainer responsible for resolving a negligence report.
    Assignee, "assignee"
);

impl From<Username> for Negligent {
    fn from(user: Username) -> Self { Self(user.0) }
}

impl From<Username> for Assignee {
    fn from(user: Username) -> Self { Self(user.0) }
}

macro_rules! sequential_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "u64", into = "u64")]
        pub struct $name(u64);

        impl $name {
            pub const FIRST: $name = $name(1);

            pub fn new(value: u64) -> Result<Self, ValueError> {
                if value == 0 { return Err(ValueError::NonPositiveIdentifier(value)); }
                Ok(Self(value))
            }
            pub fn as_u64(&self) -> u64 { self.0 }
            pub fn next(&self) -> Self { Self(self.0 + 1) }
        }

        impl TryFrom<u64> for $name {
            type Error = ValueError;
            fn try_from(value: u64) -> Result<Self, Self::Error> { Self::new(value) }
        }

        impl From<$name> for u64 {
            fn from(id: $name) -> Self { id.0 }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
        }
    };
}

sequential_id!(
    /// Repository-assigned negligence report identifier.
    NegligenceIdentifier
);
sequential_id!(
    /// Repository-assigned issue identifier.
    IssueIdentifier
);
