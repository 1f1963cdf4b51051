use core::str::FromStr;

use serde::{Deserialize, Serialize};

use bloomstock_core::{DomainError, DomainResult, FlowerId};

/// Value tier of a catalog item.
///
/// The tag stored on a [`Flower`] is informational only; the ABC classifier
/// recomputes tiers from current inventory value on every pass.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AbcClass {
    A,
    B,
    C,
}

impl AbcClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            AbcClass::A => "A",
            AbcClass::B => "B",
            AbcClass::C => "C",
        }
    }
}

impl core::fmt::Display for AbcClass {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AbcClass {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(AbcClass::A),
            "B" => Ok(AbcClass::B),
            "C" => Ok(AbcClass::C),
            other => Err(DomainError::validation(
                "abc_class",
                format!("unknown ABC class '{other}'"),
            )),
        }
    }
}

/// Catalog item: a perishable flower SKU.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flower {
    pub id: FlowerId,
    pub name: String,
    pub category: String,
    /// Last known value tier (informational, not authoritative).
    pub abc_class: Option<AbcClass>,
    pub shelf_life_days: u32,
    pub unit_price: f64,
    /// Demand multiplier for the current season.
    pub seasonal_factor: f64,
    /// Observed fraction of received units passing inspection.
    pub pass_rate: f64,
    pub lead_time_days: u32,
    /// Replenishment review cadence.
    pub review_cycle_days: u32,
}

impl Flower {
    /// Construct a flower with neutral planning attributes.
    pub fn new(id: FlowerId, name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            category: category.into(),
            abc_class: None,
            shelf_life_days: 7,
            unit_price: 0.0,
            seasonal_factor: 1.0,
            pass_rate: 1.0,
            lead_time_days: 3,
            review_cycle_days: 7,
        }
    }

    pub fn with_abc_class(mut self, class: AbcClass) -> Self {
        self.abc_class = Some(class);
        self
    }

    pub fn with_unit_price(mut self, unit_price: f64) -> Self {
        self.unit_price = unit_price;
        self
    }

    pub fn with_lead_time_days(mut self, days: u32) -> Self {
        self.lead_time_days = days;
        self
    }

    pub fn with_seasonal_factor(mut self, factor: f64) -> Self {
        self.seasonal_factor = factor;
        self
    }

    pub fn with_pass_rate(mut self, pass_rate: f64) -> Self {
        self.pass_rate = pass_rate;
        self
    }

    pub fn with_shelf_life_days(mut self, days: u32) -> Self {
        self.shelf_life_days = days;
        self
    }

    /// Check catalog attributes before they are stored.
    pub fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("name", "name cannot be empty"));
        }
        if !(self.unit_price.is_finite() && self.unit_price >= 0.0) {
            return Err(DomainError::validation(
                "unit_price",
                "unit price must be a finite, non-negative number",
            ));
        }
        if !(self.seasonal_factor.is_finite() && self.seasonal_factor > 0.0) {
            return Err(DomainError::validation(
                "seasonal_factor",
                "seasonal factor must be positive",
            ));
        }
        if !(self.pass_rate.is_finite() && self.pass_rate > 0.0 && self.pass_rate <= 1.0) {
            return Err(DomainError::validation(
                "pass_rate",
                "pass rate must be within (0, 1]",
            ));
        }
        if self.shelf_life_days == 0 {
            return Err(DomainError::validation(
                "shelf_life_days",
                "shelf life must be at least one day",
            ));
        }
        Ok(())
    }
}
