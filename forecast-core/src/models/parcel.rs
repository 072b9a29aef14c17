use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Composite tax map key (TMK) identifying a parcel.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ParcelKey {
    pub division: String,
    pub zone: String,
    pub section: String,
    pub plat: String,
    pub parcel: String,
    pub cpr: String,
}

impl fmt::Display for ParcelKey {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}-{}-{}-{}",
            self.division, self.zone, self.section, self.plat, self.parcel, self.cpr
        )
    }
}

/// One row of the assessment roll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParcelRecord {
    pub key: ParcelKey,
    pub parcel_year: String,
    pub land_class: String,

    /// Billing class code. This is the only class field the forecast reads;
    /// multi-class flags on other assessor files are never consulted.
    pub tax_rate_class: u16,

    pub assessed_land_value: Decimal,
    pub land_exemption: Decimal,
    pub assessed_building_value: Decimal,
    pub building_exemption: Decimal,
}

impl ParcelRecord {
    /// Builds a record with an empty key, for callers that only care about values.
    pub fn new(
        tax_rate_class: u16,
        assessed_land_value: Decimal,
        land_exemption: Decimal,
        assessed_building_value: Decimal,
        building_exemption: Decimal,
    ) -> Self {
        Self {
            key: ParcelKey::default(),
            parcel_year: String::new(),
            land_class: String::new(),
            tax_rate_class,
            assessed_land_value,
            land_exemption,
            assessed_building_value,
            building_exemption,
        }
    }

    pub fn total_assessed_value(&self) -> Decimal {
        self.assessed_land_value + self.assessed_building_value
    }

    pub fn total_exemption(&self) -> Decimal {
        self.land_exemption + self.building_exemption
    }

    /// Assessed value less exemptions, floored at zero.
    pub fn net_taxable_value(&self) -> Decimal {
        (self.total_assessed_value() - self.total_exemption()).max(Decimal::ZERO)
    }

    /// Parcels with no land and no building value are treated as destroyed
    /// and left out of every aggregate.
    pub fn is_disaster_affected(&self) -> bool {
        self.assessed_land_value <= Decimal::ZERO && self.assessed_building_value <= Decimal::ZERO
    }

    /// True when any raw amount is negative, which the roll never legitimately holds.
    pub fn has_negative_amount(&self) -> bool {
        [
            self.assessed_land_value,
            self.land_exemption,
            self.assessed_building_value,
            self.building_exemption,
        ]
        .iter()
        .any(|amount| *amount < Decimal::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn net_taxable_value_subtracts_exemptions() {
        let record = ParcelRecord::new(9, dec!(400000), dec!(100000), dec!(600000), dec!(50000));

        assert_eq!(record.total_assessed_value(), dec!(1000000));
        assert_eq!(record.total_exemption(), dec!(150000));
        assert_eq!(record.net_taxable_value(), dec!(850000));
    }

    #[test]
    fn net_taxable_value_is_clipped_at_zero() {
        let record = ParcelRecord::new(9, dec!(100000), dec!(200000), dec!(50000), dec!(0));

        assert_eq!(record.net_taxable_value(), Decimal::ZERO);
    }

    #[test]
    fn disaster_affected_requires_both_values_empty() {
        assert!(ParcelRecord::new(3, dec!(0), dec!(0), dec!(0), dec!(0)).is_disaster_affected());
        assert!(!ParcelRecord::new(3, dec!(0), dec!(0), dec!(1), dec!(0)).is_disaster_affected());
        assert!(!ParcelRecord::new(3, dec!(1), dec!(0), dec!(0), dec!(0)).is_disaster_affected());
    }

    #[test]
    fn negative_exemption_is_flagged() {
        let record = ParcelRecord::new(3, dec!(100), dec!(-5), dec!(0), dec!(0));

        assert!(record.has_negative_amount());
        assert!(!ParcelRecord::new(3, dec!(100), dec!(0), dec!(0), dec!(0)).has_negative_amount());
    }

    #[test]
    fn key_displays_as_dashed_tmk() {
        let key = ParcelKey {
            division: "3".into(),
            zone: "9".into(),
            section: "1".into(),
            plat: "001".into(),
            parcel: "002".into(),
            cpr: "0000".into(),
        };

        assert_eq!(key.to_string(), "3-9-1-001-002-0000");
    }
}
