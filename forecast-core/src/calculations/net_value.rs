//! Net taxable value for each parcel on the roll.

use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::models::ParcelRecord;

/// A parcel's taxable base, derived from a borrowed record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssessedParcel {
    pub class_code: u16,
    pub total_assessed_value: Decimal,
    pub total_exemption: Decimal,
    pub net_taxable_value: Decimal,
}

/// The working set for one request, plus what was left out and why.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssessedRoll {
    pub parcels: Vec<AssessedParcel>,
    pub disaster_excluded: usize,
    pub malformed_excluded: usize,
}

/// Derives net taxable values for every usable record, in roll order.
///
/// Disaster-affected parcels are dropped before anything is derived from
/// them. Records carrying a negative amount are malformed and are dropped
/// with a warning.
pub fn assess(records: &[ParcelRecord]) -> AssessedRoll {
    let mut roll = AssessedRoll {
        parcels: Vec::with_capacity(records.len()),
        ..AssessedRoll::default()
    };

    for record in records {
        if record.is_disaster_affected() {
            roll.disaster_excluded += 1;
            continue;
        }
        if record.has_negative_amount() {
            warn!(
                parcel = %record.key,
                land = %record.assessed_land_value,
                land_exemption = %record.land_exemption,
                building = %record.assessed_building_value,
                building_exemption = %record.building_exemption,
                "skipping parcel with negative assessment amount"
            );
            roll.malformed_excluded += 1;
            continue;
        }

        roll.parcels.push(AssessedParcel {
            class_code: record.tax_rate_class,
            total_assessed_value: record.total_assessed_value(),
            total_exemption: record.total_exemption(),
            net_taxable_value: record.net_taxable_value(),
        });
    }

    debug!(
        assessed = roll.parcels.len(),
        disaster_excluded = roll.disaster_excluded,
        malformed_excluded = roll.malformed_excluded,
        "assessed parcel roll"
    );

    roll
}
