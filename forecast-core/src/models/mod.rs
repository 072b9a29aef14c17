mod forecast;
mod parcel;
mod policy;
mod reference;
mod tax_class;

pub use forecast::{
    AppealsAndExemptions, ClassResult, ClassTierCounts, ExemptionEstimate, FLAG_NOT_SET,
    FlagCounts, ForecastRequest, ForecastResponse, MultiClassBehavior, MultiClassDataSources,
    MultiClassFlagCounts, TierCountRequest, TierCountResponse, TierCountRow, TierRevenueRow,
};
pub use parcel::{ParcelKey, ParcelRecord};
pub use policy::{
    AppealMap, AppealsPayload, ClassPolicy, ClassPolicyPayload, Policy, PolicyError,
    PolicyPayload, RateSchedule, TierPayload, TierSpec,
};
pub use reference::{
    ComparisonData, ComparisonFigures, ReferenceData, ReferenceError, ReferenceSchedule,
};
pub use tax_class::TaxClass;
