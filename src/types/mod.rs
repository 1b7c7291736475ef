mod category;
mod feature;
mod parcel;
mod region;

pub use category::Category;
pub use feature::{Feature, Record, SourceId};
pub use parcel::{Parcel, ParcelSummary};
pub use region::ResolvedRegion;
