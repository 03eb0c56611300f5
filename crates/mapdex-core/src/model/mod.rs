pub mod ids;
pub mod record;

pub use ids::{format_numeric_id, parse_numeric_id, site_id, NumericId};
pub use record::{Attributes, Field, Record};
