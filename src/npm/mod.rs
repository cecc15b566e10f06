pub mod package_name;
pub mod range;
pub mod registry;

pub use package_name::validate_package_name;
pub use range::{RangeOperator, is_sentinel};
pub use registry::{DEFAULT_REGISTRY, NpmRegistry};
