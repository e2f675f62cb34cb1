pub mod banded;
pub mod curve_fit;
pub mod extrema;
pub mod math;
pub mod rolling_calculators;
pub mod validation;
