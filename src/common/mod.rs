pub mod errors;
pub mod utils;

pub const REGION_DEFAULT: &str = "us-west-2";
