pub mod enums;
pub mod generate;
pub mod listmodels;
