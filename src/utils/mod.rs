pub mod error;
pub mod logger;
pub mod race;
pub mod validation;
