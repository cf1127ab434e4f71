pub mod random;
pub mod time;
pub mod validation;
