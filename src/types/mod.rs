pub mod line;
pub mod rational;
pub mod time_signature;
pub mod token;
