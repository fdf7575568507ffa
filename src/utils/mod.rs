pub mod lenient;
pub mod password;
pub mod validation;
