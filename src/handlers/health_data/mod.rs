pub mod medical_history;
pub mod vital_signs;
