pub mod approval;
pub mod person;
