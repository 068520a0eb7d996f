pub mod bootstrap;
pub mod report;
pub mod status;
