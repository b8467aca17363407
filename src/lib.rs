pub mod cli;
pub mod db;
pub mod eligibility;
pub mod error;
pub mod export;
pub mod fmt;
pub mod importer;
pub mod kpi;
pub mod models;
pub mod payroll;
pub mod report;
pub mod settings;
pub mod store;
