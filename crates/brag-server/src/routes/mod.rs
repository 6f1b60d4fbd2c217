pub mod brag;
pub mod generate;
pub mod generated;
pub mod ledger;
pub mod tasks;
