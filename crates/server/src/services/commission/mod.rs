pub mod commission_config;
pub mod commission_engine;
pub mod commission_workflow;


pub use commission_config::{CommissionConfig, RateLookup, RateTable, RoundingRule};
pub use commission_engine::{BackfillReport, CommissionEngine, CommissionEngineTrait, DynCommissionEngine};
pub use commission_workflow::{CommissionWorkflow, CommissionWorkflowTrait, DynCommissionWorkflow};
