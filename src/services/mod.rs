pub mod audit;
pub mod notifications;
pub mod rule_resolver;
pub mod stock_ledger;
pub mod tenants;
