// One module per resource. Every protected handler follows the same shape:
// extract AuthUser -> require(permission) -> parse query/body -> firm-scoped
// SQL -> envelope the result.
pub mod audit;
pub mod auth;
pub mod clients;
pub mod compliance;
pub mod documents;
pub mod ledger;
pub mod notifications;
pub mod projects;
pub mod reports;
pub mod roles;
pub mod tally;
pub mod tasks;
