//! Storage and domain rules for users, transactions and budgets.
//!
//! Every operation takes the caller's `user_id` and filters by it: records
//! owned by someone else behave exactly like records that do not exist.

pub use budgets::{Alerts, Budget, BudgetPeriod, Goal};
pub use commands::{
    BudgetPatch, GoalPatch, NewBudgetCmd, NewGoalCmd, NewTransactionCmd, ProfilePatch,
    RegisterUserCmd, UpdateTransactionCmd,
};
pub use error::EngineError;
pub use ops::{
    BudgetAnalytics, BudgetListFilter, CategoryTotal, CategoryUsage, Engine, EngineBuilder, KindTotal,
    TransactionListFilter, TransactionPage, TransactionSummary, TransactionUpdated,
};
pub use transactions::{Frequency, Recurrence, Transaction, TransactionKind};
pub use users::{Preferences, Theme, User};

mod budget_goals;
mod budgets;
mod commands;
mod error;
mod ops;
mod transactions;
mod users;
mod util;

type ResultEngine<T> = Result<T, EngineError>;
