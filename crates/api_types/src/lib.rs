use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Body of every error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Distinguishes an absent JSON field (`None`) from an explicit `null`
/// (`Some(None)`), for patch payloads that can clear optional values.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

pub mod user {
    use super::*;

    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum Theme {
        #[default]
        Light,
        Dark,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Preferences {
        pub currency: String,
        pub theme: Theme,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Register {
        pub username: String,
        pub email: String,
        pub password: String,
        pub first_name: String,
        pub last_name: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Login {
        pub email: String,
        pub password: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct UserView {
        pub id: String,
        pub username: String,
        pub email: String,
        pub first_name: String,
        pub last_name: String,
        pub preferences: Preferences,
    }

    /// Returned by register and login.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct AuthResponse {
        pub token: String,
        pub user: UserView,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct ProfileUpdate {
        pub first_name: Option<String>,
        pub last_name: Option<String>,
        pub currency: Option<String>,
        pub theme: Option<Theme>,
    }
}

pub mod transaction {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum TransactionKind {
        Income,
        Expense,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum Frequency {
        Daily,
        Weekly,
        Monthly,
        Yearly,
    }

    /// Recurrence descriptor. Serialized with a `kind` tag:
    /// `{"kind":"not_recurring"}` or
    /// `{"kind":"recurring","frequency":"monthly","next_date":"..."}`.
    #[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
    #[serde(tag = "kind", rename_all = "snake_case")]
    pub enum Recurrence {
        #[default]
        NotRecurring,
        Recurring {
            frequency: Frequency,
            next_date: DateTime<FixedOffset>,
        },
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionNew {
        /// Must be > 0.
        pub amount_minor: i64,
        pub kind: TransactionKind,
        pub category: String,
        pub description: String,
        /// RFC3339 timestamp. If absent, server uses now().
        pub occurred_at: Option<DateTime<FixedOffset>>,
        pub budget_id: Option<Uuid>,
        #[serde(default)]
        pub recurrence: Recurrence,
        #[serde(default)]
        pub tags: Vec<String>,
    }

    /// Partial update. Absent fields are kept; `"budget_id": null` clears the
    /// budget reference.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct TransactionUpdate {
        pub amount_minor: Option<i64>,
        pub kind: Option<TransactionKind>,
        pub category: Option<String>,
        pub description: Option<String>,
        pub occurred_at: Option<DateTime<FixedOffset>>,
        #[serde(
            default,
            deserialize_with = "double_option",
            skip_serializing_if = "Option::is_none"
        )]
        pub budget_id: Option<Option<Uuid>>,
        pub recurrence: Option<Recurrence>,
        pub tags: Option<Vec<String>>,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct TransactionView {
        pub id: Uuid,
        pub amount_minor: i64,
        pub kind: TransactionKind,
        pub category: String,
        pub description: String,
        pub occurred_at: DateTime<FixedOffset>,
        pub budget_id: Option<Uuid>,
        pub recurrence: Recurrence,
        pub tags: Vec<String>,
    }

    /// Response of create/update/delete.
    ///
    /// `warnings` lists budget reconciliations that failed; the transaction
    /// write itself has succeeded whenever this body is returned.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionMutation {
        pub transaction: TransactionView,
        pub warnings: Vec<String>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct TransactionQuery {
        pub page: Option<u64>,
        pub limit: Option<u64>,
        pub kind: Option<TransactionKind>,
        pub category: Option<String>,
        pub start: Option<DateTime<FixedOffset>>,
        pub end: Option<DateTime<FixedOffset>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Pagination {
        pub current: u64,
        pub pages: u64,
        pub total: u64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionListResponse {
        pub transactions: Vec<TransactionView>,
        pub pagination: Pagination,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct SummaryQuery {
        pub start: Option<DateTime<FixedOffset>>,
        pub end: Option<DateTime<FixedOffset>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct KindTotal {
        pub kind: TransactionKind,
        pub total_minor: i64,
        pub count: u64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CategoryTotal {
        pub category: String,
        pub total_minor: i64,
        pub count: u64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SummaryResponse {
        pub summary: Vec<KindTotal>,
        pub category_breakdown: Vec<CategoryTotal>,
    }
}

pub mod budget {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum BudgetPeriod {
        Daily,
        Weekly,
        Monthly,
        Yearly,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
    pub struct Alerts {
        pub enabled: bool,
        /// Percentage in `0..=100`.
        pub threshold: u8,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BudgetNew {
        pub name: String,
        pub category: String,
        pub limit_minor: i64,
        pub period: BudgetPeriod,
        pub start_date: DateTime<FixedOffset>,
        pub end_date: DateTime<FixedOffset>,
        pub alerts: Option<Alerts>,
    }

    /// Partial update. `spent_minor` is the field written by reconciliation.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct BudgetUpdate {
        #[serde(skip_serializing_if = "Option::is_none")]
        pub name: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub category: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub limit_minor: Option<i64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub spent_minor: Option<i64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub period: Option<BudgetPeriod>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub start_date: Option<DateTime<FixedOffset>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub end_date: Option<DateTime<FixedOffset>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub is_active: Option<bool>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub alerts: Option<Alerts>,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct GoalView {
        pub id: Uuid,
        pub description: String,
        pub target_amount_minor: i64,
        pub current_amount_minor: i64,
        pub target_date: DateTime<FixedOffset>,
        pub is_completed: bool,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GoalNew {
        pub description: String,
        pub target_amount_minor: i64,
        pub target_date: DateTime<FixedOffset>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct GoalUpdate {
        pub description: Option<String>,
        pub target_amount_minor: Option<i64>,
        pub current_amount_minor: Option<i64>,
        pub target_date: Option<DateTime<FixedOffset>>,
        pub is_completed: Option<bool>,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct BudgetView {
        pub id: Uuid,
        pub name: String,
        pub category: String,
        pub limit_minor: i64,
        pub spent_minor: i64,
        pub remaining_minor: i64,
        pub percentage_spent: f64,
        pub period: BudgetPeriod,
        pub start_date: DateTime<FixedOffset>,
        pub end_date: DateTime<FixedOffset>,
        pub is_active: bool,
        pub alerts: Alerts,
        pub goals: Vec<GoalView>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct BudgetQuery {
        pub active: Option<bool>,
        pub category: Option<String>,
        pub period: Option<BudgetPeriod>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BudgetListResponse {
        pub budgets: Vec<BudgetView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CategoryUsage {
        pub budget_id: Uuid,
        pub category: String,
        pub limit_minor: i64,
        pub spent_minor: i64,
        pub percentage: f64,
        pub remaining_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AnalyticsResponse {
        pub total_budgets: u64,
        pub total_limit_minor: i64,
        pub total_spent_minor: i64,
        pub budgets_over_limit: u64,
        pub budgets_near_limit: u64,
        pub category_breakdown: Vec<CategoryUsage>,
    }
}

#[cfg(test)]
mod tests {
    use super::transaction::{Recurrence, TransactionUpdate};

    #[test]
    fn update_distinguishes_missing_and_null_budget() {
        let missing: TransactionUpdate = serde_json::from_str(r#"{"amount_minor": 10}"#).unwrap();
        assert_eq!(missing.budget_id, None);

        let cleared: TransactionUpdate = serde_json::from_str(r#"{"budget_id": null}"#).unwrap();
        assert_eq!(cleared.budget_id, Some(None));
    }

    #[test]
    fn recurrence_is_tagged() {
        let value: Recurrence = serde_json::from_str(r#"{"kind":"not_recurring"}"#).unwrap();
        assert_eq!(value, Recurrence::NotRecurring);

        let value: Recurrence = serde_json::from_str(
            r#"{"kind":"recurring","frequency":"monthly","next_date":"2026-02-01T00:00:00+00:00"}"#,
        )
        .unwrap();
        assert!(matches!(value, Recurrence::Recurring { .. }));
    }
}
