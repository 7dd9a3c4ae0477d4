use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Food,
    Transport,
    Shopping,
    Bills,
    Health,
    Other,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Food => "food",
            Category::Transport => "transport",
            Category::Shopping => "shopping",
            Category::Bills => "bills",
            Category::Health => "health",
            Category::Other => "other",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "food" => Some(Category::Food),
            "transport" => Some(Category::Transport),
            "shopping" => Some(Category::Shopping),
            "bills" => Some(Category::Bills),
            "health" => Some(Category::Health),
            "other" => Some(Category::Other),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Expense {
    pub id: String,
    pub user_id: String,
    pub amount: i64,
    pub category: Category,
    pub description: String,
    pub created_at: chrono::NaiveDateTime,
}

#[derive(Clone, Debug, Deserialize)]
pub struct NewExpense {
    pub user_id: String,
    pub amount: i64,
    pub category: String,
    pub description: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct UpdateExpense {
    pub user_id: String,
    pub amount: i64,
    pub category: String,
    pub description: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExpenseFilter {
    Daily,
    Weekly,
    Monthly,
}

impl ExpenseFilter {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "daily" => Some(ExpenseFilter::Daily),
            "weekly" => Some(ExpenseFilter::Weekly),
            "monthly" => Some(ExpenseFilter::Monthly),
            _ => None,
        }
    }

    /// Start of the window the filter selects, relative to `now`.
    pub fn since(&self, now: chrono::NaiveDateTime) -> chrono::NaiveDateTime {
        match self {
            ExpenseFilter::Daily => now.date().and_hms_opt(0, 0, 0).unwrap_or(now),
            ExpenseFilter::Weekly => now - chrono::Duration::days(7),
            ExpenseFilter::Monthly => now - chrono::Duration::days(30),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_round_trips_through_strings() {
        for name in ["food", "transport", "shopping", "bills", "health", "other"] {
            let category = Category::parse(name).unwrap();
            assert_eq!(category.as_str(), name);
        }
        assert!(Category::parse("rent").is_none());
    }

    #[test]
    fn daily_window_starts_at_midnight() {
        let now = chrono::NaiveDate::from_ymd_opt(2026, 3, 14)
            .unwrap()
            .and_hms_opt(15, 9, 26)
            .unwrap();
        let since = ExpenseFilter::Daily.since(now);
        assert_eq!(since.date(), now.date());
        assert_eq!(since.time(), chrono::NaiveTime::from_hms_opt(0, 0, 0).unwrap());
    }

    #[test]
    fn weekly_and_monthly_windows_look_back() {
        let now = chrono::Utc::now().naive_utc();
        assert_eq!(ExpenseFilter::Weekly.since(now), now - chrono::Duration::days(7));
        assert_eq!(ExpenseFilter::Monthly.since(now), now - chrono::Duration::days(30));
    }
}
