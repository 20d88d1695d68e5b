//! Wire shape of the discounts read feed.

use serde::{Deserialize, Serialize};

use atelier_catalog::{CategoryId, DiscountId, DiscountScope, ProductId};
use atelier_core::{AggregateId, DomainResult, Percent};

use crate::rule::DiscountRule;
use crate::window::PromotionWindow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordScope {
    Product,
    Category,
}

/// One discount as published by the feed. Timestamps are kept as strings so a
/// record with a bad window still deserializes and is then treated as inactive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub scope: RecordScope,
    pub target_id: String,
    pub percent: u8,
    pub start_time: String,
    pub end_time: String,
}

impl DiscountRecord {
    pub fn into_rule(self) -> DomainResult<DiscountRule> {
        let target: AggregateId = self.target_id.parse()?;
        let scope = match self.scope {
            RecordScope::Product => DiscountScope::Product(ProductId::new(target)),
            RecordScope::Category => DiscountScope::Category(CategoryId::new(target)),
        };
        let id = match self.id.as_deref() {
            Some(raw) => Some(DiscountId::new(raw.parse()?)),
            None => None,
        };
        Ok(DiscountRule {
            id,
            scope,
            percent: Percent::new(self.percent)?,
            window: PromotionWindow::parse(&self.start_time, &self.end_time),
        })
    }
}

impl From<&DiscountRule> for DiscountRecord {
    fn from(rule: &DiscountRule) -> Self {
        let (scope, target) = match rule.scope {
            DiscountScope::Product(p) => (RecordScope::Product, p.to_string()),
            DiscountScope::Category(c) => (RecordScope::Category, c.to_string()),
        };
        let stamp = |t: Option<chrono::DateTime<chrono::Utc>>| t.map(|t| t.to_rfc3339()).unwrap_or_default();
        Self {
            id: rule.id.map(|id| id.to_string()),
            scope,
            target_id: target,
            percent: rule.percent.value(),
            start_time: stamp(rule.window.starts_at()),
            end_time: stamp(rule.window.ends_at()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atelier_core::DomainError;
    use chrono::{TimeZone, Utc};

    fn record_json(scope: &str, target: &str, percent: u8, start: &str, end: &str) -> String {
        format!(
            r#"{{"scope":"{scope}","target_id":"{target}","percent":{percent},"start_time":"{start}","end_time":"{end}"}}"#
        )
    }

    #[test]
    fn converts_a_category_record() {
        let target = AggregateId::new();
        let json = record_json("category", &target.to_string(), 15, "2026-03-01", "2026-03-31T23:59:59Z");
        let record: DiscountRecord = serde_json::from_str(&json).unwrap();
        let rule = record.into_rule().unwrap();

        assert_eq!(rule.scope, DiscountScope::Category(CategoryId::new(target)));
        assert_eq!(rule.percent.value(), 15);
        assert_eq!(rule.id, None);
        assert!(rule.is_active_at(Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap()));
        assert!(rule.is_active_at(Utc.with_ymd_and_hms(2026, 3, 31, 23, 59, 59).unwrap()));
        assert!(!rule.is_active_at(Utc.with_ymd_and_hms(2026, 4, 1, 0, 0, 0).unwrap()));
    }

    #[test]
    fn bad_timestamps_still_convert_but_never_match() {
        let target = AggregateId::new();
        let json = record_json("product", &target.to_string(), 40, "whenever", "2099-01-01");
        let rule: DiscountRule = serde_json::from_str::<DiscountRecord>(&json)
            .unwrap()
            .into_rule()
            .unwrap();
        assert!(!rule.is_active_at(Utc.with_ymd_and_hms(2050, 1, 1, 0, 0, 0).unwrap()));
    }

    #[test]
    fn malformed_target_is_an_invalid_id() {
        let json = record_json("product", "sku-42", 10, "2026-03-01", "2026-03-02");
        let err = serde_json::from_str::<DiscountRecord>(&json)
            .unwrap()
            .into_rule()
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidId(_)));
    }

    #[test]
    fn percent_over_hundred_is_rejected() {
        let json = record_json("product", &AggregateId::new().to_string(), 120, "2026-03-01", "2026-03-02");
        let err = serde_json::from_str::<DiscountRecord>(&json)
            .unwrap()
            .into_rule()
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn unknown_scope_fails_to_deserialize() {
        let json = record_json("brand", &AggregateId::new().to_string(), 10, "2026-03-01", "2026-03-02");
        assert!(serde_json::from_str::<DiscountRecord>(&json).is_err());
    }

    #[test]
    fn rule_renders_back_to_a_record() {
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        let rule = DiscountRule {
            id: Some(DiscountId::new(AggregateId::new())),
            scope: DiscountScope::Product(ProductId::new(AggregateId::new())),
            percent: Percent::new(20).unwrap(),
            window: PromotionWindow::new(start, start + chrono::Duration::days(1)),
        };
        let record = DiscountRecord::from(&rule);
        assert_eq!(record.scope, RecordScope::Product);
        assert_eq!(record.into_rule().unwrap(), rule);
    }
}
