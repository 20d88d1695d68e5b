//! Where discount rules come from.

use std::path::PathBuf;

use anyhow::Context;

use atelier_pricing::{DiscountRecord, DiscountRule};

/// A provider of the full current set of discount rules.
pub trait DiscountSource: Send + Sync {
    fn fetch(&self) -> anyhow::Result<Vec<DiscountRule>>;
}

impl<F> DiscountSource for F
where
    F: Fn() -> anyhow::Result<Vec<DiscountRule>> + Send + Sync,
{
    fn fetch(&self) -> anyhow::Result<Vec<DiscountRule>> {
        self()
    }
}

#[derive(Debug, Clone)]
enum Feed {
    Inline(String),
    File(PathBuf),
}

/// Reads the discounts feed: a JSON array of [`DiscountRecord`]s.
///
/// Records that fail to decode or convert are skipped with a warning; only an
/// unreadable or non-array document fails the fetch.
#[derive(Debug, Clone)]
pub struct JsonDiscountSource {
    feed: Feed,
}

impl JsonDiscountSource {
    pub fn from_json(json: impl Into<String>) -> Self {
        Self {
            feed: Feed::Inline(json.into()),
        }
    }

    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            feed: Feed::File(path.into()),
        }
    }

    fn read(&self) -> anyhow::Result<String> {
        match &self.feed {
            Feed::Inline(json) => Ok(json.clone()),
            Feed::File(path) => std::fs::read_to_string(path)
                .with_context(|| format!("failed to read discounts feed {}", path.display())),
        }
    }
}

impl DiscountSource for JsonDiscountSource {
    fn fetch(&self) -> anyhow::Result<Vec<DiscountRule>> {
        let raw = self.read()?;
        let records: Vec<serde_json::Value> =
            serde_json::from_str(&raw).context("discounts feed is not a JSON array")?;

        let mut rules = Vec::with_capacity(records.len());
        for (index, value) in records.into_iter().enumerate() {
            let rule = serde_json::from_value::<DiscountRecord>(value)
                .map_err(anyhow::Error::from)
                .and_then(|record| record.into_rule().map_err(anyhow::Error::from));
            match rule {
                Ok(rule) => rules.push(rule),
                Err(error) => {
                    tracing::warn!(index, error = %error, "skipping malformed discount record");
                }
            }
        }
        Ok(rules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atelier_core::AggregateId;
    use std::io::Write;

    fn feed(target: AggregateId) -> String {
        format!(
            r#"[
                {{"scope":"product","target_id":"{target}","percent":20,"start_time":"2026-01-01","end_time":"2026-12-31"}},
                {{"scope":"category","target_id":"not-a-uuid","percent":10,"start_time":"2026-01-01","end_time":"2026-12-31"}},
                {{"scope":"product","target_id":"{target}","percent":"lots","start_time":"2026-01-01","end_time":"2026-12-31"}},
                {{"scope":"category","target_id":"{target}","percent":5,"start_time":"garbage","end_time":"2026-12-31"}}
            ]"#
        )
    }

    #[test]
    fn skips_bad_records_and_keeps_the_rest() {
        let target = AggregateId::new();
        let rules = JsonDiscountSource::from_json(feed(target)).fetch().unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].percent.value(), 20);
        assert_eq!(rules[1].percent.value(), 5);
        assert!(rules[1].window.starts_at().is_none());
    }

    #[test]
    fn non_array_document_fails() {
        let err = JsonDiscountSource::from_json(r#"{"discounts": []}"#).fetch().unwrap_err();
        assert!(err.to_string().contains("not a JSON array"));
    }

    #[test]
    fn reads_from_a_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(feed(AggregateId::new()).as_bytes()).unwrap();
        let rules = JsonDiscountSource::from_path(file.path()).fetch().unwrap();
        assert_eq!(rules.len(), 2);
    }

    #[test]
    fn missing_file_reports_the_path() {
        let err = JsonDiscountSource::from_path("/nonexistent/discounts.json")
            .fetch()
            .unwrap_err();
        assert!(err.to_string().contains("/nonexistent/discounts.json"));
    }

    #[test]
    fn closures_are_sources() {
        let source = || -> anyhow::Result<Vec<DiscountRule>> { Ok(vec![]) };
        assert!(DiscountSource::fetch(&source).unwrap().is_empty());
    }
}
