use std::fmt;
use std::str::FromStr;

use crate::error::ThresholdError;

use super::Tags;

/// Metric name with an optional tag filter, e.g. `http_req_duration{status:200}`.
///
/// A selector with a non-empty filter names a submetric: it only sees the
/// samples of its parent whose tags contain every filter pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MetricSelector {
    pub name: String,
    pub filter: Tags,
}

impl MetricSelector {
    #[must_use]
    pub fn metric(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            filter: Tags::new(),
        }
    }

    #[must_use]
    pub fn is_submetric(&self) -> bool {
        !self.filter.is_empty()
    }

    #[must_use]
    pub fn matches(&self, tags: &Tags) -> bool {
        self.filter
            .iter()
            .all(|(key, value)| tags.get(key).is_some_and(|tag| tag == value))
    }
}

impl fmt::Display for MetricSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if self.filter.is_empty() {
            return Ok(());
        }
        f.write_str("{")?;
        for (idx, (key, value)) in self.filter.iter().enumerate() {
            if idx > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}:{}", key, value)?;
        }
        f.write_str("}")
    }
}

impl FromStr for MetricSelector {
    type Err = ThresholdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let selector = s.trim();
        let invalid = || ThresholdError::InvalidSelector {
            selector: selector.to_owned(),
        };
        let Some((name, rest)) = selector.split_once('{') else {
            if selector.is_empty() || selector.contains('}') {
                return Err(invalid());
            }
            return Ok(Self::metric(selector));
        };
        let name = name.trim();
        let body = rest.strip_suffix('}').ok_or_else(invalid)?;
        if name.is_empty() || body.contains('{') || body.contains('}') {
            return Err(invalid());
        }

        let mut filter = Tags::new();
        for pair in body.split(',') {
            let (key, value) = pair.split_once(':').ok_or_else(invalid)?;
            let key = key.trim();
            let value = value.trim();
            if key.is_empty() {
                return Err(invalid());
            }
            filter.insert(key.to_owned(), value.to_owned());
        }
        if filter.is_empty() {
            return Err(invalid());
        }

        Ok(Self {
            name: name.to_owned(),
            filter,
        })
    }
}
