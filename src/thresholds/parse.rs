use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ThresholdError;
use crate::metrics::{MetricKind, MetricSelector, MetricSnapshot};

/// Tolerance for `==` and `!=` on floating point aggregates.
const EQ_TOLERANCE: f64 = 1e-9;

/// Left-hand side of a threshold expression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Aggregation {
    Count,
    Rate,
    Value,
    Avg,
    Min,
    Max,
    Med,
    Percentile(f64),
}

impl Aggregation {
    /// Whether this aggregation is defined for a metric of `kind`.
    #[must_use]
    pub const fn supports(self, kind: MetricKind) -> bool {
        match kind {
            MetricKind::Counter => matches!(self, Aggregation::Count | Aggregation::Rate),
            MetricKind::Gauge => matches!(self, Aggregation::Value),
            MetricKind::Rate => matches!(self, Aggregation::Rate),
            MetricKind::Trend => matches!(
                self,
                Aggregation::Avg
                    | Aggregation::Min
                    | Aggregation::Max
                    | Aggregation::Med
                    | Aggregation::Percentile(_)
            ),
        }
    }

    /// Reads the aggregate out of a snapshot. Counter `rate` is per second
    /// over `elapsed`.
    #[must_use]
    pub fn observe(self, snapshot: &MetricSnapshot, elapsed: Duration) -> Option<f64> {
        match (self, snapshot) {
            (Aggregation::Count, MetricSnapshot::Counter(counter)) => Some(counter.count),
            (Aggregation::Rate, MetricSnapshot::Counter(counter)) => {
                Some(counter.per_second(elapsed.as_secs_f64()))
            }
            (Aggregation::Rate, MetricSnapshot::Rate(rate)) => Some(rate.rate()),
            (Aggregation::Value, MetricSnapshot::Gauge(gauge)) => Some(gauge.value),
            (Aggregation::Avg, MetricSnapshot::Trend(trend)) => Some(trend.avg()),
            (Aggregation::Min, MetricSnapshot::Trend(trend)) => Some(trend.min()),
            (Aggregation::Max, MetricSnapshot::Trend(trend)) => Some(trend.max()),
            (Aggregation::Med, MetricSnapshot::Trend(trend)) => Some(trend.med()),
            (Aggregation::Percentile(p), MetricSnapshot::Trend(trend)) => Some(trend.percentile(p)),
            _ => None,
        }
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Aggregation::Count => f.write_str("count"),
            Aggregation::Rate => f.write_str("rate"),
            Aggregation::Value => f.write_str("value"),
            Aggregation::Avg => f.write_str("avg"),
            Aggregation::Min => f.write_str("min"),
            Aggregation::Max => f.write_str("max"),
            Aggregation::Med => f.write_str("med"),
            Aggregation::Percentile(p) => write!(f, "p({})", p),
        }
    }
}

fn parse_aggregation(token: &str, expression: &str) -> Result<Aggregation, ThresholdError> {
    match token {
        "count" => return Ok(Aggregation::Count),
        "rate" => return Ok(Aggregation::Rate),
        "value" => return Ok(Aggregation::Value),
        "avg" => return Ok(Aggregation::Avg),
        "min" => return Ok(Aggregation::Min),
        "max" => return Ok(Aggregation::Max),
        "med" => return Ok(Aggregation::Med),
        _ => {}
    }
    let Some(inner) = token
        .strip_prefix("p(")
        .and_then(|rest| rest.strip_suffix(')'))
    else {
        return Err(ThresholdError::UnknownAggregation {
            expression: expression.to_owned(),
            aggregation: token.to_owned(),
        });
    };
    let invalid = || ThresholdError::InvalidPercentile {
        expression: expression.to_owned(),
        value: inner.to_owned(),
    };
    let value: f64 = inner.trim().parse().map_err(|_err| invalid())?;
    if !value.is_finite() || !(0.0..=100.0).contains(&value) {
        return Err(invalid());
    }
    Ok(Aggregation::Percentile(value))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    StrictEq,
    Ne,
}

impl Comparison {
    /// Longest operators first so `<=` is not read as `<`.
    const OPERATORS: [(&'static str, Comparison); 7] = [
        ("===", Comparison::StrictEq),
        ("==", Comparison::Eq),
        ("!=", Comparison::Ne),
        ("<=", Comparison::Le),
        (">=", Comparison::Ge),
        ("<", Comparison::Lt),
        (">", Comparison::Gt),
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Comparison::Lt => "<",
            Comparison::Le => "<=",
            Comparison::Gt => ">",
            Comparison::Ge => ">=",
            Comparison::Eq => "==",
            Comparison::StrictEq => "===",
            Comparison::Ne => "!=",
        }
    }

    #[must_use]
    pub fn holds(self, observed: f64, bound: f64) -> bool {
        let equal = (observed - bound).abs() <= EQ_TOLERANCE;
        match self {
            Comparison::Lt => observed < bound,
            Comparison::Le => observed <= bound,
            Comparison::Gt => observed > bound,
            Comparison::Ge => observed >= bound,
            Comparison::Eq | Comparison::StrictEq => equal,
            Comparison::Ne => !equal,
        }
    }
}

/// A parsed `<aggregate> <op> <number>` expression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdExpr {
    pub aggregation: Aggregation,
    pub comparison: Comparison,
    pub bound: f64,
}

impl ThresholdExpr {
    #[must_use]
    pub fn holds(&self, observed: f64) -> bool {
        self.comparison.holds(observed, self.bound)
    }
}

impl fmt::Display for ThresholdExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.aggregation, self.comparison.as_str(), self.bound)
    }
}

impl FromStr for ThresholdExpr {
    type Err = ThresholdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let expression = s.trim();
        if expression.is_empty() {
            return Err(ThresholdError::Empty);
        }
        let op_start = expression
            .find(['<', '>', '=', '!'])
            .ok_or_else(|| ThresholdError::MissingOperator {
                expression: expression.to_owned(),
            })?;
        let (left, rest) = expression.split_at(op_start);
        let (op, comparison) = Comparison::OPERATORS
            .into_iter()
            .find(|(op, _)| rest.starts_with(op))
            .ok_or_else(|| ThresholdError::MissingOperator {
                expression: expression.to_owned(),
            })?;
        let right = rest.get(op.len()..).unwrap_or_default().trim();

        let aggregation = parse_aggregation(&left.trim().to_ascii_lowercase(), expression)?;
        let invalid_bound = || ThresholdError::InvalidBound {
            expression: expression.to_owned(),
            value: right.to_owned(),
        };
        let bound: f64 = right.parse().map_err(|_err| invalid_bound())?;
        if !bound.is_finite() {
            return Err(invalid_bound());
        }

        Ok(Self {
            aggregation,
            comparison,
            bound,
        })
    }
}

/// A threshold bound to one metric or submetric.
#[derive(Debug, Clone, PartialEq)]
pub struct Threshold {
    pub selector: MetricSelector,
    /// Expression as written in the config.
    pub source: String,
    pub expr: ThresholdExpr,
    pub abort_on_fail: bool,
    /// Minimum elapsed run time before a failing abort threshold may abort.
    pub delay_abort_eval: Duration,
}

impl Threshold {
    /// Parses `expression` against the metric `selector`.
    ///
    /// # Errors
    ///
    /// Returns an error when the selector or expression is malformed.
    pub fn parse(selector: &str, expression: &str) -> Result<Self, ThresholdError> {
        Ok(Self {
            selector: selector.parse()?,
            source: expression.trim().to_owned(),
            expr: expression.parse()?,
            abort_on_fail: false,
            delay_abort_eval: Duration::ZERO,
        })
    }

    #[must_use]
    pub const fn abort_on_fail(mut self, delay: Duration) -> Self {
        self.abort_on_fail = true;
        self.delay_abort_eval = delay;
        self
    }

    /// Rejects aggregations that can never apply to a metric of `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`ThresholdError::IncompatibleAggregation`] on mismatch.
    pub fn check_kind(&self, kind: MetricKind) -> Result<(), ThresholdError> {
        if self.expr.aggregation.supports(kind) {
            return Ok(());
        }
        Err(ThresholdError::IncompatibleAggregation {
            metric: self.selector.to_string(),
            kind: kind.as_str(),
            aggregation: self.expr.aggregation.to_string(),
        })
    }
}
