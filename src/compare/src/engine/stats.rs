//! Compare statistics

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use ldapd_core::traits::{CompareEvent, StatsSink};
use ldapd_core::types::ResultCode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time statistics snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompareMetrics {
    pub started_at: Option<DateTime<Utc>>,

    /// Comparisons that reached evaluation
    pub total_compares: u64,

    /// Result reports sent
    pub total_results: u64,

    /// TRUE plus FALSE
    pub successful: u64,

    pub compare_true: u64,
    pub compare_false: u64,
    pub no_such_attribute: u64,
    pub referrals: u64,

    /// Everything else
    pub errors: u64,

    /// Result name → count
    pub by_code: BTreeMap<String, u64>,
}

impl CompareMetrics {
    /// Share of results that were TRUE or FALSE
    pub fn success_rate(&self) -> f64 {
        if self.total_results == 0 {
            0.0
        } else {
            self.successful as f64 / self.total_results as f64
        }
    }
}

/// Lock-free counters fed by the engine
#[derive(Debug)]
pub struct CompareStats {
    started_at: DateTime<Utc>,
    compares: AtomicU64,
    results: AtomicU64,
    by_code: DashMap<ResultCode, u64>,
}

impl CompareStats {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            compares: AtomicU64::new(0),
            results: AtomicU64::new(0),
            by_code: DashMap::new(),
        }
    }

    fn count(&self, code: ResultCode) -> u64 {
        self.by_code.get(&code).map(|c| *c).unwrap_or(0)
    }

    pub fn snapshot(&self) -> CompareMetrics {
        let compare_true = self.count(ResultCode::CompareTrue);
        let compare_false = self.count(ResultCode::CompareFalse);
        let no_such_attribute = self.count(ResultCode::NoSuchAttribute);
        let referrals = self.count(ResultCode::Referral);
        let total_results = self.results.load(Ordering::Relaxed);
        let successful = self
            .by_code
            .iter()
            .filter(|e| e.key().is_compare_success())
            .map(|e| *e.value())
            .sum::<u64>();

        CompareMetrics {
            started_at: Some(self.started_at),
            total_compares: self.compares.load(Ordering::Relaxed),
            total_results,
            successful,
            compare_true,
            compare_false,
            no_such_attribute,
            referrals,
            errors: total_results
                .saturating_sub(successful + no_such_attribute + referrals),
            by_code: self
                .by_code
                .iter()
                .map(|e| (e.key().name().to_string(), *e.value()))
                .collect(),
        }
    }

    pub fn reset(&self) {
        self.compares.store(0, Ordering::Relaxed);
        self.results.store(0, Ordering::Relaxed);
        self.by_code.clear();
    }
}

impl Default for CompareStats {
    fn default() -> Self {
        Self::new()
    }
}

impl StatsSink for CompareStats {
    fn record_compare(&self, _event: &CompareEvent) {
        self.compares.fetch_add(1, Ordering::Relaxed);
    }

    fn record_result(&self, code: ResultCode) {
        self.results.fetch_add(1, Ordering::Relaxed);
        *self.by_code.entry(code).or_insert(0) += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event() -> CompareEvent {
        CompareEvent {
            conn_id: 1,
            op_id: 1,
            dn: "cn=x".to_string(),
            attribute: "cn".to_string(),
        }
    }

    #[test]
    fn test_counters() {
        let stats = CompareStats::new();
        stats.record_compare(&event());
        stats.record_compare(&event());
        stats.record_result(ResultCode::CompareTrue);
        stats.record_result(ResultCode::CompareFalse);
        stats.record_result(ResultCode::InvalidDnSyntax);
        stats.record_result(ResultCode::Referral);

        let metrics = stats.snapshot();
        assert_eq!(metrics.total_compares, 2);
        assert_eq!(metrics.total_results, 4);
        assert_eq!(metrics.compare_true, 1);
        assert_eq!(metrics.successful, 2);
        assert_eq!(metrics.referrals, 1);
        assert_eq!(metrics.errors, 1);
        assert_eq!(metrics.by_code.get("invalidDNSyntax"), Some(&1));
        assert!((metrics.success_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_reset() {
        let stats = CompareStats::new();
        stats.record_result(ResultCode::CompareTrue);
        stats.reset();
        let metrics = stats.snapshot();
        assert_eq!(metrics.total_results, 0);
        assert_eq!(metrics.success_rate(), 0.0);
    }
}
