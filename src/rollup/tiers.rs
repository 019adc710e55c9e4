// Tier tables: bucket width + retention per resolution, and the "best tier for N hours" policy.

pub const MINUTE: i64 = 60;
pub const HOUR: i64 = 3_600;
pub const DAY: i64 = 86_400;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierConfig {
    pub name: &'static str,
    pub interval_secs: i64,
    pub retention_secs: i64,
    pub label: &'static str,
}

impl TierConfig {
    pub const fn new(
        name: &'static str,
        interval_secs: i64,
        retention_secs: i64,
        label: &'static str,
    ) -> Self {
        Self {
            name,
            interval_secs,
            retention_secs,
            label,
        }
    }

    /// Start of the bucket containing `timestamp`. Floors toward negative infinity.
    pub fn bucket_start(&self, timestamp: i64) -> i64 {
        timestamp.div_euclid(self.interval_secs) * self.interval_secs
    }
}

pub const TIER_1MIN: TierConfig = TierConfig::new("1min", MINUTE, 6 * HOUR, "1-minute averages");
pub const TIER_5MIN: TierConfig =
    TierConfig::new("5min", 5 * MINUTE, 48 * HOUR, "5-minute averages");
pub const TIER_30MIN: TierConfig =
    TierConfig::new("30min", 30 * MINUTE, 14 * DAY, "30-minute averages");
pub const TIER_2HOUR: TierConfig = TierConfig::new("2hour", 2 * HOUR, 90 * DAY, "2-hour averages");

/// Ordered tiers (finest first) plus the hour thresholds used to pick one for a query span.
/// `hour_thresholds[i]` is the longest span (inclusive) served by `tiers[i]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierSet {
    tiers: Vec<TierConfig>,
    hour_thresholds: Vec<u32>,
}

impl TierSet {
    /// `None` when the set is empty or an interval is not positive.
    pub fn new(tiers: Vec<TierConfig>, hour_thresholds: Vec<u32>) -> Option<Self> {
        if tiers.is_empty() || tiers.iter().any(|t| t.interval_secs <= 0) {
            return None;
        }
        Some(Self {
            tiers,
            hour_thresholds,
        })
    }

    /// 1min/5min/30min/2hour kept 6h/48h/14d/90d; thresholds 6/48/336 hours.
    pub fn standard() -> Self {
        Self {
            tiers: vec![TIER_1MIN, TIER_5MIN, TIER_30MIN, TIER_2HOUR],
            hour_thresholds: vec![6, 48, 336],
        }
    }

    /// Standard tiers with every retention capped at `budget_secs`.
    pub fn capped(budget_secs: i64) -> Self {
        let mut set = Self::standard();
        for tier in &mut set.tiers {
            tier.retention_secs = tier.retention_secs.min(budget_secs);
        }
        set
    }

    /// Tiers sized to a voltage retention budget. Coarser tiers appear only once the
    /// budget is long enough to need them.
    pub fn voltage(retention_days: u32) -> Self {
        let budget = i64::from(retention_days) * DAY;
        let mut tiers = vec![TierConfig {
            retention_secs: TIER_1MIN.retention_secs.min(budget),
            ..TIER_1MIN
        }];
        if retention_days > 1 {
            tiers.push(TierConfig {
                retention_secs: TIER_5MIN.retention_secs.min(budget),
                ..TIER_5MIN
            });
        }
        if retention_days > 3 {
            tiers.push(TierConfig {
                retention_secs: (7 * DAY).min(budget),
                ..TIER_30MIN
            });
        }
        if retention_days > 7 {
            tiers.push(TierConfig {
                retention_secs: budget,
                ..TIER_2HOUR
            });
        }
        Self {
            tiers,
            hour_thresholds: vec![6, 48, 168],
        }
    }

    pub fn tiers(&self) -> &[TierConfig] {
        &self.tiers
    }

    pub fn get(&self, name: &str) -> Option<&TierConfig> {
        self.tiers.iter().find(|t| t.name == name)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.tiers.iter().position(|t| t.name == name)
    }

    pub fn finest(&self) -> &TierConfig {
        &self.tiers[0]
    }

    pub fn coarsest_interval(&self) -> i64 {
        self.tiers
            .iter()
            .map(|t| t.interval_secs)
            .max()
            .unwrap_or(MINUTE)
    }

    /// Coarsest tier that still gives acceptable resolution for `hours_back`.
    pub fn best_tier_for_hours(&self, hours_back: u32) -> &TierConfig {
        let idx = self
            .hour_thresholds
            .iter()
            .filter(|&&limit| hours_back > limit)
            .count();
        &self.tiers[idx.min(self.tiers.len() - 1)]
    }
}

/// "30 seconds", "5 minutes", "2 hours".
pub fn format_interval(seconds: i64) -> String {
    if seconds < MINUTE {
        format!("{seconds} seconds")
    } else if seconds < HOUR {
        format!("{} minutes", ratio(seconds, MINUTE))
    } else {
        format!("{} hours", ratio(seconds, HOUR))
    }
}

/// "30 minutes", "6 hours", "14 days".
pub fn format_duration(seconds: i64) -> String {
    if seconds < HOUR {
        format!("{} minutes", ratio(seconds, MINUTE))
    } else if seconds < DAY {
        format!("{} hours", ratio(seconds, HOUR))
    } else {
        format!("{} days", ratio(seconds, DAY))
    }
}

fn ratio(seconds: i64, unit: i64) -> f64 {
    seconds as f64 / unit as f64
}
