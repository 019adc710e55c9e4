// Per-key aggregation shared by multi-channel domains (voltage rails, efuse ports).
// Raw readings and already-aggregated summaries fold the same way.

use std::collections::BTreeMap;

use crate::models::{ChannelSummary, ChannelValue};
use crate::rollup::math::round_to;

#[derive(Debug, Clone, Copy)]
pub(crate) struct ChannelRounding {
    pub avg: u32,
    /// `None` keeps min/max as read.
    pub extrema: Option<u32>,
    /// Carry `peak` (highest max seen) on each summary.
    pub track_peak: bool,
}

#[derive(Default)]
struct Acc {
    avgs: Vec<f64>,
    min: Option<f64>,
    max: Option<f64>,
    peak: Option<f64>,
    samples: u64,
}

/// Folds every channel map of a bucket into one summary per key. Keys are never merged;
/// `_total` and friends are ordinary keys.
pub(crate) fn aggregate_channels<'a>(
    maps: impl IntoIterator<Item = &'a BTreeMap<String, ChannelValue>>,
    rounding: ChannelRounding,
) -> BTreeMap<String, ChannelSummary> {
    let mut accs: BTreeMap<&'a str, Acc> = BTreeMap::new();
    for map in maps {
        for (key, value) in map {
            let s = value.as_summary();
            let acc = accs.entry(key.as_str()).or_default();
            acc.avgs.push(s.avg);
            acc.min = Some(acc.min.map_or(s.min, |m| m.min(s.min)));
            acc.max = Some(acc.max.map_or(s.max, |m| m.max(s.max)));
            let peak = s.peak.unwrap_or(s.max);
            acc.peak = Some(acc.peak.map_or(peak, |p| p.max(peak)));
            acc.samples += s.samples;
        }
    }

    let extrema = |v: f64| rounding.extrema.map_or(v, |p| round_to(v, p));
    accs.into_iter()
        .filter_map(|(key, acc)| {
            let avg = acc.avgs.iter().sum::<f64>() / acc.avgs.len() as f64;
            Some((
                key.to_string(),
                ChannelSummary {
                    avg: round_to(avg, rounding.avg),
                    min: extrema(acc.min?),
                    max: extrema(acc.max?),
                    peak: rounding.track_peak.then_some(acc.peak).flatten().map(&extrema),
                    samples: acc.samples,
                },
            ))
        })
        .collect()
}

/// Narrows a channel map to `key`; `None` when the key is absent.
pub(crate) fn only_key<V: Clone>(map: &BTreeMap<String, V>, key: &str) -> Option<BTreeMap<String, V>> {
    map.get(key)
        .map(|v| BTreeMap::from([(key.to_string(), v.clone())]))
}
