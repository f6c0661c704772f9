//! Merge of primary records with secondary enrichment.
//!
//! Output always keeps primary order and length. Enrichment is all-or-none
//! per page: when any primary row cannot be paired, no row is enriched. A
//! partner without a 7d change does not count as a pair.

use crate::secondary::Enrichment;
use coinboard_core::MarketRecord;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Merge configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeConfig {
    /// Pair rows by `id`, then by symbol, before falling back to position.
    /// When `false`, rows are paired purely by position.
    #[serde(default = "default_align_by_identifier")]
    pub align_by_identifier: bool,
}

fn default_align_by_identifier() -> bool {
    true
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            align_by_identifier: default_align_by_identifier(),
        }
    }
}

/// How a merge went.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    pub secondary_present: bool,
    pub matched_by_id: usize,
    pub matched_by_symbol: usize,
    pub matched_by_position: usize,
    /// Positional pairs whose identifiers disagree.
    pub misaligned: usize,
    /// Primary rows left without a partner.
    pub unpaired: usize,
    /// Whether the merged records carry enrichment fields.
    pub enriched: bool,
}

/// Merged records plus the report that produced them.
#[derive(Debug, Clone)]
pub struct MergedPage {
    pub records: Vec<MarketRecord>,
    pub report: MergeReport,
}

/// Combines primary and secondary record sets.
#[derive(Debug, Clone, Default)]
pub struct Merger {
    config: MergeConfig,
}

impl Merger {
    pub fn new(config: MergeConfig) -> Self {
        Self { config }
    }

    /// Merge `primary` with optional `secondary` enrichment.
    pub fn merge(
        &self,
        primary: Vec<MarketRecord>,
        secondary: Option<Vec<Enrichment>>,
    ) -> MergedPage {
        let Some(secondary) = secondary else {
            debug!(rows = primary.len(), "Secondary absent, page unenriched");
            return MergedPage {
                records: primary,
                report: MergeReport::default(),
            };
        };

        let mut report = MergeReport {
            secondary_present: true,
            ..Default::default()
        };

        let mut pairing = if self.config.align_by_identifier {
            pair_by_identifier(&primary, &secondary, &mut report)
        } else {
            pair_by_position(&primary, &secondary, &mut report)
        };

        for (record, partner) in primary.iter().zip(pairing.iter_mut()) {
            if let Some(j) = *partner {
                if secondary[j].change_percent_7d.is_none() {
                    debug!(primary = %record.id, secondary = %secondary[j].id, "Partner lacks 7d change");
                    *partner = None;
                }
            }
        }

        if report.misaligned > 0 {
            warn!(
                misaligned = report.misaligned,
                rows = primary.len(),
                "Positional pairs with disagreeing identifiers"
            );
        }

        report.unpaired = pairing.iter().filter(|p| p.is_none()).count();
        if report.unpaired > 0 || primary.is_empty() {
            warn!(
                unpaired = report.unpaired,
                rows = primary.len(),
                secondary_rows = secondary.len(),
                "Could not pair every row, page unenriched"
            );
            return MergedPage {
                records: primary,
                report,
            };
        }

        let records = primary
            .into_iter()
            .zip(pairing)
            .map(|(record, partner)| match partner.map(|j| &secondary[j]) {
                Some(Enrichment {
                    change_percent_7d: Some(change),
                    sparkline_7d,
                    ..
                }) => record.with_enrichment(*change, sparkline_7d.clone()),
                _ => record,
            })
            .collect();

        report.enriched = true;
        MergedPage { records, report }
    }
}

/// Pair row `i` with secondary row `i`.
fn pair_by_position(
    primary: &[MarketRecord],
    secondary: &[Enrichment],
    report: &mut MergeReport,
) -> Vec<Option<usize>> {
    primary
        .iter()
        .enumerate()
        .map(|(i, record)| {
            let partner = secondary.get(i)?;
            report.matched_by_position += 1;
            if partner.id != record.id {
                debug!(primary = %record.id, secondary = %partner.id, row = i, "Misaligned pair");
                report.misaligned += 1;
            }
            Some(i)
        })
        .collect()
}

/// Pair by `id`, then case-insensitive symbol, then position among the
/// leftovers.
fn pair_by_identifier(
    primary: &[MarketRecord],
    secondary: &[Enrichment],
    report: &mut MergeReport,
) -> Vec<Option<usize>> {
    let mut used = vec![false; secondary.len()];
    let mut pairing: Vec<Option<usize>> = vec![None; primary.len()];

    let by_id: HashMap<&str, usize> = secondary
        .iter()
        .enumerate()
        .rev()
        .map(|(j, e)| (e.id.as_str(), j))
        .collect();
    for (i, record) in primary.iter().enumerate() {
        if let Some(&j) = by_id.get(record.id.as_str()) {
            if !used[j] {
                used[j] = true;
                pairing[i] = Some(j);
                report.matched_by_id += 1;
            }
        }
    }

    let mut by_symbol: HashMap<String, Vec<usize>> = HashMap::new();
    for (j, e) in secondary.iter().enumerate() {
        if !used[j] && !e.symbol.is_empty() {
            by_symbol.entry(e.symbol.to_lowercase()).or_default().push(j);
        }
    }
    for (i, record) in primary.iter().enumerate() {
        if pairing[i].is_some() {
            continue;
        }
        let candidates = by_symbol.get(&record.symbol.to_lowercase());
        if let Some(&j) = candidates.and_then(|c| c.iter().find(|&&j| !used[j])) {
            used[j] = true;
            pairing[i] = Some(j);
            report.matched_by_symbol += 1;
        }
    }

    for (i, record) in primary.iter().enumerate() {
        if pairing[i].is_some() {
            continue;
        }
        if let Some(j) = (i < secondary.len() && !used[i]).then_some(i) {
            used[j] = true;
            pairing[i] = Some(j);
            report.matched_by_position += 1;
            report.misaligned += 1;
            debug!(primary = %record.id, secondary = %secondary[j].id, row = i, "Misaligned pair");
        }
    }

    pairing
}
