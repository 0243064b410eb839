// 🗺️ Territory Manager - in-memory aggregates over the resident table
//
// Borrows a validated ResidentTable and derives:
//   - residents per street (count desc)
//   - the subset of one focus street (exact, case-sensitive match)
//   - mean age per (street, sex)
//   - age-band labels as a new record set (the table is never mutated)
//
// Aggregates are cached on the manager; recomputing overwrites the cache.

use crate::age_band::AgeBand;
use crate::error::{Result, TerritoryError};
use crate::resident::{ResidentRecord, ResidentTable, Sex};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info};

// ============================================================================
// AGGREGATES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreetCount {
    #[serde(rename = "RUA")]
    pub street: String,
    #[serde(rename = "CONTAGEM")]
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgeSexAggregate {
    #[serde(rename = "RUA")]
    pub street: String,
    #[serde(rename = "SEXO")]
    pub sex: Sex,
    #[serde(rename = "MEDIA_IDADE")]
    pub mean_age: f64,
    #[serde(rename = "MORADORES")]
    pub residents: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgeBandCount {
    #[serde(rename = "FAIXA_ETARIA")]
    pub band: AgeBand,
    #[serde(rename = "CONTAGEM")]
    pub count: usize,
}

/// Records of a single street, in input order
#[derive(Debug, Clone, PartialEq)]
pub struct StreetSubset<'a> {
    pub street: String,
    pub records: Vec<&'a ResidentRecord>,
}

impl<'a> StreetSubset<'a> {
    pub fn house_numbers(&self) -> Vec<&'a str> {
        self.records.iter().map(|r| r.house_number.as_str()).collect()
    }

    pub fn women(&self) -> impl Iterator<Item = &'a ResidentRecord> + '_ {
        self.records.iter().copied().filter(|r| r.sex == Sex::Female)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// A resident paired with its age band
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CategorizedResident<'a> {
    pub record: &'a ResidentRecord,
    pub band: AgeBand,
}

#[derive(Debug, Serialize)]
struct CategorizedRow<'a> {
    #[serde(rename = "RUA")]
    street: &'a str,
    #[serde(rename = "NUM")]
    house_number: &'a str,
    #[serde(rename = "IDD")]
    age: u32,
    #[serde(rename = "SEXO")]
    sex: Sex,
    #[serde(rename = "FAIXA_ETARIA")]
    band: &'static str,
}

impl<'a> CategorizedResident<'a> {
    /// Flat row with the band label, for CSV/JSON output
    pub fn to_row(&self) -> impl Serialize + 'a {
        let record = self.record;
        CategorizedRow {
            street: &record.street,
            house_number: &record.house_number,
            age: record.age,
            sex: record.sex,
            band: self.band.label(),
        }
    }
}

// ============================================================================
// TERRITORY MANAGER
// ============================================================================

pub struct TerritoryManager<'a> {
    table: &'a ResidentTable,

    /// Street singled out by compute_street_counts
    focus_street: Option<String>,

    street_counts: Option<Vec<StreetCount>>,
    focus_subset: Option<StreetSubset<'a>>,
    mean_age_per_street_sex: Option<Vec<AgeSexAggregate>>,
}

impl<'a> TerritoryManager<'a> {
    /// Wrap a resident table. Fails with `EmptyInput` for a zero-row table.
    pub fn new(table: &'a ResidentTable) -> Result<Self> {
        if table.is_empty() {
            return Err(TerritoryError::EmptyInput);
        }

        info!(rows = table.len(), "territory manager initialized");

        Ok(TerritoryManager {
            table,
            focus_street: None,
            street_counts: None,
            focus_subset: None,
            mean_age_per_street_sex: None,
        })
    }

    pub fn with_focus_street(mut self, street: impl Into<String>) -> Self {
        self.focus_street = Some(street.into());
        self.focus_subset = None;
        self
    }

    pub fn table(&self) -> &'a ResidentTable {
        self.table
    }

    pub fn row_count(&self) -> usize {
        self.table.len()
    }

    pub fn focus_street(&self) -> Option<&str> {
        self.focus_street.as_deref()
    }

    // ------------------------------------------------------------------------
    // Street counts
    // ------------------------------------------------------------------------

    /// Count residents per street, most populated first.
    ///
    /// Also extracts the focus street subset when one is configured.
    pub fn compute_street_counts(&mut self) -> &[StreetCount] {
        let table = self.table;
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for record in table.records() {
            *counts.entry(record.street.as_str()).or_insert(0) += 1;
        }

        let mut result: Vec<StreetCount> = counts
            .into_iter()
            .map(|(street, count)| StreetCount {
                street: street.to_string(),
                count,
            })
            .collect();

        // BTreeMap already yields streets by name, so a stable sort keeps ties alphabetical
        result.sort_by(|a, b| b.count.cmp(&a.count));

        debug!(streets = result.len(), "street counts computed");

        self.focus_subset = self
            .focus_street
            .as_deref()
            .map(|street| self.filter_street(street));

        if let Some(subset) = &self.focus_subset {
            debug!(street = %subset.street, residents = subset.len(), "focus street extracted");
        }

        self.street_counts.insert(result)
    }

    /// Records whose street equals `street` exactly
    pub fn filter_street(&self, street: &str) -> StreetSubset<'a> {
        let table = self.table;
        StreetSubset {
            street: street.to_string(),
            records: table
                .records()
                .iter()
                .filter(|r| r.street == street)
                .collect(),
        }
    }

    pub fn street_counts(&self) -> Option<&[StreetCount]> {
        self.street_counts.as_deref()
    }

    pub fn focus_subset(&self) -> Option<&StreetSubset<'a>> {
        self.focus_subset.as_ref()
    }

    // ------------------------------------------------------------------------
    // Mean age per (street, sex)
    // ------------------------------------------------------------------------

    /// Arithmetic mean age for every observed (street, sex) pair.
    ///
    /// Ordered by street, then sex. Pairs without residents are absent.
    pub fn compute_mean_age_per_street_sex(&mut self) -> &[AgeSexAggregate] {
        let table = self.table;
        let mut groups: BTreeMap<(&str, Sex), (u64, usize)> = BTreeMap::new();
        for record in table.records() {
            let entry = groups
                .entry((record.street.as_str(), record.sex))
                .or_insert((0, 0));
            entry.0 += u64::from(record.age);
            entry.1 += 1;
        }

        let result: Vec<AgeSexAggregate> = groups
            .into_iter()
            .map(|((street, sex), (age_sum, residents))| AgeSexAggregate {
                street: street.to_string(),
                sex,
                mean_age: age_sum as f64 / residents as f64,
                residents,
            })
            .collect();

        debug!(groups = result.len(), "mean age per street/sex computed");

        self.mean_age_per_street_sex.insert(result)
    }

    pub fn mean_age_per_street_sex(&self) -> Option<&[AgeSexAggregate]> {
        self.mean_age_per_street_sex.as_deref()
    }

    // ------------------------------------------------------------------------
    // Age bands
    // ------------------------------------------------------------------------

    /// Label every resident with its age band, in input order
    pub fn categorize_age_bands(&self) -> Vec<CategorizedResident<'a>> {
        let table = self.table;
        table
            .records()
            .iter()
            .map(|record| CategorizedResident {
                record,
                band: AgeBand::from_age(record.age),
            })
            .collect()
    }

    /// Residents per band, every band listed (zero included)
    pub fn age_band_counts(&self) -> Vec<AgeBandCount> {
        let mut counts: BTreeMap<AgeBand, usize> =
            AgeBand::ALL.iter().map(|band| (*band, 0)).collect();
        for record in self.table.records() {
            *counts.entry(AgeBand::from_age(record.age)).or_insert(0) += 1;
        }

        counts
            .into_iter()
            .map(|(band, count)| AgeBandCount { band, count })
            .collect()
    }
}

// ============================================================================
// CHARTS
// ============================================================================

#[cfg(feature = "tui")]
impl<'a> TerritoryManager<'a> {
    /// Bar chart of the street counts (requires compute_street_counts)
    pub fn plot_street_counts(&self) -> Result<ratatui::widgets::BarChart<'static>> {
        let counts = self
            .street_counts()
            .ok_or(TerritoryError::NotComputed("street counts"))?;
        Ok(crate::charts::street_count_chart(counts))
    }

    /// Bar chart of the mean ages (requires compute_mean_age_per_street_sex)
    pub fn plot_mean_age(&self) -> Result<ratatui::widgets::BarChart<'static>> {
        let means = self
            .mean_age_per_street_sex()
            .ok_or(TerritoryError::NotComputed("mean age per street/sex"))?;
        Ok(crate::charts::mean_age_chart(means))
    }

    /// Bar chart of residents per age band
    pub fn plot_age_bands(&self) -> ratatui::widgets::BarChart<'static> {
        crate::charts::age_band_chart(&self.age_band_counts())
    }

    /// Scatter of women's ages by house number on the focus street
    /// (requires compute_street_counts with a focus street)
    pub fn plot_women_scatter(&self) -> Result<crate::charts::ScatterPlot> {
        let subset = self
            .focus_subset()
            .ok_or(TerritoryError::NotComputed("focus street subset"))?;
        Ok(crate::charts::women_scatter(subset))
    }

    /// Scatter of women's ages by house number on any street
    pub fn plot_women_scatter_for(&self, street: &str) -> crate::charts::ScatterPlot {
        crate::charts::women_scatter(&self.filter_street(street))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> ResidentTable {
        ResidentTable::from_records(vec![
            ResidentRecord::new("AV MARTE", "545", 30, Sex::Female),
            ResidentRecord::new("RUA MONSENHOR MESSIAS", "123", 45, Sex::Male),
            ResidentRecord::new("AV MARTE", "565", 25, Sex::Female),
            ResidentRecord::new("RUA DOS BELGAS", "456", 60, Sex::Male),
        ])
    }

    #[test]
    fn test_initialization_keeps_row_count() {
        let table = sample_table();
        let manager = TerritoryManager::new(&table).unwrap();

        assert_eq!(manager.row_count(), 4);
        assert!(std::ptr::eq(manager.table(), &table), "table must be borrowed, not copied");
        assert!(manager.street_counts().is_none());
        assert!(manager.mean_age_per_street_sex().is_none());
    }

    #[test]
    fn test_empty_table_rejected() {
        let table = ResidentTable::default();
        assert!(matches!(
            TerritoryManager::new(&table),
            Err(TerritoryError::EmptyInput)
        ));
    }

    #[test]
    fn test_street_counts() {
        let table = sample_table();
        let mut manager = TerritoryManager::new(&table).unwrap();

        let counts = manager.compute_street_counts().to_vec();

        assert_eq!(
            counts,
            vec![
                StreetCount { street: "AV MARTE".to_string(), count: 2 },
                StreetCount { street: "RUA DOS BELGAS".to_string(), count: 1 },
                StreetCount { street: "RUA MONSENHOR MESSIAS".to_string(), count: 1 },
            ]
        );
        assert_eq!(counts.iter().map(|c| c.count).sum::<usize>(), table.len());

        for count in &counts {
            let expected = table.records().iter().filter(|r| r.street == count.street).count();
            assert_eq!(count.count, expected, "count mismatch for {}", count.street);
        }
    }

    #[test]
    fn test_street_counts_idempotent() {
        let table = sample_table();
        let mut manager = TerritoryManager::new(&table).unwrap();

        let first = manager.compute_street_counts().to_vec();
        let second = manager.compute_street_counts().to_vec();

        assert_eq!(first, second);
        assert_eq!(manager.street_counts().unwrap(), first.as_slice());
    }

    #[test]
    fn test_focus_street_extracted_with_counts() {
        let table = sample_table();
        let mut manager = TerritoryManager::new(&table).unwrap().with_focus_street("AV MARTE");

        assert!(manager.focus_subset().is_none());
        manager.compute_street_counts();

        let subset = manager.focus_subset().unwrap();
        assert_eq!(subset.street, "AV MARTE");
        assert_eq!(subset.house_numbers(), vec!["545", "565"]);
        assert_eq!(subset.women().count(), 2);
    }

    #[test]
    fn test_filter_street_is_exact_match() {
        let table = sample_table();
        let manager = TerritoryManager::new(&table).unwrap();

        assert_eq!(manager.filter_street("AV MARTE").len(), 2);
        assert!(manager.filter_street("av marte").is_empty());
        assert!(manager.filter_street("AV MARTE ").is_empty());
        assert!(manager.filter_street("RUA INEXISTENTE").is_empty());
    }

    #[test]
    fn test_mean_age_per_street_sex() {
        let table = sample_table();
        let mut manager = TerritoryManager::new(&table).unwrap();

        let means = manager.compute_mean_age_per_street_sex().to_vec();

        // One row per observed pair; no zero-filled AV MARTE/M row
        assert_eq!(means.len(), 3);
        assert!(!means.iter().any(|m| m.street == "AV MARTE" && m.sex == Sex::Male));

        let marte_f = means
            .iter()
            .find(|m| m.street == "AV MARTE" && m.sex == Sex::Female)
            .unwrap();
        assert!((marte_f.mean_age - 27.5).abs() < 1e-9);
        assert_eq!(marte_f.residents, 2);

        let belgas_m = means
            .iter()
            .find(|m| m.street == "RUA DOS BELGAS" && m.sex == Sex::Male)
            .unwrap();
        assert!((belgas_m.mean_age - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_mean_age_matches_arithmetic_mean() {
        let table = ResidentTable::from_records(vec![
            ResidentRecord::new("RUA A", "1", 3, Sex::Female),
            ResidentRecord::new("RUA A", "2", 10, Sex::Female),
            ResidentRecord::new("RUA A", "3", 11, Sex::Female),
            ResidentRecord::new("RUA A", "4", 90, Sex::Male),
            ResidentRecord::new("RUA B", "5", 0, Sex::Male),
        ]);
        let mut manager = TerritoryManager::new(&table).unwrap();

        let means = manager.compute_mean_age_per_street_sex();
        assert_eq!(means[0].street, "RUA A");
        assert_eq!(means[0].sex, Sex::Female);
        assert!((means[0].mean_age - 8.0).abs() < 1e-9);
        assert!(means.iter().all(|m| m.mean_age.is_finite()));
    }

    #[test]
    fn test_categorize_age_bands() {
        let table = sample_table();
        let manager = TerritoryManager::new(&table).unwrap();

        let categorized = manager.categorize_age_bands();

        assert_eq!(categorized.len(), table.len());
        let sixty = categorized.iter().find(|c| c.record.age == 60).unwrap();
        assert_eq!(sixty.band.label(), "60 anos ou mais (Idosos)");
        assert_eq!(categorized[0].band, AgeBand::Adults);

        // Re-running yields the same labels and leaves the table untouched
        let again = manager.categorize_age_bands();
        assert_eq!(categorized, again);
        assert_eq!(table.len(), 4);
    }

    #[test]
    fn test_age_band_counts_cover_every_band() {
        let table = sample_table();
        let manager = TerritoryManager::new(&table).unwrap();

        let counts = manager.age_band_counts();

        assert_eq!(counts.len(), AgeBand::ALL.len());
        assert_eq!(counts.iter().map(|c| c.count).sum::<usize>(), table.len());
        assert_eq!(counts[0], AgeBandCount { band: AgeBand::Children, count: 0 });
        assert_eq!(counts[3], AgeBandCount { band: AgeBand::Adults, count: 3 });
        assert_eq!(counts[4], AgeBandCount { band: AgeBand::Elderly, count: 1 });
    }

    #[test]
    fn test_example_scenario() {
        let table = ResidentTable::from_records(vec![
            ResidentRecord::new("AV MARTE", "545", 30, Sex::Female),
            ResidentRecord::new("RUA X", "123", 45, Sex::Male),
            ResidentRecord::new("AV MARTE", "565", 25, Sex::Female),
            ResidentRecord::new("RUA Y", "456", 60, Sex::Male),
        ]);
        let mut manager = TerritoryManager::new(&table).unwrap();

        let counts: Vec<(String, usize)> = manager
            .compute_street_counts()
            .iter()
            .map(|c| (c.street.clone(), c.count))
            .collect();
        assert_eq!(
            counts,
            vec![
                ("AV MARTE".to_string(), 2),
                ("RUA X".to_string(), 1),
                ("RUA Y".to_string(), 1),
            ]
        );

        let means = manager.compute_mean_age_per_street_sex();
        assert!((means[0].mean_age - 27.5).abs() < 1e-9);

        let bands = manager.categorize_age_bands();
        assert_eq!(bands[3].band, AgeBand::Elderly);
    }

    #[test]
    fn test_categorized_row_serializes_label() {
        let table = sample_table();
        let manager = TerritoryManager::new(&table).unwrap();
        let categorized = manager.categorize_age_bands();

        let json = serde_json::to_value(categorized[3].to_row()).unwrap();
        assert_eq!(json["RUA"], "RUA DOS BELGAS");
        assert_eq!(json["FAIXA_ETARIA"], "60 anos ou mais (Idosos)");
    }

    #[cfg(feature = "tui")]
    #[test]
    fn test_plots_require_prerequisites() {
        let table = sample_table();
        let mut manager = TerritoryManager::new(&table).unwrap().with_focus_street("AV MARTE");

        assert!(matches!(manager.plot_street_counts(), Err(TerritoryError::NotComputed(_))));
        assert!(matches!(manager.plot_mean_age(), Err(TerritoryError::NotComputed(_))));
        assert!(matches!(manager.plot_women_scatter(), Err(TerritoryError::NotComputed(_))));

        manager.compute_street_counts();
        manager.compute_mean_age_per_street_sex();

        assert!(manager.plot_street_counts().is_ok());
        assert!(manager.plot_mean_age().is_ok());
        let scatter = manager.plot_women_scatter().unwrap();
        assert_eq!(scatter.points().len(), 2);
        let _ = manager.plot_age_bands();
    }

    #[cfg(feature = "tui")]
    #[test]
    fn test_women_scatter_for_any_street() {
        let table = ResidentTable::from_records(vec![
            ResidentRecord::new("AV MARTE", "545", 30, Sex::Female),
            ResidentRecord::new("RUA DOS BELGAS", "10", 41, Sex::Female),
            ResidentRecord::new("RUA DOS BELGAS", "12", 70, Sex::Male),
        ]);
        // No focus street and nothing computed
        let manager = TerritoryManager::new(&table).unwrap();

        let scatter = manager.plot_women_scatter_for("RUA DOS BELGAS");
        assert_eq!(scatter.title(), "Mulheres - RUA DOS BELGAS");
        assert_eq!(scatter.points(), &[(10.0, 41.0)]);

        assert!(manager.plot_women_scatter_for("RUA INEXISTENTE").points().is_empty());
    }
}
