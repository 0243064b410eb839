// 🎲 Fake resident data - random tables with the resident CSV schema
// For demos and manual testing of the processor and charts

use crate::resident::{ResidentRecord, ResidentTable, Sex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const DEFAULT_ROWS: usize = 10_000;
pub const MAX_HOUSE_NUMBER: u32 = 1000;
pub const MAX_AGE: u32 = 100;

/// Street names used when none are given: "RUA A" through "RUA X"
pub fn default_streets() -> Vec<String> {
    ('A'..='X').map(|letter| format!("RUA {}", letter)).collect()
}

/// Draw `rows` residents with uniform street, house number (1-1000),
/// age (0-100) and sex.
pub fn generate<R: Rng + ?Sized>(rng: &mut R, rows: usize, streets: &[String]) -> ResidentTable {
    const SEXES: [Sex; 2] = [Sex::Male, Sex::Female];

    let mut records = Vec::with_capacity(rows);
    if streets.is_empty() {
        return ResidentTable::from_records(records);
    }

    for _ in 0..rows {
        let street = &streets[rng.gen_range(0..streets.len())];
        let number = rng.gen_range(1..=MAX_HOUSE_NUMBER);
        let age = rng.gen_range(0..=MAX_AGE);
        let sex = SEXES[rng.gen_range(0..SEXES.len())];
        records.push(ResidentRecord::new(street, &number.to_string(), age, sex));
    }

    ResidentTable::from_records(records)
}

/// Deterministic table for a given seed
pub fn generate_seeded(seed: u64, rows: usize, streets: &[String]) -> ResidentTable {
    let mut rng = StdRng::seed_from_u64(seed);
    generate(&mut rng, rows, streets)
}
