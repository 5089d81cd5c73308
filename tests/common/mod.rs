#![allow(dead_code)]

use ingredient_risk::{parse_dataset, DatasetFormat, ReferenceIndex};
use std::sync::Arc;

pub const DATASET_CSV: &str = "\
canonical_name,aliases,hazards,cas_number,ec_number,popularity
Aqua,Water|Eau,,7732-18-5,231-791-2,900
Fragrance,Parfum|Perfume|Aroma,allergen:high,,,700
Sodium Laureth Sulfate,SLES,irritant:medium,9004-82-4,,500
Paraffinum Liquidum,Mineral Oil,comedogenic:medium,8012-95-1,,400
Glycerin,Glycerol,,56-81-5,200-289-5,800
Limonene,,allergen:medium,5989-27-5,,300
Retinol,Vitamin A,photosensitizing|pregnancy_unsafe:high,68-26-8,,250
Vanillin,Aroma,,121-33-5,,60
";

pub fn index() -> Arc<ReferenceIndex> {
    let (index, report) = parse_dataset(DATASET_CSV.as_bytes(), DatasetFormat::Csv).unwrap();
    assert!(report.skipped.is_empty());
    Arc::new(index)
}

/// Same rows, reversed, to check that row order has no influence.
pub fn reversed_index() -> Arc<ReferenceIndex> {
    let mut lines: Vec<&str> = DATASET_CSV.lines().collect();
    let header = lines.remove(0);
    lines.reverse();
    let csv = std::iter::once(header).chain(lines).collect::<Vec<_>>().join("\n");
    Arc::new(parse_dataset(csv.as_bytes(), DatasetFormat::Csv).unwrap().0)
}
