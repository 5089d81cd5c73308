mod common;

use ingredient_risk::app::BatchRunner;
use ingredient_risk::config::{BatchConfig, CompressionConfig};
use ingredient_risk::{EngineConfig, LocalStorage, RiskEngine, SummaryRisk, UserSkinProfile};
use std::fs;
use tempfile::TempDir;

fn write_scans(dir: &TempDir) {
    fs::write(dir.path().join("cream.txt"), "INCI: Aqua, Glycerin, Parfum, Limonene").unwrap();
    fs::write(dir.path().join("serum.txt"), "Składniki: Aqua, Retinol (0.3%), Glycerol").unwrap();
    fs::write(dir.path().join("blank.txt"), "").unwrap();
}

fn batch_config(input: &TempDir, output: &TempDir) -> BatchConfig {
    BatchConfig {
        input_dir: input.path().display().to_string(),
        output_path: output.path().display().to_string(),
        profile_path: None,
        locale: None,
        concurrency: Some(2),
        output_formats: vec!["json".to_string(), "csv".to_string()],
        compression: None,
    }
}

fn profile() -> UserSkinProfile {
    serde_json::from_value(serde_json::json!({
        "pregnancy": true,
        "sensitiveSkin": null,
        "cosmeticAllergies": ["Limonene"],
        "generalAllergies": null
    }))
    .unwrap()
}

#[tokio::test]
async fn test_batch_writes_outputs_to_disk() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    write_scans(&input);

    let engine = RiskEngine::new(common::index(), EngineConfig::default()).unwrap();
    let runner = BatchRunner::new(engine, LocalStorage::new(output.path()), batch_config(&input, &output));
    let summary = runner.run(&profile()).await.unwrap();

    let by_scan: Vec<(&str, SummaryRisk)> = summary.scans.iter().map(|s| (s.scan.as_str(), s.summary)).collect();
    assert_eq!(
        by_scan,
        vec![
            ("blank", SummaryRisk::Inconclusive),
            ("cream", SummaryRisk::Avoid),
            ("serum", SummaryRisk::Avoid),
        ]
    );

    for name in ["blank.report.json", "cream.report.json", "serum.report.json", "summary.csv", "manifest.json"] {
        assert!(output.path().join(name).exists(), "{name} missing");
    }

    let manifest: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(output.path().join("manifest.json")).unwrap()).unwrap();
    assert_eq!(manifest["reference_ingredients"], 8);
    assert!(manifest["generated_at"].as_str().is_some());
}

#[tokio::test]
async fn test_batch_zip_archive() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    write_scans(&input);

    let mut config = batch_config(&input, &output);
    config.compression = Some(CompressionConfig {
        enabled: true,
        filename: "scan_reports.zip".to_string(),
    });

    let engine = RiskEngine::new(common::index(), EngineConfig::default()).unwrap();
    let runner = BatchRunner::new(engine, LocalStorage::new(output.path()), config);
    runner.run(&UserSkinProfile::default()).await.unwrap();

    let zip_data = fs::read(output.path().join("scan_reports.zip")).unwrap();
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(zip_data)).unwrap();
    assert_eq!(archive.len(), 5);

    let mut summary_csv = String::new();
    std::io::Read::read_to_string(&mut archive.by_name("summary.csv").unwrap(), &mut summary_csv).unwrap();
    assert!(summary_csv.starts_with("scan,summary,recognized,unrecognized,avoid,caution"));
    assert!(summary_csv.contains("blank,inconclusive,0,0,0,0"));
}

#[test]
fn test_batch_section_from_toml() {
    let toml_content = r#"
[batch]
input_dir = "./scans"
output_path = "./reports"
profile_path = "./profile.json"

[batch.compression]
enabled = true
filename = "reports.zip"
"#;
    let config = EngineConfig::from_toml_str(toml_content).unwrap();
    let batch = config.batch.unwrap();
    assert_eq!(batch.archive_name(), Some("reports.zip"));
    assert_eq!(batch.concurrency(), 4);
    assert_eq!(batch.profile_path().unwrap(), "./profile.json");
}
