//! End-to-end operator workflow: validate → backup → locate → splice,
//! plus the recoverability law (backup + patch + revert == original).

use pcx_patcher::{backup, scan, splice, template, validate, Mappings, ScanOutcome, Splice};
use std::fs;
use tempfile::TempDir;

/// A small but structurally complete export.
fn sample_export() -> String {
    let mut out = String::new();
    out.push_str("* PCX Export File\n\n");
    out.push_str(&template::folder_destination("RABOC010", "PBKOC01R", "0147"));
    out.push_str("\n\n");
    out.push_str("ADD RULESET\n    NAME                      = RABOC010-PBKOC01R\n\n");
    out.push_str(&template::commitment_rule(&template::CommitmentRule::new(
        "RABOC010",
        "PBKOC01R",
        "0147",
        "&RPT_R001C002L004",
        "OPW2",
    )));
    out.push_str("\n\n");
    out.push_str("ADD VARIABLE\n    NAME                      = &RPT_COMPANY\n");
    out
}

#[test]
fn full_patch_workflow() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("pcx_export.txt");
    let original = sample_export();
    fs::write(&path, &original).unwrap();

    // Validate: generated content must be structurally clean.
    let issues = validate::validate_file(&path).unwrap();
    assert!(issues.is_empty(), "unexpected issues: {issues:?}");

    // Locate: insertion point lands before the VARIABLE section.
    let outcome = scan::locate_insertion_point(&path, "RULE").unwrap();
    let expected_offset = original.find("ADD VARIABLE").unwrap() as u64;
    assert_eq!(outcome, ScanOutcome::Found { offset: expected_offset });

    // Backup before patching.
    let receipt = backup::backup(&path).unwrap();
    assert_eq!(fs::read(&path).unwrap(), original.as_bytes());

    // Splice a new rule for another store.
    let new_rule = template::commitment_rule(&template::CommitmentRule::new(
        "RABOC010",
        "PBKOC01R",
        "0212",
        "&RPT_R001C002L004",
        "OPW2",
    ));
    Splice::new(&path, expected_offset, new_rule.as_bytes())
        .apply()
        .unwrap();

    let patched = fs::read_to_string(&path).unwrap();
    assert!(patched.contains("~0212/"));
    assert!(patched.starts_with("* PCX Export File"));
    assert!(patched.ends_with("= &RPT_COMPANY\n"));

    // The patched file must still validate and still scan: the next insertion
    // lands after the rule we just added.
    assert!(validate::validate_file(&path).unwrap().is_empty());
    let next = scan::locate_insertion_point(&path, "RULE").unwrap();
    let next_expected = patched.find("ADD VARIABLE").unwrap() as u64;
    assert_eq!(next, ScanOutcome::Found { offset: next_expected });
    assert!(next_expected > expected_offset);

    // Recoverability: restoring the backup recovers the original bytes.
    fs::copy(&receipt.backup_path, &path).unwrap();
    assert_eq!(fs::read(&path).unwrap(), original.as_bytes());
}

#[test]
fn backup_is_idempotent_on_the_source() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("export.txt");
    let content = sample_export();
    fs::write(&path, &content).unwrap();

    let before = fs::read(&path).unwrap();
    backup::backup(&path).unwrap();
    backup::backup(&path).unwrap();
    assert_eq!(fs::read(&path).unwrap(), before);
}

#[test]
fn scanner_offset_is_stable_across_calls() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("export.txt");
    fs::write(&path, sample_export()).unwrap();

    let offsets: Vec<_> = (0..5)
        .map(|_| scan::locate_insertion_point(&path, "RULE").unwrap())
        .collect();
    assert!(offsets.windows(2).all(|w| w[0] == w[1]));
}

#[test]
fn absent_section_degrades_to_append_at_end() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("export.txt");
    let content = "ADD DESTINATION\n    NAME                      = x\n";
    fs::write(&path, content).unwrap();

    let outcome = scan::locate_insertion_point(&path, "REPORTDEFN").unwrap();
    assert_eq!(outcome, ScanOutcome::NotFound);

    // Caller opts into append-at-end; splice clamps to EOF.
    let offset = outcome.offset_or_end(content.len() as u64);
    let report = Splice::new(&path, offset, b"ADD REPORTDEFN\n    NAME                      = r")
        .apply()
        .unwrap();
    assert_eq!(report.offset, content.len() as u64);

    let patched = fs::read_to_string(&path).unwrap();
    assert!(patched.starts_with(content));
    assert!(patched.contains("\n\nADD REPORTDEFN"));
}

#[test]
fn generated_tax_rules_splice_into_a_clean_export() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("export.txt");
    let original = sample_export();
    fs::write(&path, &original).unwrap();

    let mappings = Mappings::default();
    let block = template::consolidated_tax_rules(
        &["147".to_string()],
        &["TAX004".to_string()],
        &mappings,
    );

    let offset = scan::locate_insertion_point(&path, "RULE")
        .unwrap()
        .offset_or_end(original.len() as u64);
    Splice::new(&path, offset, block.as_bytes()).apply().unwrap();

    assert!(validate::validate_file(&path).unwrap().is_empty());
    let patched = fs::read_to_string(&path).unwrap();
    assert!(patched.contains("TAX004-PPA0951W"));

    // Separator convention: blank lines on both sides of the insertion.
    let inserted_at = patched.find("ADD RULE\n    RULESETNAME               = TAX004").unwrap();
    assert_eq!(&patched[inserted_at - 2..inserted_at], "\n\n");
}

#[test]
fn splice_is_binary_safe_around_vendor_bytes() {
    // Vendor exports can carry non-UTF8 bytes; they must come through intact.
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("export.txt");
    let mut content = b"ADD RULE\n    KEY                       = ".to_vec();
    content.extend_from_slice(&[0xC2, 0x00, 0xFF, 0x80]);
    content.extend_from_slice(b"\nADD RULESET\n");
    fs::write(&path, &content).unwrap();

    let offset = match scan::locate_insertion_point(&path, "RULE").unwrap() {
        ScanOutcome::Found { offset } => offset,
        ScanOutcome::NotFound => panic!("rule section not found"),
    };

    Splice::new(&path, offset, b"X").apply().unwrap();
    let patched = fs::read(&path).unwrap();
    assert!(patched
        .windows(4)
        .any(|w| w == [0xC2, 0x00, 0xFF, 0x80]));
    assert_eq!(
        patched.len(),
        content.len() + splice::SEPARATOR.len() * 2 + 1
    );
}
