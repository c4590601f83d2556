use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use approx::assert_abs_diff_eq;
use tempfile::tempdir;

/// Two genes: G1 scores under beta_z, G2 lists an rsid its weight model lacks.
const BUNDLE: &str = r#"
[[genes]]
gene = "G1"
valid_rsids = ["s1", "s2"]
covariance = [[1.0, 0.2], [0.2, 1.0]]
weights = { s1 = 0.5, s2 = 0.3 }
beta_sets.beta_z.values_by_key = { s1 = "1.0", s2 = "2.0" }
beta_sets.sigma_l.values_by_key = { s1 = "0.9", s2 = "1.1" }

[[genes]]
gene = "G2"
valid_rsids = ["s9"]
covariance = 1.0
weights = { s1 = 1.0 }
beta_sets.beta_z.values_by_key = { s9 = "1.0" }
beta_sets.sigma_l.values_by_key = { s9 = "1.0" }
"#;

fn run_metax(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_metax"))
        .current_dir(dir)
        .args(args)
        .output()
        .expect("run metax cli")
}

fn data_rows(path: &Path) -> Vec<Vec<String>> {
    let text = fs::read_to_string(path).expect("read results");
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("gene\tzscore\tn\tvar_g"));
    lines
        .map(|line| line.split('\t').map(str::to_string).collect())
        .collect()
}

#[test]
fn scheme_flag_overrides_config_file() {
    let tmp = tempdir().expect("temporary directory");
    fs::write(tmp.path().join("bundle.toml"), BUNDLE).expect("write bundle");
    // The bundle carries no raw betas, so running the configured scheme fails every gene.
    fs::write(tmp.path().join("run.toml"), "scheme = \"metaxcan\"\nthreads = 1\n")
        .expect("write config");

    let configured = run_metax(
        tmp.path(),
        &["bundle.toml", "--config", "run.toml", "--output", "configured.tsv"],
    );
    assert!(!configured.status.success());
    assert!(data_rows(&tmp.path().join("configured.tsv")).is_empty());

    let overridden = run_metax(
        tmp.path(),
        &[
            "bundle.toml",
            "--config",
            "run.toml",
            "--scheme",
            "beta_z",
            "--output",
            "overridden.tsv",
        ],
    );
    let rows = data_rows(&tmp.path().join("overridden.tsv"));
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][0], "G1");
    assert_eq!(rows[0][2], "2");
    let zscore: f64 = rows[0][1].parse().expect("numeric zscore");
    assert_abs_diff_eq!(zscore, 1.11 / 0.4_f64.sqrt(), epsilon = 1e-9);
    // G2 still fails under either scheme.
    assert!(!overridden.status.success());
}

#[test]
fn missing_scheme_fails_before_scoring() {
    let tmp = tempdir().expect("temporary directory");
    fs::write(tmp.path().join("bundle.toml"), BUNDLE).expect("write bundle");

    let output = run_metax(tmp.path(), &["bundle.toml", "--output", "out.tsv"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("No zscore scheme given"), "stderr: {stderr}");
    assert!(!tmp.path().join("out.tsv").exists());
}

#[test]
fn unknown_scheme_is_rejected() {
    let tmp = tempdir().expect("temporary directory");
    fs::write(tmp.path().join("bundle.toml"), BUNDLE).expect("write bundle");

    let output = run_metax(
        tmp.path(),
        &["bundle.toml", "--scheme", "zscore", "--output", "out.tsv"],
    );
    assert!(!output.status.success());
    assert!(!tmp.path().join("out.tsv").exists());
}

#[test]
fn failing_gene_is_skipped_and_run_exits_non_zero() {
    let tmp = tempdir().expect("temporary directory");
    fs::write(tmp.path().join("bundle.toml"), BUNDLE).expect("write bundle");

    let output = run_metax(
        tmp.path(),
        &["bundle.toml", "--scheme", "beta_z", "--output", "out.tsv"],
    );
    assert_eq!(output.status.code(), Some(1));

    let rows = data_rows(&tmp.path().join("out.tsv"));
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][0], "G1");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Gene G2"), "stderr: {stderr}");
    assert!(stderr.contains("s9"), "stderr: {stderr}");
    assert!(stderr.contains("1 gene(s) could not be scored"), "stderr: {stderr}");
}

#[test]
fn reference_scheme_without_reference_table_fails_once() {
    let tmp = tempdir().expect("temporary directory");
    fs::write(tmp.path().join("bundle.toml"), BUNDLE).expect("write bundle");

    let output = run_metax(
        tmp.path(),
        &["bundle.toml", "--scheme", "beta_z_and_ref", "--output", "out.tsv"],
    );
    assert_eq!(output.status.code(), Some(1));

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Scheme beta_z_and_ref reads reference variances"),
        "stderr: {stderr}"
    );
    assert!(!stderr.contains("Skipping gene"), "stderr: {stderr}");
    assert!(!tmp.path().join("out.tsv").exists());
}

#[test]
fn reference_scheme_scores_with_reference_table() {
    let tmp = tempdir().expect("temporary directory");
    let bundle = format!("[reference_variances]\ns1 = 0.81\ns2 = 1.21\n{BUNDLE}");
    fs::write(tmp.path().join("bundle.toml"), bundle).expect("write bundle");

    let output = run_metax(
        tmp.path(),
        &["bundle.toml", "--scheme", "beta_z_and_ref", "--output", "out.tsv"],
    );
    // G2 still fails on its missing weight.
    assert_eq!(output.status.code(), Some(1));

    let rows = data_rows(&tmp.path().join("out.tsv"));
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][2], "2");
    let zscore: f64 = rows[0][1].parse().expect("numeric zscore");
    assert_abs_diff_eq!(zscore, 1.11 / 0.4_f64.sqrt(), epsilon = 1e-9);
}
