use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;

fn swcheck_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_swcheck"))
}

struct CliEnv {
    home: TempDir,
    config_path: PathBuf,
    settings: PathBuf,
    reports: PathBuf,
}

impl CliEnv {
    fn new() -> Self {
        let home = TempDir::new().expect("create temp home");
        let settings = home.path().join("settings");
        let reports = home.path().join("reports");
        fs::create_dir_all(&settings).unwrap();
        fs::create_dir_all(&reports).unwrap();
        let config_path = home.path().join("config.toml");
        fs::write(
            &config_path,
            format!(
                "settings_folder = {:?}\nreports_folder = {:?}\ncsv_path = {:?}\ndata_dir = {:?}\n",
                settings.display().to_string(),
                reports.display().to_string(),
                home.path().join("results.csv").display().to_string(),
                home.path().join("data").display().to_string(),
            ),
        )
        .unwrap();

        fs::write(
            settings.join("line.xml"),
            "<settings><hardware snr=\"SN1\">\
             <te id=\"HWEL_0000AABB_204\"/>\
             <te id=\"BTLD_00001122_51.68\"/>\
             <te id=\"SWFL_0000ABCD_001.002.003\"/>\
             </hardware></settings>",
        )
        .unwrap();

        Self {
            home,
            config_path,
            settings,
            reports,
        }
    }

    fn add_report(&self, code: &str, swfl: &str) {
        let dir = self.reports.join(code).join("2024-01-01");
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("report.xml"),
            format!(
                "<report>\
                 <info><name>BMW PartNumber</name><description>SN1</description></info>\
                 <teststep>HWEL: aa bb cc</teststep>\
                 <teststep>BTLD: 11 22 33 44</teststep>\
                 <teststep>SWFL: {swfl}</teststep>\
                 </report>"
            ),
        )
        .unwrap();
    }

    fn run(&self, args: &[&str]) -> Output {
        Command::new(swcheck_bin())
            .arg("--config")
            .arg(&self.config_path)
            .args(args)
            .env("SWCHECK_HOME", self.home.path())
            .env("RUST_LOG", "error")
            .output()
            .expect("failed to execute swcheck CLI")
    }
}

fn parse_json<T: for<'de> Deserialize<'de>>(output: &Output) -> T {
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(&stdout).unwrap_or_else(|err| {
        panic!(
            "failed to parse JSON output: {}\nstdout:\n{}\nstderr:\n{}",
            err,
            stdout,
            String::from_utf8_lossy(&output.stderr)
        )
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Outcome {
    serial_number: String,
    final_verdict: String,
    field_results: Vec<serde_json::Value>,
}

#[test]
fn test_check_ok_exits_zero() {
    let env = CliEnv::new();
    env.add_report("DMC1", "ab cd 01 02 03");

    let output = env.run(&["check", "DMC1", "--json"]);
    assert_eq!(output.status.code(), Some(0));
    let outcome: Outcome = parse_json(&output);
    assert_eq!(outcome.serial_number, "SN1");
    assert_eq!(outcome.final_verdict, "OK");
    assert_eq!(outcome.field_results.len(), 3);

    let history = fs::read_to_string(env.home.path().join("results.csv")).unwrap();
    assert_eq!(history.lines().count(), 2);
}

#[test]
fn test_check_nok_exits_one() {
    let env = CliEnv::new();
    env.add_report("DMC2", "ab cd 09 09 09");

    let output = env.run(&["check", "DMC2", "--json"]);
    assert_eq!(output.status.code(), Some(1));
    let outcome: Outcome = parse_json(&output);
    assert_eq!(outcome.final_verdict, "NOK");
}

#[test]
fn test_check_missing_report_exits_two() {
    let env = CliEnv::new();

    let output = env.run(&["check", "NOPE", "--json"]);
    assert_eq!(output.status.code(), Some(2));
    let error: serde_json::Value = parse_json(&output);
    assert_eq!(error["code"], "msgReportNotFound");
}

#[test]
fn test_status_reports_missing_folders() {
    let env = CliEnv::new();
    fs::remove_dir_all(&env.settings).unwrap();

    let output = env.run(&["status", "--json"]);
    assert!(output.status.success());
    let status: serde_json::Value = parse_json(&output);
    assert_eq!(status["ready"], false);
    assert_eq!(status["settings_folder"]["state"], "not a directory");
    assert_eq!(status["reports_folder"]["state"], "ok");
}

#[test]
fn test_smac_writes_document() {
    let env = CliEnv::new();
    let out = env.home.path().join("smac");

    let output = env.run(&[
        "smac",
        "--snr",
        "SN1",
        "--hwel",
        "HWEL_0000AABB_204",
        "--out",
        out.to_str().unwrap(),
    ]);
    assert!(output.status.success());
    let doc: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.join("SMAC_SN1.json")).unwrap()).unwrap();
    let items = &doc["testStepResults"][0]["iterations"][0]["resultItems"][0]["resultItems"];
    assert_eq!(items[1]["value"], "HWEL-0000AABB-204");
}

#[test]
fn test_pdi_mismatch_exits_one() {
    let env = CliEnv::new();
    let output = env.run(&[
        "pdi",
        "--snr",
        "SN1",
        "--hwel-hex",
        "aabb",
        "--hwel-dec",
        "999",
        "--json",
    ]);
    assert_eq!(output.status.code(), Some(1));
    let outcome: Outcome = parse_json(&output);
    assert_eq!(outcome.final_verdict, "NOK");
}
