//! Drives the command-line interface end to end against a temporary directory of SLHA files.

use slha_store::Host;
use std::fs;
use std::path::Path;

/// Test host that captures output to in-memory buffers.
struct TestHost {
    output_buf: Vec<u8>,
    error_buf: Vec<u8>,
}

impl TestHost {
    const fn new() -> Self {
        Self {
            output_buf: Vec::new(),
            error_buf: Vec::new(),
        }
    }

    fn output_str(&self) -> String {
        String::from_utf8_lossy(&self.output_buf).into_owned()
    }

    fn error_str(&self) -> String {
        String::from_utf8_lossy(&self.error_buf).into_owned()
    }
}

impl Host for TestHost {
    fn output(&mut self) -> impl std::io::Write {
        &mut self.output_buf
    }

    fn error(&mut self) -> impl std::io::Write {
        &mut self.error_buf
    }

    fn exit(&mut self, _code: i32) {}
}

fn write_points(dir: &Path) {
    fs::write(
        dir.join("1.slha"),
        "BLOCK MASS\n 25 1.25e2 # h0\n 1000022 1.5e2 # neutralino\nBLOCK NMIX\n 1 1 0.98\n",
    )
    .unwrap();
    fs::write(dir.join("2.slha"), "BLOCK NMIX\n 1 1 0.97\n").unwrap();
    fs::write(dir.join("3.slha"), "not an slha file\n").unwrap();
}

async fn run(host: &mut TestHost, args: &[&str]) -> slha_store::Result<()> {
    let mut full = vec!["slha-store", "--color", "never"];
    full.extend_from_slice(args);
    slha_store::run(host, full).await
}

#[tokio::test]
async fn test_ingest_then_inspect_and_export() {
    let tmp = tempfile::tempdir().expect("Failed to create temp dir");
    let dir = tmp.path();
    write_points(dir);
    let dir_arg = dir.to_str().unwrap();
    let store = dir.join("binary.bin");
    let store_arg = store.to_str().unwrap();

    let mut host = TestHost::new();
    run(&mut host, &["ingest", dir_arg]).await.unwrap();
    let output = host.output_str();
    assert!(output.contains("Ingested 2 files, updated 0"), "{output}");
    assert!(output.contains("Store holds 2 files and 3 variables"), "{output}");
    assert!(output.contains("1 inconsistencies logged"), "{output}");
    assert!(host.error_str().contains("3.slha"), "{}", host.error_str());
    assert!(store.exists());
    assert!(dir.join("inconsistencies.log").exists());

    let mut host = TestHost::new();
    run(&mut host, &["info", "--store", store_arg]).await.unwrap();
    let output = host.output_str();
    assert!(output.contains("variables: 3 of 150"), "{output}");
    assert!(output.contains("files:     2 of 2000"), "{output}");

    let mut host = TestHost::new();
    run(&mut host, &["variables", "--store", store_arg]).await.unwrap();
    let output = host.output_str();
    assert!(output.contains("MASS:1000022"), "{output}");
    assert!(output.contains("neutralino"), "{output}");
    assert!(output.contains("NMIX:1,1"), "{output}");

    let exported = dir.join("mass.dat");
    let mut host = TestHost::new();
    run(
        &mut host,
        &["export", "--store", store_arg, "--var", "MASS:25", "--var", "NMIX:1,1", "--output", exported.to_str().unwrap()],
    )
    .await
    .unwrap();
    assert!(host.output_str().contains("Exported 2 rows"), "{}", host.output_str());
    assert_eq!(
        fs::read_to_string(&exported).unwrap(),
        " 1.25000000E02     9.80000000E-01    \n 1.79769313E308     9.70000000E-01    \n"
    );
}

#[tokio::test]
async fn test_read_commands_do_not_create_a_store() {
    let tmp = tempfile::tempdir().expect("Failed to create temp dir");
    let store = tmp.path().join("missing.bin");

    let mut host = TestHost::new();
    let err = run(&mut host, &["info", "--store", store.to_str().unwrap()]).await.unwrap_err();
    assert!(err.to_string().contains("no store at"), "{err}");
    assert!(!store.exists());
}

#[tokio::test]
async fn test_export_rejects_bad_selector() {
    let tmp = tempfile::tempdir().expect("Failed to create temp dir");
    let store = tmp.path().join("binary.bin");
    let out = tmp.path().join("out.csv");

    let mut host = TestHost::new();
    let result = run(
        &mut host,
        &[
            "export",
            "--store",
            store.to_str().unwrap(),
            "--var",
            "MASS",
            "--output",
            out.to_str().unwrap(),
            "--format",
            "csv",
        ],
    )
    .await;

    let _ = result.unwrap_err();
    assert!(!out.exists());
}
