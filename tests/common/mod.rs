use std::path::Path;
use std::process::Output;

use anyhow::{anyhow, Result as AnyhowResult};

pub fn run_cnkit(args: &[&str]) -> AnyhowResult<Output> {
    let exe = Path::new(env!("CARGO_BIN_EXE_cnkit"));
    assert!(exe.exists());

    let output = std::process::Command::new(exe)
        .args(args)
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()?
        .wait_with_output()?;
    if output.status.success() {
        Ok(output)
    } else {
        Err(anyhow!("failed to run {:?}", args.join(" ")))
    }
}

pub fn check_against_expected_text_file(output_fp: &str, expected_fp: &str) {
    use std::fs::File;
    use std::io::Read;

    assert_ne!(output_fp, expected_fp, "cannot check a file against itself");
    let actual = {
        let mut fh = File::open(output_fp).unwrap();
        let mut buf = String::new();
        fh.read_to_string(&mut buf).unwrap();
        buf
    };
    let expected = {
        let mut fh = File::open(expected_fp).unwrap();
        let mut buf = String::new();
        fh.read_to_string(&mut buf).unwrap();
        buf
    };

    similar_asserts::assert_eq!(
        actual,
        expected,
        "{output_fp} is not the same as {expected_fp}"
    );
}
