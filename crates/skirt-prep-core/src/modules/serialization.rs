use crate::domain::{PrepError, PrepResult};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;

pub fn format_fixed_f64(value: f64, width: usize, precision: usize) -> String {
    format!(
        "{value:>width$.precision$}",
        width = width,
        precision = precision
    )
}

/// Fixed-point rendering with a leading space in place of a `+` sign, so columns line up.
pub fn format_space_signed(value: f64, precision: usize) -> String {
    let rendered = format!("{value:.precision$}", precision = precision);
    if rendered.starts_with('-') {
        rendered
    } else {
        format!(" {rendered}")
    }
}

/// C-style `%.{precision}e` rendering: signed, at least two exponent digits.
pub fn format_scientific(value: f64, precision: usize) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let rendered = format!("{value:.precision$e}", precision = precision);
    let Some((mantissa, exponent)) = rendered.split_once('e') else {
        return rendered;
    };
    let (sign, digits) = match exponent.strip_prefix('-') {
        Some(digits) => ('-', digits),
        None => ('+', exponent),
    };
    format!("{mantissa}e{sign}{digits:0>2}")
}

pub fn normalize_text_artifact(content: &str) -> String {
    let mut normalized = content.replace("\r\n", "\n").replace('\r', "\n");
    if !normalized.is_empty() && !normalized.ends_with('\n') {
        normalized.push('\n');
    }
    normalized
}

pub fn write_text_artifact(path: &Path, content: &str) -> std::io::Result<()> {
    fs::write(path, normalize_text_artifact(content))
}

pub fn write_json_artifact<T: Serialize>(path: &Path, value: &T) -> PrepResult<()> {
    let content = serde_json::to_string_pretty(value).map_err(|source| {
        PrepError::internal(
            "SYS.JSON_ENCODE",
            format!("failed to encode '{}': {}", path.display(), source),
        )
    })?;
    write_text_artifact(path, &content).map_err(|source| write_error(path, source))
}

pub fn read_json_artifact<T: DeserializeOwned>(
    path: &Path,
    placeholder: &'static str,
) -> PrepResult<T> {
    let content = read_text_artifact(path, placeholder)?;
    serde_json::from_str(&content).map_err(|source| {
        PrepError::schema(
            placeholder,
            format!("failed to parse '{}': {}", path.display(), source),
        )
    })
}

pub fn read_text_artifact(path: &Path, placeholder: &'static str) -> PrepResult<String> {
    fs::read_to_string(path).map_err(|source| {
        PrepError::resource_resolution(
            placeholder,
            format!("failed to read '{}': {}", path.display(), source),
        )
    })
}

pub fn ensure_output_dir(path: &Path) -> PrepResult<()> {
    fs::create_dir_all(path).map_err(|source| {
        PrepError::io_system(
            "IO.OUTPUT_DIRECTORY",
            format!(
                "failed to create output directory '{}': {}",
                path.display(),
                source
            ),
        )
    })
}

pub fn write_error(path: &Path, source: std::io::Error) -> PrepError {
    PrepError::io_system(
        "IO.WRITE_ARTIFACT",
        format!("failed to write '{}': {}", path.display(), source),
    )
}

#[cfg(test)]
mod tests {
    use super::{
        format_fixed_f64, format_scientific, format_space_signed, normalize_text_artifact,
        read_json_artifact, write_json_artifact, write_text_artifact,
    };
    use crate::domain::PrepErrorCategory;
    use std::collections::BTreeMap;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn scientific_formatting_uses_signed_two_digit_exponents() {
        assert_eq!(format_scientific(1.5, 8), "1.50000000e+00");
        assert_eq!(format_scientific(-0.000123, 8), "-1.23000000e-04");
        assert_eq!(format_scientific(6.96e5, 8), "6.96000000e+05");
        assert_eq!(format_scientific(1.0e-120, 2), "1.00e-120");
        assert_eq!(format_scientific(0.0, 3), "0.000e+00");
        assert_eq!(format_scientific(f64::NAN, 8), "nan");
    }

    #[test]
    fn fixed_width_float_formatting_is_deterministic() {
        assert_eq!(format_fixed_f64(1.23, 13, 5), "      1.23000");
        assert_eq!(format_space_signed(0.5, 3), " 0.500");
        assert_eq!(format_space_signed(-0.5, 3), "-0.500");
    }

    #[test]
    fn normalize_text_artifact_uses_canonical_line_endings() {
        assert_eq!(
            normalize_text_artifact("alpha\r\nbeta\rgamma"),
            "alpha\nbeta\ngamma\n"
        );
    }

    #[test]
    fn repeated_text_writes_produce_identical_bytes() {
        let temp = TempDir::new().expect("tempdir should be created");
        let path = temp.path().join("artifact.txt");
        let input = "line 1\r\nline 2\rline 3";

        write_text_artifact(&path, input).expect("first write should succeed");
        let first = fs::read(&path).expect("artifact should be readable");
        write_text_artifact(&path, input).expect("second write should succeed");
        let second = fs::read(&path).expect("artifact should be readable");

        assert_eq!(first, second);
        assert_eq!(second, b"line 1\nline 2\nline 3\n");
    }

    #[test]
    fn json_artifacts_round_trip_and_report_schema_errors() {
        let temp = TempDir::new().expect("tempdir should be created");
        let path = temp.path().join("values.json");
        let mut values = BTreeMap::new();
        values.insert("b".to_string(), 2.0_f64);
        values.insert("a".to_string(), 1.0_f64);

        write_json_artifact(&path, &values).expect("json should be written");
        let text = fs::read_to_string(&path).expect("json should be readable");
        assert!(text.find("\"a\"") < text.find("\"b\""));

        let parsed: BTreeMap<String, f64> =
            read_json_artifact(&path, "INPUT.TEST").expect("json should parse");
        assert_eq!(parsed, values);

        fs::write(&path, "[1, 2").expect("file should be written");
        let error = read_json_artifact::<Vec<f64>>(&path, "INPUT.TEST")
            .expect_err("truncated json should fail");
        assert_eq!(error.category(), PrepErrorCategory::SchemaError);

        let error = read_json_artifact::<Vec<f64>>(&temp.path().join("absent.json"), "INPUT.TEST")
            .expect_err("missing json should fail");
        assert_eq!(
            error.category(),
            PrepErrorCategory::ResourceResolutionError
        );
    }
}
