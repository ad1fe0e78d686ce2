use crate::domain::{PrepError, PrepResult};
use globset::Glob;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub(crate) const HEADER_GROUP: &str = "Header";
pub(crate) const STAR_GROUP: &str = "PartType4";
pub(crate) const GAS_GROUP: &str = "PartType0";

/// A dense, row-major numeric array read from a (possibly nested) JSON array.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    shape: Vec<usize>,
    values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DatasetError {
    #[error("dataset is ragged: expected {expected} entries along axis {axis}, found {found}")]
    Ragged {
        axis: usize,
        expected: usize,
        found: usize,
    },
    #[error("dataset contains a non-numeric entry at axis {axis}")]
    NonNumeric { axis: usize },
}

impl Dataset {
    pub fn new(shape: Vec<usize>, values: Vec<f64>) -> Self {
        debug_assert_eq!(shape.iter().product::<usize>(), values.len());
        Self { shape, values }
    }

    pub fn from_vector(values: Vec<f64>) -> Self {
        Self::new(vec![values.len()], values)
    }

    pub fn from_rows<const N: usize>(rows: &[[f64; N]]) -> Self {
        let values = rows.iter().flat_map(|row| row.iter().copied()).collect();
        Self::new(vec![rows.len(), N], values)
    }

    pub fn from_json(value: &Value) -> Result<Self, DatasetError> {
        let mut shape = Vec::new();
        let mut innermost = value;
        while let Value::Array(items) = innermost {
            shape.push(items.len());
            match items.first() {
                Some(first) => innermost = first,
                None => break,
            }
        }

        let mut values = Vec::with_capacity(shape.iter().product());
        collect_values(value, &shape, 0, &mut values)?;
        Ok(Self { shape, values })
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Length of the leading axis; a scalar counts as one entry.
    pub fn len(&self) -> usize {
        self.shape.first().copied().unwrap_or(1)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: &[usize]) -> Option<f64> {
        if index.len() != self.shape.len() {
            return None;
        }
        let mut offset = 0;
        for (axis, (&i, &extent)) in index.iter().zip(&self.shape).enumerate() {
            if i >= extent {
                return None;
            }
            let stride: usize = self.shape[axis + 1..].iter().product();
            offset += i * stride;
        }
        self.values.get(offset).copied()
    }

    pub fn contains(&self, needle: f64) -> bool {
        self.values.iter().any(|value| *value == needle)
    }

    /// Rows of an `(N, 3)` dataset.
    pub fn rows3(&self) -> Option<Vec<[f64; 3]>> {
        if self.shape.len() != 2 || self.shape[1] != 3 {
            return None;
        }
        Some(
            self.values
                .chunks_exact(3)
                .map(|chunk| [chunk[0], chunk[1], chunk[2]])
                .collect(),
        )
    }

    /// Column `column` of a 2-D dataset.
    pub fn column(&self, column: usize) -> Option<Vec<f64>> {
        if self.shape.len() != 2 || column >= self.shape[1] {
            return None;
        }
        let width = self.shape[1];
        Some(
            self.values
                .chunks_exact(width)
                .map(|row| row[column])
                .collect(),
        )
    }
}

fn collect_values(
    value: &Value,
    shape: &[usize],
    axis: usize,
    out: &mut Vec<f64>,
) -> Result<(), DatasetError> {
    if axis == shape.len() {
        return match value.as_f64() {
            Some(number) => {
                out.push(number);
                Ok(())
            }
            None => Err(DatasetError::NonNumeric { axis }),
        };
    }

    let Value::Array(items) = value else {
        return Err(DatasetError::NonNumeric { axis });
    };
    if items.len() != shape[axis] {
        return Err(DatasetError::Ragged {
            axis,
            expected: shape[axis],
            found: items.len(),
        });
    }
    for item in items {
        collect_values(item, shape, axis + 1, out)?;
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParticleGroup {
    datasets: BTreeMap<String, Dataset>,
}

impl ParticleGroup {
    pub fn with_dataset(mut self, name: &str, dataset: Dataset) -> Self {
        self.datasets.insert(name.to_string(), dataset);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Dataset> {
        self.datasets.get(name)
    }

    pub fn find_first_key(&self, candidates: &[&'static str]) -> Option<&'static str> {
        candidates
            .iter()
            .copied()
            .find(|candidate| self.datasets.contains_key(*candidate))
    }
}

/// One file of a (possibly multi-part) snapshot.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SnapshotPart {
    pub header: BTreeMap<String, Value>,
    pub groups: BTreeMap<String, ParticleGroup>,
}

impl SnapshotPart {
    pub fn with_header(mut self, key: &str, value: Value) -> Self {
        self.header.insert(key.to_string(), value);
        self
    }

    pub fn with_group(mut self, name: &str, group: ParticleGroup) -> Self {
        self.groups.insert(name.to_string(), group);
        self
    }

    pub fn group(&self, name: &str) -> Option<&ParticleGroup> {
        self.groups.get(name)
    }

    pub fn header_f64(&self, key: &str) -> Option<f64> {
        header_f64(&self.header, key)
    }
}

pub(crate) fn header_f64(header: &BTreeMap<String, Value>, key: &str) -> Option<f64> {
    match header.get(key)? {
        Value::Number(number) => number.as_f64(),
        Value::Array(items) if items.len() == 1 => items[0].as_f64(),
        _ => None,
    }
}

/// Time-indexed host tracking datasets, keyed by their `/`-joined group path.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HostTrack {
    pub datasets: BTreeMap<String, Dataset>,
}

impl HostTrack {
    pub fn with_dataset(mut self, path: &str, dataset: Dataset) -> Self {
        self.datasets.insert(path.to_string(), dataset);
        self
    }
}

/// Read-only access to snapshot parts and the host tracking resource.
pub trait SnapshotSource {
    fn load_part(&self, path: &Path) -> PrepResult<SnapshotPart>;

    fn load_host_track(&self, path: &Path) -> PrepResult<HostTrack>;
}

/// Reads snapshot parts and host tracks stored as JSON documents whose
/// top-level objects mirror the container groups (`Header`, `PartType0`, ...).
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSnapshotSource;

impl SnapshotSource for JsonSnapshotSource {
    fn load_part(&self, path: &Path) -> PrepResult<SnapshotPart> {
        let root = read_json_object(path, "INPUT.SNAPSHOT_PART")?;
        let mut part = SnapshotPart::default();
        for (name, value) in root {
            if name == HEADER_GROUP {
                let Value::Object(attrs) = value else {
                    return Err(PrepError::schema(
                        "INPUT.SNAPSHOT_HEADER",
                        format!("'{}': Header must be an object", path.display()),
                    ));
                };
                part.header = attrs.into_iter().collect();
            } else if name.starts_with("PartType") {
                let Value::Object(datasets) = value else {
                    return Err(PrepError::schema(
                        "INPUT.SNAPSHOT_GROUP",
                        format!("'{}': group '{}' must be an object", path.display(), name),
                    ));
                };
                let mut group = ParticleGroup::default();
                for (key, raw) in &datasets {
                    let dataset = Dataset::from_json(raw).map_err(|error| {
                        PrepError::schema(
                            "INPUT.SNAPSHOT_DATASET",
                            format!("'{}': {}/{}: {}", path.display(), name, key, error),
                        )
                    })?;
                    group.datasets.insert(key.clone(), dataset);
                }
                part.groups.insert(name, group);
            }
        }
        Ok(part)
    }

    fn load_host_track(&self, path: &Path) -> PrepResult<HostTrack> {
        if !path.is_file() {
            return Err(PrepError::resource_resolution(
                "INPUT.HOST_TRACK",
                format!("host coordinates file not found: {}", path.display()),
            ));
        }
        let root = read_json_object(path, "INPUT.HOST_TRACK")?;
        let mut track = HostTrack::default();
        flatten_track_group("", &root, &mut track.datasets);
        Ok(track)
    }
}

fn flatten_track_group(prefix: &str, group: &Map<String, Value>, out: &mut BTreeMap<String, Dataset>) {
    for (name, value) in group {
        let path = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{prefix}/{name}")
        };
        match value {
            Value::Object(child) => flatten_track_group(&path, child, out),
            Value::Array(_) | Value::Number(_) => {
                // Non-numeric leaves (labels, units) are not datasets.
                if let Ok(dataset) = Dataset::from_json(value) {
                    out.insert(path, dataset);
                }
            }
            _ => {}
        }
    }
}

fn read_json_object(path: &Path, placeholder: &'static str) -> PrepResult<Map<String, Value>> {
    let source = fs::read_to_string(path).map_err(|source| {
        PrepError::resource_resolution(
            placeholder,
            format!("failed to read '{}': {}", path.display(), source),
        )
    })?;
    match serde_json::from_str::<Value>(&source) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(PrepError::schema(
            placeholder,
            format!("'{}' must contain a JSON object at the top level", path.display()),
        )),
        Err(source) => Err(PrepError::schema(
            placeholder,
            format!("failed to parse '{}': {}", path.display(), source),
        )),
    }
}

pub(crate) fn expand_home(pattern: &str) -> String {
    match (pattern.strip_prefix("~/"), std::env::var("HOME")) {
        (Some(rest), Ok(home)) => format!("{home}/{rest}"),
        _ => pattern.to_string(),
    }
}

/// Resolves a snapshot glob to its matching files, sorted by path.
///
/// Only the final path component may contain glob syntax.
pub fn resolve_snapshot_files(pattern: &str) -> PrepResult<Vec<PathBuf>> {
    let expanded = expand_home(pattern);
    let pattern_path = Path::new(&expanded);
    let file_pattern = pattern_path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| {
            PrepError::resource_resolution(
                "INPUT.SNAPSHOT_GLOB",
                format!("snapshot glob '{}' does not name any files", pattern),
            )
        })?;
    let base_dir = match pattern_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    if base_dir.to_string_lossy().contains(['*', '?', '[', '{']) {
        return Err(PrepError::resource_resolution(
            "INPUT.SNAPSHOT_GLOB",
            format!(
                "snapshot glob '{}' may only use wildcards in the file name",
                pattern
            ),
        ));
    }

    let matcher = Glob::new(file_pattern)
        .map_err(|error| {
            PrepError::resource_resolution(
                "INPUT.SNAPSHOT_GLOB",
                format!("invalid snapshot glob '{}': {}", pattern, error),
            )
        })?
        .compile_matcher();

    let mut matches: Vec<PathBuf> = match fs::read_dir(&base_dir) {
        Ok(entries) => entries
            .filter_map(Result::ok)
            .filter(|entry| entry.path().is_file())
            .filter(|entry| matcher.is_match(entry.file_name()))
            .map(|entry| base_dir.join(entry.file_name()))
            .collect(),
        Err(_) => Vec::new(),
    };
    matches.sort();

    if matches.is_empty() {
        return Err(PrepError::resource_resolution(
            "INPUT.SNAPSHOT_GLOB",
            format!("no snapshot files found for glob: {}", expanded),
        ));
    }
    Ok(matches)
}
