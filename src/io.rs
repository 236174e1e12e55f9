//! Safetensors container I/O.
//!
//! Every artifact the pipeline persists (split recordings, decomposition
//! models, cleaned partitions, the final cleaned recording) is a flat
//! safetensors file: an 8-byte little-endian header length, a JSON header
//! mapping tensor names to `{dtype, shape, data_offsets}`, then raw bytes.
//! Text (channel names, labels) is stored as `U8` tensors holding
//! newline-joined UTF-8.
use anyhow::{bail, Context, Result};
use ndarray::{Array1, Array2};
use std::collections::HashMap;
use std::path::Path;

// ── Reader ────────────────────────────────────────────────────────────────────

struct Entry {
    dtype: String,
    shape: Vec<usize>,
    start: usize,
    end: usize,
}

fn parse_entry(name: &str, value: &serde_json::Value) -> Result<Entry> {
    let dtype = value["dtype"]
        .as_str()
        .with_context(|| format!("tensor '{name}': missing dtype"))?
        .to_string();
    let shape = value["shape"]
        .as_array()
        .with_context(|| format!("tensor '{name}': missing shape"))?
        .iter()
        .map(|v| v.as_u64().map(|d| d as usize))
        .collect::<Option<Vec<_>>>()
        .with_context(|| format!("tensor '{name}': bad shape"))?;
    let offsets = value["data_offsets"]
        .as_array()
        .with_context(|| format!("tensor '{name}': missing data_offsets"))?;
    let (start, end) = match (offsets.first().and_then(|v| v.as_u64()), offsets.get(1).and_then(|v| v.as_u64())) {
        (Some(s), Some(e)) if s <= e => (s as usize, e as usize),
        _ => bail!("tensor '{name}': bad data_offsets"),
    };
    Ok(Entry { dtype, shape, start, end })
}

/// In-memory view of one safetensors file.
pub struct StReader {
    bytes: Vec<u8>,
    data_start: usize,
    entries: HashMap<String, Entry>,
}

impl StReader {
    pub fn open(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_bytes(bytes).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        if bytes.len() < 8 {
            bail!("safetensors file too small");
        }
        let mut len = [0u8; 8];
        len.copy_from_slice(&bytes[..8]);
        let n = u64::from_le_bytes(len) as usize;
        if bytes.len() < 8 + n {
            bail!("safetensors header truncated");
        }
        let header: HashMap<String, serde_json::Value> =
            serde_json::from_slice(&bytes[8..8 + n])
                .context("failed to parse safetensors header")?;

        let mut entries = HashMap::new();
        for (name, value) in &header {
            if name == "__metadata__" {
                continue;
            }
            entries.insert(name.clone(), parse_entry(name, value)?);
        }
        let data_start = 8 + n;
        for (name, e) in &entries {
            if data_start + e.end > bytes.len() {
                bail!("tensor '{name}' runs past end of file");
            }
        }
        Ok(Self { bytes, data_start, entries })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    fn raw(&self, name: &str, dtype: &str) -> Result<(&[u8], &[usize])> {
        let e = self.entries.get(name).with_context(|| format!("missing '{name}' key"))?;
        if e.dtype != dtype {
            bail!("tensor '{name}': expected {dtype}, found {}", e.dtype);
        }
        Ok((&self.bytes[self.data_start + e.start..self.data_start + e.end], &e.shape))
    }

    pub fn f64_vec(&self, name: &str) -> Result<(Vec<f64>, Vec<usize>)> {
        let (raw, shape) = self.raw(name, "F64")?;
        let vals = raw
            .chunks_exact(8)
            .map(|b| f64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
            .collect();
        Ok((vals, shape.to_vec()))
    }

    pub fn f32_vec(&self, name: &str) -> Result<(Vec<f32>, Vec<usize>)> {
        let (raw, shape) = self.raw(name, "F32")?;
        let vals = raw
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();
        Ok((vals, shape.to_vec()))
    }

    pub fn f64_arr1(&self, name: &str) -> Result<Array1<f64>> {
        let (vals, _) = self.f64_vec(name)?;
        Ok(Array1::from_vec(vals))
    }

    pub fn f64_arr2(&self, name: &str) -> Result<Array2<f64>> {
        let (vals, shape) = self.f64_vec(name)?;
        if shape.len() != 2 {
            bail!("tensor '{name}': expected 2-D, got shape {shape:?}");
        }
        Ok(Array2::from_shape_vec((shape[0], shape[1]), vals)?)
    }

    pub fn f32_arr2(&self, name: &str) -> Result<Array2<f32>> {
        let (vals, shape) = self.f32_vec(name)?;
        if shape.len() != 2 {
            bail!("tensor '{name}': expected 2-D, got shape {shape:?}");
        }
        Ok(Array2::from_shape_vec((shape[0], shape[1]), vals)?)
    }

    pub fn f64_scalar(&self, name: &str) -> Result<f64> {
        let (vals, _) = self.f64_vec(name)?;
        vals.first().copied().with_context(|| format!("tensor '{name}' is empty"))
    }

    pub fn bytes(&self, name: &str) -> Result<&[u8]> {
        Ok(self.raw(name, "U8")?.0)
    }

    /// Newline-joined text tensor split back into lines. Empty lines dropped.
    pub fn lines(&self, name: &str) -> Result<Vec<String>> {
        let raw = std::str::from_utf8(self.bytes(name)?)
            .with_context(|| format!("tensor '{name}' is not UTF-8"))?;
        Ok(raw.split('\n').filter(|s| !s.is_empty()).map(String::from).collect())
    }
}

// ── Writer ────────────────────────────────────────────────────────────────────

/// Safetensors writer for F32, F64 and U8 tensors.
///
/// ```rust,no_run
/// use lcf::io::StWriter;
/// use std::path::Path;
/// let mut w = StWriter::new();
/// w.add_f64("sfreq", &[500.0], &[1]);
/// w.add_lines("ch_names", &["Fz".to_string(), "Cz".to_string()]);
/// w.write(Path::new("/tmp/out.safetensors")).unwrap();
/// ```
#[derive(Default)]
pub struct StWriter {
    entries: Vec<(String, Vec<u8>, &'static str, Vec<usize>)>,
}

impl StWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_f32(&mut self, name: &str, data: &[f32], shape: &[usize]) {
        let bytes: Vec<u8> = data.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.entries.push((name.to_string(), bytes, "F32", shape.to_vec()));
    }

    pub fn add_f32_arr2(&mut self, name: &str, arr: &Array2<f32>) {
        let data: Vec<f32> = arr.iter().copied().collect();
        self.add_f32(name, &data, &[arr.nrows(), arr.ncols()]);
    }

    pub fn add_f64(&mut self, name: &str, data: &[f64], shape: &[usize]) {
        let bytes: Vec<u8> = data.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.entries.push((name.to_string(), bytes, "F64", shape.to_vec()));
    }

    pub fn add_f64_arr1(&mut self, name: &str, arr: &Array1<f64>) {
        let data: Vec<f64> = arr.iter().copied().collect();
        self.add_f64(name, &data, &[arr.len()]);
    }

    pub fn add_f64_arr2(&mut self, name: &str, arr: &Array2<f64>) {
        let data: Vec<f64> = arr.iter().copied().collect();
        self.add_f64(name, &data, &[arr.nrows(), arr.ncols()]);
    }

    pub fn add_u8(&mut self, name: &str, data: &[u8]) {
        self.entries.push((name.to_string(), data.to_vec(), "U8", vec![data.len()]));
    }

    pub fn add_lines(&mut self, name: &str, lines: &[String]) {
        self.add_u8(name, lines.join("\n").as_bytes());
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        use std::io::Write;
        let mut header_map = serde_json::Map::new();
        let mut offset: usize = 0;
        for (name, data, dtype, shape) in &self.entries {
            header_map.insert(name.clone(), serde_json::json!({
                "dtype": dtype,
                "shape": shape,
                "data_offsets": [offset, offset + data.len()],
            }));
            offset += data.len();
        }
        let hdr_bytes = serde_json::to_vec(&header_map)?;
        let pad = (8 - hdr_bytes.len() % 8) % 8;
        let padded: Vec<u8> = hdr_bytes.into_iter()
            .chain(std::iter::repeat(b' ').take(pad))
            .collect();
        let mut f = std::fs::File::create(path)
            .with_context(|| format!("creating {}", path.display()))?;
        f.write_all(&(padded.len() as u64).to_le_bytes())?;
        f.write_all(&padded)?;
        for (_, data, _, _) in &self.entries {
            f.write_all(data)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_is_eight_byte_aligned() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.safetensors");
        let mut w = StWriter::new();
        w.add_f64("x", &[1.0, 2.0, 3.0], &[3]);
        w.write(&path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        let n = u64::from_le_bytes(bytes[..8].try_into().unwrap());
        assert_eq!(n % 8, 0);
    }

    #[test]
    fn mixed_dtypes_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("b.safetensors");
        let arr = Array2::from_shape_fn((2, 3), |(r, c)| (r * 3 + c) as f64);
        let mut w = StWriter::new();
        w.add_f64_arr2("m", &arr);
        w.add_f32("s", &[0.5], &[1]);
        w.add_lines("names", &["Fp1".into(), "Fp2".into()]);
        w.write(&path).unwrap();

        let r = StReader::open(&path).unwrap();
        assert_eq!(r.f64_arr2("m").unwrap(), arr);
        assert_eq!(r.f32_vec("s").unwrap().0, vec![0.5]);
        assert_eq!(r.lines("names").unwrap(), vec!["Fp1", "Fp2"]);
        assert!(!r.contains("absent"));
    }

    #[test]
    fn wrong_dtype_is_an_error() {
        let mut w = StWriter::new();
        w.add_f32("x", &[1.0], &[1]);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.safetensors");
        w.write(&path).unwrap();
        let r = StReader::open(&path).unwrap();
        assert!(r.f64_vec("x").is_err());
    }

    #[test]
    fn truncated_file_rejected() {
        assert!(StReader::from_bytes(vec![1, 2, 3]).is_err());
        let mut bytes = 100u64.to_le_bytes().to_vec();
        bytes.extend_from_slice(b"{}");
        assert!(StReader::from_bytes(bytes).is_err());
    }
}
