//! Binary sample layouts for DEM payloads.

use std::fmt;
use std::str::FromStr;

/// Binary layout of one DEM sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DemEncoding {
    /// 32-bit IEEE float, little-endian
    #[default]
    Float32Le,
    /// 32-bit IEEE float, big-endian
    Float32Be,
    /// 16-bit signed integer, little-endian
    Int16Le,
    /// 16-bit signed integer, big-endian
    Int16Be,
}

impl DemEncoding {
    pub const ALL: [DemEncoding; 4] = [
        DemEncoding::Float32Le,
        DemEncoding::Float32Be,
        DemEncoding::Int16Le,
        DemEncoding::Int16Be,
    ];

    /// Size of one sample in bytes.
    pub fn element_size(&self) -> usize {
        match self {
            DemEncoding::Float32Le | DemEncoding::Float32Be => 4,
            DemEncoding::Int16Le | DemEncoding::Int16Be => 2,
        }
    }

    /// Decodes every whole sample in `data`; trailing bytes are ignored.
    pub fn decode(&self, data: &[u8]) -> Vec<f32> {
        let chunks = data.chunks_exact(self.element_size());
        match self {
            DemEncoding::Float32Le => chunks
                .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect(),
            DemEncoding::Float32Be => chunks
                .map(|c| f32::from_be_bytes([c[0], c[1], c[2], c[3]]))
                .collect(),
            DemEncoding::Int16Le => chunks
                .map(|c| i16::from_le_bytes([c[0], c[1]]) as f32)
                .collect(),
            DemEncoding::Int16Be => chunks
                .map(|c| i16::from_be_bytes([c[0], c[1]]) as f32)
                .collect(),
        }
    }

    /// Encodes samples into this layout. Integer layouts round and saturate.
    pub fn encode(&self, samples: &[f32]) -> Vec<u8> {
        let mut out = Vec::with_capacity(samples.len() * self.element_size());
        for &v in samples {
            match self {
                DemEncoding::Float32Le => out.extend_from_slice(&v.to_le_bytes()),
                DemEncoding::Float32Be => out.extend_from_slice(&v.to_be_bytes()),
                DemEncoding::Int16Le => out.extend_from_slice(&(v.round() as i16).to_le_bytes()),
                DemEncoding::Int16Be => out.extend_from_slice(&(v.round() as i16).to_be_bytes()),
            }
        }
        out
    }

    /// Configuration name of this encoding.
    pub fn name(&self) -> &'static str {
        match self {
            DemEncoding::Float32Le => "float32le",
            DemEncoding::Float32Be => "float32be",
            DemEncoding::Int16Le => "int16le",
            DemEncoding::Int16Be => "int16be",
        }
    }
}

impl fmt::Display for DemEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DemEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "float32le" | "float" | "float32" => Ok(DemEncoding::Float32Le),
            "float32be" | "float_be" => Ok(DemEncoding::Float32Be),
            "int16le" | "int16" => Ok(DemEncoding::Int16Le),
            "int16be" | "int16_be" => Ok(DemEncoding::Int16Be),
            other => Err(format!("unknown DEM encoding '{}'", other)),
        }
    }
}
