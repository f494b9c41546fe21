//! # Embedding Oracle
//!
//! `similarity(a, b)` in [0, 1], or `None` when either word has no vector.
//!
//! ## Model file
//! word2vec text format, what most pretrained French/English models ship as:
//! ```text
//! 3 4
//! chat 0.12 -0.30 0.88 0.01
//! chien 0.10 -0.25 0.80 0.05
//! voiture -0.70 0.40 0.02 0.33
//! ```
//! The `count dim` header is optional. Vectors are normalized once at load so cosine is a dot
//! product.
use std::{
    collections::HashMap,
    fs::File,
    io::{self, BufRead, BufReader},
    path::Path,
};

use bank::normalize;
use thiserror::Error;
use tracing::{info, warn};

pub trait EmbeddingOracle: Send + Sync {
    fn similarity(&self, a: &str, b: &str) -> Option<f32>;

    fn contains(&self, word: &str) -> bool;
}

#[derive(Error, Debug)]
pub enum OracleError {
    #[error("Failed to read model: {0}")]
    Io(#[from] io::Error),

    #[error("Model has no usable vectors")]
    Empty,

    #[error("Vector has {found} dimensions, expected {expected}")]
    Dimensions { expected: usize, found: usize },
}

pub struct VectorModel {
    dimensions: usize,
    vectors: HashMap<String, Vec<f32>>,
}

fn unit(mut vector: Vec<f32>) -> Option<Vec<f32>> {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm == 0.0 || !norm.is_finite() {
        return None;
    }

    vector.iter_mut().for_each(|x| *x /= norm);

    Some(vector)
}

fn parse_header(line: &str) -> Option<usize> {
    let mut parts = line.split_whitespace();
    let _count: usize = parts.next()?.parse().ok()?;
    let dimensions: usize = parts.next()?.parse().ok()?;

    parts.next().is_none().then_some(dimensions)
}

impl VectorModel {
    pub fn from_vectors<I>(vectors: I) -> Result<Self, OracleError>
    where
        I: IntoIterator<Item = (String, Vec<f32>)>,
    {
        let mut dimensions = None;
        let mut model = HashMap::new();

        for (word, vector) in vectors {
            let expected = *dimensions.get_or_insert(vector.len());

            if vector.len() != expected {
                return Err(OracleError::Dimensions {
                    expected,
                    found: vector.len(),
                });
            }

            if let Some(vector) = unit(vector) {
                model.insert(normalize(&word), vector);
            }
        }

        match dimensions {
            Some(dimensions) if !model.is_empty() => Ok(Self {
                dimensions,
                vectors: model,
            }),
            _ => Err(OracleError::Empty),
        }
    }

    pub fn load(path: &Path) -> Result<Self, OracleError> {
        let model = Self::parse(BufReader::new(File::open(path)?))?;
        info!(
            "Loaded {} vectors of {} dimensions from {}",
            model.len(),
            model.dimensions(),
            path.display()
        );

        Ok(model)
    }

    pub fn parse<R: BufRead>(reader: R) -> Result<Self, OracleError> {
        let mut dimensions = None;
        let mut vectors = HashMap::new();
        let mut skipped = 0usize;

        for (index, line) in reader.lines().enumerate() {
            let line = line?;

            if line.trim().is_empty() {
                continue;
            }

            if index == 0 {
                if let Some(header) = parse_header(&line) {
                    dimensions = Some(header);
                    continue;
                }
            }

            let mut parts = line.split_whitespace();
            let Some(word) = parts.next() else {
                continue;
            };

            let values: Result<Vec<f32>, _> = parts.map(str::parse::<f32>).collect();
            let Ok(values) = values else {
                skipped += 1;
                continue;
            };
            if values.is_empty() {
                skipped += 1;
                continue;
            }

            let expected = *dimensions.get_or_insert(values.len());
            if values.len() != expected {
                skipped += 1;
                continue;
            }

            match unit(values) {
                Some(vector) => {
                    vectors.insert(normalize(word), vector);
                }
                None => skipped += 1,
            }
        }

        if skipped > 0 {
            warn!("Skipped {skipped} unusable model lines");
        }

        match dimensions {
            Some(dimensions) if !vectors.is_empty() => Ok(Self {
                dimensions,
                vectors,
            }),
            _ => Err(OracleError::Empty),
        }
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }
}

impl EmbeddingOracle for VectorModel {
    fn similarity(&self, a: &str, b: &str) -> Option<f32> {
        let (a, b) = (normalize(a), normalize(b));
        let first = self.vectors.get(&a)?;
        let second = self.vectors.get(&b)?;

        // identity is 1.0 by definition, never computed
        if a == b {
            return Some(1.0);
        }

        let dot: f32 = first.iter().zip(second).map(|(x, y)| x * y).sum();

        Some(dot.clamp(0.0, 1.0))
    }

    fn contains(&self, word: &str) -> bool {
        self.vectors.contains_key(&normalize(word))
    }
}
