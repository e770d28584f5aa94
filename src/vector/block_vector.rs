use std::collections::BTreeMap;
use std::fmt;
use crate::floatgeneric::FloatGeneric;
use crate::solver_error::SolverError;

type La = FloatGeneric<f64>;

/// Keyed collection of dense vectors.
///
/// A missing key denotes a zero block.
/// Inserting an existing key adds to the stored block.
#[derive(Clone, Default, PartialEq)]
pub struct BlockVector
{
    blocks: BTreeMap<String, Vec<f64>>,
}

impl BlockVector
{
    pub fn new() -> Self
    {
        BlockVector::default()
    }

    /// Inserts `value` at `key`, or adds it to the block already there.
    ///
    /// Returns [`SolverError::DimensionMismatch`] if the existing block has a different length.
    pub fn insert_or_add(&mut self, key: &str, value: Vec<f64>) -> Result<(), SolverError>
    {
        self.insert_or_add_scaled(key, 1., &value)
    }

    /// Inserts or adds \\(\alpha\\) `value` at `key`.
    pub fn insert_or_add_scaled(&mut self, key: &str, alpha: f64, value: &[f64]) -> Result<(), SolverError>
    {
        if let Some(v) = self.blocks.get_mut(key) {
            if v.len() != value.len() {
                return Err(SolverError::DimensionMismatch(
                    format!("block {}: {} vs {}", key, v.len(), value.len())
                ));
            }
            La::add(alpha, value, v);
        }
        else {
            self.blocks.insert(key.to_string(), value.iter().map(|v| alpha * v).collect());
        }
        Ok(())
    }

    /// Overwrites the block at `key`.
    pub fn insert(&mut self, key: &str, value: Vec<f64>)
    {
        self.blocks.insert(key.to_string(), value);
    }

    /// Calculates `self += alpha * other` block by block.
    pub fn add_scaled(&mut self, alpha: f64, other: &BlockVector) -> Result<(), SolverError>
    {
        for (k, v) in other.iter() {
            self.insert_or_add_scaled(k, alpha, v)?;
        }
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&Vec<f64>>
    {
        self.blocks.get(key)
    }

    /// Block at `key`, or a zero vector of length `n` if absent.
    pub fn get_or_zero(&self, key: &str, n: usize) -> Vec<f64>
    {
        self.blocks.get(key).cloned().unwrap_or_else(|| vec![0.; n])
    }

    pub fn contains_key(&self, key: &str) -> bool
    {
        self.blocks.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item=&String>
    {
        self.blocks.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item=(&String, &Vec<f64>)>
    {
        self.blocks.iter()
    }

    pub fn len(&self) -> usize
    {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.blocks.is_empty()
    }

    /// Total number of components.
    pub fn dim(&self) -> usize
    {
        self.blocks.values().map(|v| v.len()).sum()
    }

    /// Euclidean norm over all blocks.
    pub fn norm(&self) -> f64
    {
        self.blocks.values()
            .map(|v| La::dot(v, v))
            .sum::<f64>()
            .sqrt()
    }

    pub fn debug_string(&self) -> String
    {
        let mut s = String::new();
        for (k, v) in self.blocks.iter() {
            s.push_str(&format!("{}: {:?}\n", k, v));
        }
        s
    }
}

impl fmt::Debug for BlockVector
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.write_str(&self.debug_string())
    }
}

//

#[test]
fn test_block_vector_accumulate()
{
    let mut v = BlockVector::new();
    v.insert_or_add("k", vec![1., 2.]).unwrap();
    v.insert_or_add("k", vec![3., 4.]).unwrap();
    assert_eq!(v.get("k").unwrap(), &vec![4., 6.]);

    assert!(v.insert_or_add("k", vec![1.]).is_err());
    assert_eq!(v.get_or_zero("z", 3), vec![0.; 3]);

    v.insert_or_add("j", vec![0., 0., 0., 0.]).unwrap();
    assert_eq!(v.dim(), 6);
    assert!((v.norm() - (16f64 + 36.).sqrt()).abs() < 1e-12);
}
