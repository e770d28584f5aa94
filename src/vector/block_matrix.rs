use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use crate::floatgeneric::FloatGeneric;
use crate::linear::LinearMap;
use crate::solver_error::SolverError;
use super::BlockVector;

type La = FloatGeneric<f64>;

/// Keyed collection of linear operators, row key to column key.
///
/// A missing key pair denotes a zero block.
/// Inserting an existing key pair adds to the stored operator.
/// Every block of a row shares its row count, and every block of a column its column count.
#[derive(Clone, Default, PartialEq)]
pub struct BlockMatrix
{
    blocks: BTreeMap<String, BTreeMap<String, LinearMap>>,
    row_dims: BTreeMap<String, usize>,
    col_dims: BTreeMap<String, usize>,
}

impl BlockMatrix
{
    pub fn new() -> Self
    {
        BlockMatrix::default()
    }

    /// Inserts `map` at `(row, col)`, or adds it to the operator already there.
    pub fn insert_or_add(&mut self, row: &str, col: &str, map: LinearMap) -> Result<(), SolverError>
    {
        let (m, n) = map.size();
        check_dim(&self.row_dims, "row", row, m)?;
        check_dim(&self.col_dims, "column", col, n)?;

        self.row_dims.insert(row.to_string(), m);
        self.col_dims.insert(col.to_string(), n);

        let r = self.blocks.entry(row.to_string()).or_default();
        if let Some(prev) = r.get_mut(col) {
            *prev += &map;
        }
        else {
            r.insert(col.to_string(), map);
        }
        Ok(())
    }

    /// Inserts all blocks of `other`.
    pub fn add(&mut self, other: &BlockMatrix) -> Result<(), SolverError>
    {
        for (row, col, map) in other.iter() {
            self.insert_or_add(row, col, map.clone())?;
        }
        Ok(())
    }

    pub fn get(&self, row: &str, col: &str) -> Option<&LinearMap>
    {
        self.blocks.get(row).and_then(|r| r.get(col))
    }

    /// Iterates `(row, col, map)` in key order.
    pub fn iter(&self) -> impl Iterator<Item=(&String, &String, &LinearMap)>
    {
        self.blocks.iter()
            .flat_map(|(row, r)| r.iter().map(move |(col, map)| (row, col, map)))
    }

    pub fn row_keys(&self) -> impl Iterator<Item=&String>
    {
        self.row_dims.keys()
    }

    pub fn col_keys(&self) -> impl Iterator<Item=&String>
    {
        self.col_dims.keys()
    }

    pub fn row_dim(&self, row: &str) -> Option<usize>
    {
        self.row_dims.get(row).copied()
    }

    pub fn col_dim(&self, col: &str) -> Option<usize>
    {
        self.col_dims.get(col).copied()
    }

    /// Total number of rows.
    pub fn m(&self) -> usize
    {
        self.row_dims.values().sum()
    }

    /// Total number of columns.
    pub fn n(&self) -> usize
    {
        self.col_dims.values().sum()
    }

    pub fn is_empty(&self) -> bool
    {
        self.blocks.is_empty()
    }

    pub fn transpose(&self) -> BlockMatrix
    {
        let mut t = BlockMatrix::new();
        for (row, col, map) in self.iter() {
            t.blocks.entry(col.clone()).or_default().insert(row.clone(), map.transpose());
        }
        t.row_dims = self.col_dims.clone();
        t.col_dims = self.row_dims.clone();
        t
    }

    /// Blocks whose column key is in `cols`.
    pub fn restrict_cols(&self, cols: &BTreeSet<String>) -> BlockMatrix
    {
        let mut a = BlockMatrix::new();
        for (row, col, map) in self.iter() {
            if cols.contains(col) {
                a.blocks.entry(row.clone()).or_default().insert(col.clone(), map.clone());
                a.row_dims.insert(row.clone(), map.m());
                a.col_dims.insert(col.clone(), map.n());
            }
        }
        a
    }

    /// Calculates \\(A x\\).
    ///
    /// A column block missing from `x` is taken as zero.
    pub fn apply(&self, x: &BlockVector) -> Result<BlockVector, SolverError>
    {
        let mut y = BlockVector::new();
        for (row, col, map) in self.iter() {
            if let Some(xc) = x.get(col) {
                if xc.len() != map.n() {
                    return Err(SolverError::DimensionMismatch(
                        format!("block ({}, {}): {} vs {}", row, col, map.n(), xc.len())
                    ));
                }
                y.insert_or_add(row, map.apply(xc))?;
            }
        }
        Ok(y)
    }

    /// \\(A^T A\\), keyed by pairs of column keys.
    pub fn gram(&self) -> Result<BlockMatrix, SolverError>
    {
        let mut g = BlockMatrix::new();
        for r in self.blocks.values() {
            for (c1, m1) in r.iter() {
                let m1t = m1.transpose();
                for (c2, m2) in r.iter() {
                    g.insert_or_add(c1, c2, &m1t * m2)?;
                }
            }
        }
        Ok(g)
    }

    /// Returns `Some(alpha)` if the matrix is structurally \\(\alpha I\\).
    pub fn as_scalar(&self) -> Option<f64>
    {
        let mut alpha = None;
        for (row, col, map) in self.iter() {
            if row != col {
                return None;
            }
            let a = map.as_scalar()?;
            match alpha {
                None => alpha = Some(a),
                Some(prev) if prev == a => {},
                _ => return None,
            }
        }
        alpha
    }

    /// Induced 2-norm estimated by power iteration on \\(A^T A\\).
    pub fn norm_estimate(&self, iters: usize) -> Result<f64, SolverError>
    {
        let at = self.transpose();
        let mut x = BlockVector::new();
        for (i, (col, n)) in self.col_dims.iter().enumerate() {
            x.insert(col, (0.. *n).map(|j| 1. + ((i + j) % 7) as f64 * 0.1).collect());
        }

        let mut sigma2 = 0.;
        for _ in 0.. iters {
            let nx = x.norm();
            if nx == 0. {
                break;
            }
            let mut xn = BlockVector::new();
            xn.add_scaled(1. / nx, &x)?;
            let y = at.apply(&self.apply(&xn)?)?;

            sigma2 = 0.;
            for (k, v) in xn.iter() {
                if let Some(w) = y.get(k) {
                    sigma2 += La::dot(v, w);
                }
            }
            x = y;
        }
        Ok(sigma2.max(0.).sqrt())
    }

    pub fn debug_string(&self) -> String
    {
        let mut s = String::new();
        for (row, col, map) in self.iter() {
            s.push_str(&format!("({}, {}): {:?}\n", row, col, map));
        }
        s
    }
}

fn check_dim(dims: &BTreeMap<String, usize>, what: &str, key: &str, d: usize) -> Result<(), SolverError>
{
    match dims.get(key) {
        Some(prev) if *prev != d => Err(SolverError::DimensionMismatch(
            format!("{} {}: {} vs {}", what, key, prev, d)
        )),
        _ => Ok(()),
    }
}

impl fmt::Debug for BlockMatrix
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.write_str(&self.debug_string())
    }
}

//

#[test]
fn test_block_matrix_accumulate()
{
    let mut a = BlockMatrix::new();
    a.insert_or_add("0", "x", LinearMap::scalar(2, 1.)).unwrap();
    a.insert_or_add("0", "x", LinearMap::scalar(2, 2.)).unwrap();
    assert_eq!(a.get("0", "x"), Some(&LinearMap::scalar(2, 3.)));

    assert!(a.insert_or_add("0", "y", LinearMap::scalar(3, 1.)).is_err());
    a.insert_or_add("0", "y", LinearMap::diagonal(vec![1., -1.])).unwrap();

    let mut x = BlockVector::new();
    x.insert("x", vec![1., 2.]);
    x.insert("y", vec![1., 1.]);
    let y = a.apply(&x).unwrap();
    assert_eq!(y.get("0").unwrap(), &vec![4., 5.]);

    let at = a.transpose();
    assert_eq!(at.row_dim("y"), Some(2));
    assert!(at.get("x", "0").is_some());
}

#[test]
fn test_block_matrix_gram()
{
    let mut a = BlockMatrix::new();
    a.insert_or_add("0", "x", LinearMap::scalar(2, 2.)).unwrap();
    a.insert_or_add("1", "x", LinearMap::scalar(2, 1.)).unwrap();
    assert_eq!(a.gram().unwrap().as_scalar(), Some(5.));

    a.insert_or_add("1", "z", LinearMap::scalar(2, 1.)).unwrap();
    assert_eq!(a.gram().unwrap().as_scalar(), None);

    let n = a.norm_estimate(200).unwrap();
    // eigenvalues of [5 1; 1 1] are 3 +/- sqrt(5)
    assert!((n * n - (3. + 5f64.sqrt())).abs() < 1e-6);
}
