//! Constant data resolution

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use crate::densemat::DenseMatrix;
use crate::expression::{Constant, ConstantValue};
use crate::linear::{sparse, SparseMatrix};
use crate::solver_error::SolverError;

/// Constant data loaded for a key.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstantData
{
    Dense(DenseMatrix),
    Sparse(SparseMatrix),
}

impl ConstantData
{
    pub fn size(&self) -> (usize, usize)
    {
        match self {
            ConstantData::Dense(d) => d.size(),
            ConstantData::Sparse(s) => (s.rows(), s.cols()),
        }
    }

    pub fn to_dense(&self) -> DenseMatrix
    {
        match self {
            ConstantData::Dense(d) => d.clone(),
            ConstantData::Sparse(s) => sparse::to_dense(s),
        }
    }

    pub fn to_sparse(&self) -> SparseMatrix
    {
        match self {
            ConstantData::Dense(d) => sparse::from_dense(d),
            ConstantData::Sparse(s) => s.clone(),
        }
    }
}

/// Data-loading collaborator.
pub trait DataProvider
{
    /// Returns the data of `key`, or `None` if it cannot be resolved.
    fn get(&self, key: &str) -> Option<ConstantData>;
}

/// In-memory [`DataProvider`].
#[derive(Debug, Clone, Default)]
pub struct DataMap
{
    data: HashMap<String, ConstantData>,
}

impl DataMap
{
    pub fn new() -> Self
    {
        DataMap::default()
    }

    pub fn insert(&mut self, key: &str, data: ConstantData)
    {
        self.data.insert(key.to_string(), data);
    }

    pub fn insert_dense(&mut self, key: &str, mat: DenseMatrix)
    {
        self.insert(key, ConstantData::Dense(mat));
    }

    pub fn insert_sparse(&mut self, key: &str, mat: SparseMatrix)
    {
        self.insert(key, ConstantData::Sparse(mat));
    }

    /// Builder pattern of [`DataMap::insert_dense`].
    pub fn dense(mut self, key: &str, mat: DenseMatrix) -> Self
    {
        self.insert_dense(key, mat);
        self
    }
}

impl DataProvider for DataMap
{
    fn get(&self, key: &str) -> Option<ConstantData>
    {
        self.data.get(key).cloned()
    }
}

/// Resolves every key at most once for the lifetime of the cache.
pub struct DataCache<'a>
{
    provider: &'a dyn DataProvider,
    cache: RefCell<HashMap<String, Rc<ConstantData>>>,
}

impl<'a> DataCache<'a>
{
    pub fn new(provider: &'a dyn DataProvider) -> Self
    {
        DataCache {
            provider,
            cache: RefCell::new(HashMap::new()),
        }
    }

    pub fn get(&self, key: &str) -> Result<Rc<ConstantData>, SolverError>
    {
        if let Some(d) = self.cache.borrow().get(key) {
            return Ok(d.clone());
        }

        log::trace!("loading data {}", key);
        let d = Rc::new(self.provider.get(key).ok_or_else(|| SolverError::MissingData(key.to_string()))?);
        self.cache.borrow_mut().insert(key.to_string(), d.clone());
        Ok(d)
    }

    /// Number of keys resolved so far.
    pub fn len(&self) -> usize
    {
        self.cache.borrow().len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.len() == 0
    }

    /// Loads data of `key`, checking it is `m` by `n`.
    pub fn get_sized(&self, key: &str, m: usize, n: usize) -> Result<Rc<ConstantData>, SolverError>
    {
        let d = self.get(key)?;
        if d.size() != (m, n) {
            return Err(SolverError::DimensionMismatch(
                format!("data {}: {:?} vs {:?}", key, d.size(), (m, n))
            ));
        }
        Ok(d)
    }

    /// Dense matrix of a constant; a scalar fills the whole matrix.
    pub fn dense(&self, c: &Constant) -> Result<DenseMatrix, SolverError>
    {
        match &c.value {
            ConstantValue::Scalar(v) => Ok(DenseMatrix::new(c.m, c.n).by_fn(|_, _| *v)),
            ConstantValue::Data(key) => Ok(self.get_sized(key, c.m, c.n)?.to_dense()),
        }
    }

    /// Sparse matrix of a constant.
    pub fn sparse(&self, c: &Constant) -> Result<SparseMatrix, SolverError>
    {
        match &c.value {
            ConstantValue::Scalar(_) => Ok(sparse::from_dense(&self.dense(c)?)),
            ConstantValue::Data(key) => Ok(self.get_sized(key, c.m, c.n)?.to_sparse()),
        }
    }
}

//

#[test]
fn test_data_cache()
{
    struct Counting
    {
        count: std::cell::Cell<usize>,
    }

    impl DataProvider for Counting
    {
        fn get(&self, key: &str) -> Option<ConstantData>
        {
            self.count.set(self.count.get() + 1);
            if key == "a" {
                Some(ConstantData::Dense(DenseMatrix::from_vec(vec![1., 2.])))
            }
            else {
                None
            }
        }
    }

    let p = Counting {count: std::cell::Cell::new(0)};
    let cache = DataCache::new(&p);

    let c = Constant {m: 2, n: 1, value: ConstantValue::Data("a".to_string())};
    assert_eq!(cache.dense(&c).unwrap().as_slice(), &[1., 2.]);
    assert_eq!(cache.dense(&c).unwrap().as_slice(), &[1., 2.]);
    assert_eq!(p.count.get(), 1);

    let bad = Constant {m: 1, n: 2, value: ConstantValue::Data("a".to_string())};
    assert!(matches!(cache.dense(&bad), Err(SolverError::DimensionMismatch(_))));

    let missing = Constant {m: 1, n: 1, value: ConstantValue::Data("b".to_string())};
    assert!(matches!(cache.dense(&missing), Err(SolverError::MissingData(_))));

    let s = Constant {m: 2, n: 2, value: ConstantValue::Scalar(3.)};
    assert_eq!(cache.dense(&s).unwrap().as_slice(), &[3.; 4]);
}
