//! Storage of solution variables

use std::collections::HashMap;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Key/value store of solution variable blocks.
///
/// The solver writes every variable through this trait when a solve finishes,
/// so the backing store may live outside the process.
/// A multi-writer backend must serialize [`ParameterService::update`] itself.
pub trait ParameterService
{
    /// Returns the stored value of `id`, or an empty vector if absent.
    fn fetch(&self, id: u64) -> Vec<f64>;

    /// Overwrites the stored value of `id`.
    fn update(&mut self, id: u64, value: &[f64]);
}

/// In-process [`ParameterService`] backed by a map.
#[derive(Debug, Clone, Default)]
pub struct LocalParameterService
{
    params: HashMap<u64, Vec<f64>>,
}

impl LocalParameterService
{
    pub fn new() -> Self
    {
        LocalParameterService::default()
    }

    pub fn len(&self) -> usize
    {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.params.is_empty()
    }

    pub fn contains(&self, id: u64) -> bool
    {
        self.params.contains_key(&id)
    }
}

impl ParameterService for LocalParameterService
{
    fn fetch(&self, id: u64) -> Vec<f64>
    {
        self.params.get(&id).cloned().unwrap_or_default()
    }

    fn update(&mut self, id: u64, value: &[f64])
    {
        log::trace!("update {:016x}: {:?}", id, value);
        self.params.insert(id, value.to_vec());
    }
}

impl<P: ParameterService + ?Sized> ParameterService for &mut P
{
    fn fetch(&self, id: u64) -> Vec<f64>
    {
        (**self).fetch(id)
    }

    fn update(&mut self, id: u64, value: &[f64])
    {
        (**self).update(id, value)
    }
}

/// Parameter id of a variable of a problem.
///
/// 64-bit FNV-1a over the UTF-8 bytes of `problem_id`, a `0xff` separator and `variable_id`,
/// so the same pair gives the same id in any process.
pub fn variable_parameter_id(problem_id: &str, variable_id: &str) -> u64
{
    let bytes = problem_id.bytes()
        .chain(core::iter::once(0xff))
        .chain(variable_id.bytes());

    bytes.fold(FNV_OFFSET_BASIS, |h, b| (h ^ b as u64).wrapping_mul(FNV_PRIME))
}

//

#[test]
fn test_local_parameter_service()
{
    let mut s = LocalParameterService::new();
    let id = variable_parameter_id("p", "x");
    assert_eq!(id, variable_parameter_id("p", "x"));
    assert_ne!(id, variable_parameter_id("p", "y"));
    assert_ne!(id, variable_parameter_id("q", "x"));
    assert_ne!(variable_parameter_id("ab", "c"), variable_parameter_id("a", "bc"));

    assert!(s.fetch(id).is_empty());
    s.update(id, &[1., 2.]);
    s.update(id, &[3., 4.]);
    assert_eq!(s.fetch(id), vec![3., 4.]);
    assert_eq!(s.len(), 1);

    fn write<S: ParameterService>(mut s: S)
    {
        s.update(7, &[5.]);
    }
    write(&mut s);
    assert!(s.contains(7));
}

#[test]
fn test_variable_parameter_id_fixed()
{
    assert_eq!(variable_parameter_id("p", "x"), 0x7984_6019_57ee_60d8);
    assert_eq!(variable_parameter_id("", ""), 0xaf64_724c_8602_eb6e);
}
