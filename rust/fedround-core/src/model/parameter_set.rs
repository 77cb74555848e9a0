//! Parameter sets.
//!
//! See the [model module] documentation since this is a private module anyways.
//!
//! [model module]: crate::model

use std::{
    iter::{FromIterator, IntoIterator},
    slice::{Iter, IterMut},
};

use derive_more::{From, Index, Into};
use serde::{Deserialize, Serialize};

use crate::model::tensor::{DataType, Tensor, TensorData};

#[derive(Debug, Clone, PartialEq, Default, From, Index, Into, Serialize, Deserialize)]
/// The trainable numeric state of a model: an ordered sequence of tensors.
///
/// The order is significant. All participants of a round must hold parameter sets of the same
/// [`architecture()`], which is checked before parameter sets are aggregated.
///
/// [`architecture()`]: ParameterSet::architecture
pub struct ParameterSet(Vec<Tensor>);

impl std::convert::AsRef<ParameterSet> for ParameterSet {
    fn as_ref(&self) -> &ParameterSet {
        self
    }
}

impl ParameterSet {
    /// Creates a parameter set from its tensors.
    pub fn new(tensors: Vec<Tensor>) -> Self {
        Self(tensors)
    }

    /// Gets the number of tensors.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Checks whether there are no tensors.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Gets the total number of elements over all tensors.
    pub fn element_count(&self) -> usize {
        self.0.iter().map(Tensor::len).sum()
    }

    /// Creates an iterator that yields references to the tensors.
    pub fn iter(&self) -> Iter<Tensor> {
        self.0.iter()
    }

    /// Creates an iterator that yields mutable references to the tensors.
    pub fn iter_mut(&mut self) -> IterMut<Tensor> {
        self.0.iter_mut()
    }

    /// Gets the ordered data types and shapes of the tensors.
    pub fn architecture(&self) -> Vec<(DataType, Vec<usize>)> {
        self.0
            .iter()
            .map(|tensor| (tensor.data_type(), tensor.shape().to_vec()))
            .collect()
    }

    /// Checks whether `other` has the same tensor count, data types and shapes, in the same
    /// order.
    pub fn is_compatible(&self, other: &ParameterSet) -> bool {
        self.len() == other.len()
            && self.iter().zip(other.iter()).all(|(a, b)| {
                a.data_type() == b.data_type() && a.shape() == b.shape()
            })
    }

    /// Finds the first `NaN` or infinite element, as a pair of tensor position and element
    /// index.
    pub fn find_non_finite(&self) -> Option<(usize, usize)> {
        self.0.iter().enumerate().find_map(|(position, tensor)| {
            let index = match tensor.data() {
                TensorData::F32(data) => data.iter().position(|value| !value.is_finite()),
                TensorData::F64(data) => data.iter().position(|value| !value.is_finite()),
            };
            index.map(|index| (position, index))
        })
    }
}

impl FromIterator<Tensor> for ParameterSet {
    fn from_iter<I: IntoIterator<Item = Tensor>>(iter: I) -> Self {
        ParameterSet(iter.into_iter().collect())
    }
}

impl IntoIterator for ParameterSet {
    type Item = Tensor;
    type IntoIter = std::vec::IntoIter<Self::Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a ParameterSet {
    type Item = &'a Tensor;
    type IntoIter = Iter<'a, Tensor>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> ParameterSet {
        vec![
            Tensor::from_f32(vec![2, 2], vec![1.0, 2.0, 3.0, 4.0]).unwrap(),
            Tensor::from_f64(vec![3], vec![0.5, 0.25, 0.125]).unwrap(),
        ]
        .into()
    }

    #[test]
    fn test_architecture() {
        assert_eq!(
            params().architecture(),
            vec![(DataType::F32, vec![2, 2]), (DataType::F64, vec![3])]
        );
        assert_eq!(params().element_count(), 7);
    }

    #[test]
    fn test_compatibility() {
        assert!(params().is_compatible(&params()));

        let reshaped: ParameterSet = vec![
            Tensor::from_f32(vec![4], vec![1.0, 2.0, 3.0, 4.0]).unwrap(),
            Tensor::from_f64(vec![3], vec![0.5, 0.25, 0.125]).unwrap(),
        ]
        .into();
        assert!(!params().is_compatible(&reshaped));

        let truncated: ParameterSet = params().into_iter().take(1).collect();
        assert!(!params().is_compatible(&truncated));
    }

    #[test]
    fn test_find_non_finite() {
        assert_eq!(params().find_non_finite(), None);

        let params: ParameterSet = vec![
            Tensor::from_f32(vec![2], vec![1.0, 2.0]).unwrap(),
            Tensor::from_f64(vec![3], vec![0.5, f64::NAN, f64::INFINITY]).unwrap(),
        ]
        .into();
        assert_eq!(params.find_non_finite(), Some((1, 1)));
    }
}
