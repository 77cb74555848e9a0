//! Parameter-wise mean aggregation.
//!
//! See the [model module] documentation since this is a private module anyways.
//!
//! [model module]: crate::model

use num::{
    bigint::BigInt,
    rational::Ratio,
    traits::ToPrimitive,
};
use thiserror::Error;
use tracing::trace;

use crate::model::{
    parameter_set::ParameterSet,
    tensor::{DataType, Tensor, TensorData},
};

/// The minimum number of distinct updates required to aggregate a round.
pub const MIN_QUORUM: usize = 2;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
/// Errors related to the aggregation of parameter sets.
pub enum AggregationError {
    #[error("insufficient participants: need {needed}, got {actual}")]
    /// Fewer parameter sets than the quorum requires.
    InsufficientParticipants { needed: usize, actual: usize },

    #[error("parameter set is incompatible with the aggregated architecture: {0}")]
    /// The tensor count, a data type or a shape differs from the aggregated ones.
    ShapeMismatch(String),

    #[error("tensor {tensor} holds a non-finite value at index {index}")]
    /// A value is `NaN` or infinite and has no mean.
    NonFiniteValue { tensor: usize, index: usize },

    #[error("the mean of tensor {tensor} at index {index} is not representable")]
    /// The mean could not be converted back into the data type of the tensor.
    Unrepresentable { tensor: usize, index: usize },
}

#[derive(Debug, Clone)]
struct AggregatedTensor {
    data_type: DataType,
    shape: Vec<usize>,
    sums: Vec<Ratio<BigInt>>,
}

#[derive(Debug, Clone, Default)]
/// An aggregator that computes the element-wise mean of parameter sets.
///
/// Every value is converted into an exact rational number and summed without rounding, so the
/// mean is only rounded once, when it is converted back into the data type of its tensor. The
/// result doesn't depend on the order in which parameter sets are aggregated.
pub struct Aggregation {
    nb_models: usize,
    tensors: Vec<AggregatedTensor>,
}

#[allow(clippy::len_without_is_empty)]
impl Aggregation {
    /// Creates a new, empty aggregator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets the number of aggregated parameter sets.
    pub fn len(&self) -> usize {
        self.nb_models
    }

    /// Validates if aggregation of the aggregated parameter sets with the given `params` may be
    /// safely performed.
    ///
    /// The first parameter set fixes the architecture, every further one must match it tensor
    /// by tensor.
    ///
    /// # Errors
    /// Fails with [`AggregationError::ShapeMismatch`] if the tensor count, a data type or a
    /// shape differs.
    pub fn validate_aggregation(&self, params: &ParameterSet) -> Result<(), AggregationError> {
        if self.nb_models == 0 {
            return Ok(());
        }
        if self.tensors.len() != params.len() {
            return Err(AggregationError::ShapeMismatch(format!(
                "expected {} tensors, got {}",
                self.tensors.len(),
                params.len()
            )));
        }
        for (position, (aggregated, tensor)) in self.tensors.iter().zip(params.iter()).enumerate() {
            if aggregated.data_type != tensor.data_type() {
                return Err(AggregationError::ShapeMismatch(format!(
                    "tensor {} has data type {}, expected {}",
                    position,
                    tensor.data_type(),
                    aggregated.data_type
                )));
            }
            if aggregated.shape != tensor.shape() {
                return Err(AggregationError::ShapeMismatch(format!(
                    "tensor {} has shape {:?}, expected {:?}",
                    position,
                    tensor.shape(),
                    aggregated.shape
                )));
            }
        }
        Ok(())
    }

    /// Aggregates `params` into the running sum.
    ///
    /// Nothing is aggregated if this fails.
    ///
    /// # Errors
    /// Fails if [`validate_aggregation()`] fails or if `params` holds a non-finite value.
    ///
    /// [`validate_aggregation()`]: Aggregation::validate_aggregation
    pub fn aggregate(&mut self, params: &ParameterSet) -> Result<(), AggregationError> {
        self.validate_aggregation(params)?;
        let exact = params
            .iter()
            .enumerate()
            .map(|(position, tensor)| to_ratios(position, tensor))
            .collect::<Result<Vec<_>, _>>()?;

        if self.nb_models == 0 {
            self.tensors = params
                .iter()
                .zip(exact)
                .map(|(tensor, sums)| AggregatedTensor {
                    data_type: tensor.data_type(),
                    shape: tensor.shape().to_vec(),
                    sums,
                })
                .collect();
        } else {
            for (aggregated, values) in self.tensors.iter_mut().zip(exact) {
                for (sum, value) in aggregated.sums.iter_mut().zip(values) {
                    *sum += value;
                }
            }
        }
        self.nb_models += 1;
        trace!(nb_models = self.nb_models, "aggregated parameter set");
        Ok(())
    }

    /// Computes the element-wise mean of the aggregated parameter sets.
    ///
    /// # Errors
    /// Fails with [`AggregationError::InsufficientParticipants`] if nothing was aggregated.
    pub fn mean(&self) -> Result<ParameterSet, AggregationError> {
        if self.nb_models == 0 {
            return Err(AggregationError::InsufficientParticipants {
                needed: 1,
                actual: 0,
            });
        }
        let nb_models = BigInt::from(self.nb_models);
        self.tensors
            .iter()
            .enumerate()
            .map(|(position, aggregated)| {
                let means = aggregated
                    .sums
                    .iter()
                    .map(|sum| sum / &nb_models)
                    .enumerate()
                    .map(|(index, mean)| {
                        ratio_to_f64(&mean).ok_or(AggregationError::Unrepresentable {
                            tensor: position,
                            index,
                        })
                    });
                let data = match aggregated.data_type {
                    DataType::F32 => TensorData::F32(
                        means
                            .map(|mean| mean.map(|mean| mean as f32))
                            .collect::<Result<_, _>>()?,
                    ),
                    DataType::F64 => TensorData::F64(means.collect::<Result<_, _>>()?),
                };
                Tensor::new(aggregated.shape.clone(), data)
                    .map_err(|err| AggregationError::ShapeMismatch(err.to_string()))
            })
            .collect()
    }
}

/// Computes the element-wise mean of at least `quorum` parameter sets.
///
/// # Errors
/// Fails with [`AggregationError::InsufficientParticipants`] if there are fewer than `quorum`
/// parameter sets, and otherwise as [`Aggregation::aggregate()`] does.
pub fn mean<'a, I>(params: I, quorum: usize) -> Result<ParameterSet, AggregationError>
where
    I: IntoIterator<Item = &'a ParameterSet>,
{
    let params: Vec<&ParameterSet> = params.into_iter().collect();
    if params.len() < quorum {
        return Err(AggregationError::InsufficientParticipants {
            needed: quorum,
            actual: params.len(),
        });
    }
    let mut aggregation = Aggregation::new();
    for params in params {
        aggregation.aggregate(params)?;
    }
    aggregation.mean()
}

fn to_ratios(position: usize, tensor: &Tensor) -> Result<Vec<Ratio<BigInt>>, AggregationError> {
    let non_finite = |index| AggregationError::NonFiniteValue {
        tensor: position,
        index,
    };
    match tensor.data() {
        TensorData::F32(data) => data
            .iter()
            .enumerate()
            .map(|(index, value)| Ratio::from_float(*value).ok_or_else(|| non_finite(index)))
            .collect(),
        TensorData::F64(data) => data
            .iter()
            .enumerate()
            .map(|(index, value)| Ratio::from_float(*value).ok_or_else(|| non_finite(index)))
            .collect(),
    }
}

/// Converts an exact rational number into the nearest `f64`.
///
/// Returns `None` if the value lies outside the range of `f64`.
pub(crate) fn ratio_to_f64(ratio: &Ratio<BigInt>) -> Option<f64> {
    ratio.to_f64().filter(|float| float.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(shape: Vec<usize>, data: Vec<f32>) -> ParameterSet {
        ParameterSet::new(vec![Tensor::from_f32(shape, data).unwrap()])
    }

    #[test]
    fn test_mean_of_two() {
        let a = single(vec![2, 2], vec![1.0, 2.0, 3.0, 4.0]);
        let b = single(vec![2, 2], vec![3.0, 4.0, 5.0, 6.0]);
        let expected = single(vec![2, 2], vec![2.0, 3.0, 4.0, 5.0]);
        assert_eq!(mean(vec![&a, &b], MIN_QUORUM).unwrap(), expected);
    }

    #[test]
    fn test_mean_is_order_independent() {
        let a = ParameterSet::new(vec![Tensor::from_f64(vec![3], vec![0.1, 1e16, -3.0]).unwrap()]);
        let b = ParameterSet::new(vec![Tensor::from_f64(vec![3], vec![0.2, 1.0, 7.0]).unwrap()]);
        let c = ParameterSet::new(vec![Tensor::from_f64(vec![3], vec![0.3, -1e16, 2.0]).unwrap()]);
        let forward = mean(vec![&a, &b, &c], MIN_QUORUM).unwrap();
        let backward = mean(vec![&c, &b, &a], MIN_QUORUM).unwrap();
        assert_eq!(forward, backward);
        // a naive left-to-right float sum would lose the `1.0` next to `1e16`
        assert_eq!(forward[0].as_f64().unwrap()[1], 1.0 / 3.0);
        assert_eq!(forward[0].as_f64().unwrap()[2], 2.0);
    }

    #[test]
    fn test_mean_keeps_data_types() {
        let a = ParameterSet::new(vec![
            Tensor::from_f32(vec![1], vec![1.0]).unwrap(),
            Tensor::from_f64(vec![], vec![2.0]).unwrap(),
        ]);
        let b = ParameterSet::new(vec![
            Tensor::from_f32(vec![1], vec![2.0]).unwrap(),
            Tensor::from_f64(vec![], vec![3.0]).unwrap(),
        ]);
        let result = mean(vec![&a, &b], MIN_QUORUM).unwrap();
        assert_eq!(result.architecture(), a.architecture());
        assert_eq!(result[0].as_f32().unwrap(), &[1.5]);
        assert_eq!(result[1].as_f64().unwrap(), &[2.5]);
    }

    #[test]
    fn test_insufficient_participants() {
        let a = single(vec![1], vec![1.0]);
        assert_eq!(
            mean(Vec::<&ParameterSet>::new(), MIN_QUORUM).unwrap_err(),
            AggregationError::InsufficientParticipants {
                needed: 2,
                actual: 0
            }
        );
        assert_eq!(
            mean(vec![&a], MIN_QUORUM).unwrap_err(),
            AggregationError::InsufficientParticipants {
                needed: 2,
                actual: 1
            }
        );
        assert!(Aggregation::new().mean().is_err());
    }

    #[test]
    fn test_shape_mismatch() {
        let mut aggregation = Aggregation::new();
        aggregation
            .aggregate(&single(vec![2, 2], vec![1.0, 2.0, 3.0, 4.0]))
            .unwrap();

        let reshaped = single(vec![4], vec![1.0, 2.0, 3.0, 4.0]);
        assert!(matches!(
            aggregation.aggregate(&reshaped),
            Err(AggregationError::ShapeMismatch(_))
        ));

        let widened = ParameterSet::new(vec![Tensor::from_f64(vec![2, 2], vec![0.0; 4]).unwrap()]);
        assert!(matches!(
            aggregation.aggregate(&widened),
            Err(AggregationError::ShapeMismatch(_))
        ));

        let empty = ParameterSet::default();
        assert!(matches!(
            aggregation.aggregate(&empty),
            Err(AggregationError::ShapeMismatch(_))
        ));
        assert_eq!(aggregation.len(), 1);
    }

    #[test]
    fn test_non_finite_values_are_rejected_atomically() {
        let mut aggregation = Aggregation::new();
        let a = single(vec![2], vec![1.0, 1.0]);
        aggregation.aggregate(&a).unwrap();
        assert_eq!(
            aggregation.aggregate(&single(vec![2], vec![5.0, f32::NAN])),
            Err(AggregationError::NonFiniteValue {
                tensor: 0,
                index: 1
            })
        );
        assert_eq!(aggregation.len(), 1);
        assert_eq!(aggregation.mean().unwrap(), a);
    }

    #[test]
    fn test_ratio_to_f64() {
        let ratio = Ratio::from_float(0.1_f64).unwrap();
        assert_eq!(ratio_to_f64(&ratio), Some(0.1));

        let max = Ratio::from_float(f64::MAX).unwrap();
        assert_eq!(ratio_to_f64(&(&max * BigInt::from(2) / BigInt::from(2))), Some(f64::MAX));
        assert_eq!(ratio_to_f64(&(&max * BigInt::from(4))), None);

        let tiny = Ratio::from_float(f64::MIN_POSITIVE).unwrap();
        assert_eq!(ratio_to_f64(&tiny), Some(f64::MIN_POSITIVE));

        let subnormal = Ratio::from_float(5e-324_f64).unwrap();
        assert_eq!(ratio_to_f64(&subnormal), Some(5e-324));
        assert_eq!(ratio_to_f64(&Ratio::from_integer(BigInt::from(0))), Some(0.0));
    }

    #[test]
    fn test_mean_of_tiny_values() {
        for value in &[1e-300, 3e-305, 1e-310, 5e-324] {
            let params = ParameterSet::new(vec![Tensor::from_f64(vec![1], vec![*value]).unwrap()]);
            let global = mean(vec![&params, &params], MIN_QUORUM).unwrap();
            assert_eq!(global[0].as_f64().unwrap(), &[*value], "mean of {:e}", value);
        }

        // 5e-324 is the smallest subnormal, the mean of it and zero rounds to even
        let zero = ParameterSet::new(vec![Tensor::from_f64(vec![1], vec![0.0]).unwrap()]);
        let tiny = ParameterSet::new(vec![Tensor::from_f64(vec![1], vec![1e-323]).unwrap()]);
        let global = mean(vec![&zero, &tiny], MIN_QUORUM).unwrap();
        assert_eq!(global[0].as_f64().unwrap(), &[5e-324]);
    }
}
