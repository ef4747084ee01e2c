use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use ndarray::{Array2, ArrayD, IxDyn};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::Rng;

/// A node in the computation graph that knows how to push gradients back to its inputs.
pub trait Operation: fmt::Debug {
    fn backward(&self, output: &Tensor);
    fn zero_graph(&self);
    fn build_graph(&self);
}

#[derive(Debug, Clone)]
pub struct DataContainer {
    pub(crate) array: ArrayD<f32>,
    pub(crate) grad: Option<ArrayD<f32>>,
    pub(crate) num_consumers: usize,
}

/// Shared, dynamically shaped `f32` tensor with reverse-mode autodiff.
///
/// Cloning a tensor is cheap and yields a handle to the same data, so model
/// parameters can be held by both a layer and an optimizer.
#[derive(Clone)]
pub struct Tensor {
    pub(crate) container: Rc<RefCell<DataContainer>>,
    prev_op: Option<Rc<dyn Operation>>,
}

impl fmt::Debug for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let container = self.container.borrow();
        f.debug_struct("Tensor")
            .field("shape", &container.array.shape())
            .field("data", &container.array)
            .field("grad", &container.grad)
            .finish()
    }
}

impl Tensor {
    pub fn new(data: ArrayD<f32>) -> Tensor {
        let data = DataContainer {
            array: data,
            grad: None,
            num_consumers: 0,
        };
        Tensor {
            container: Rc::new(RefCell::new(data)),
            prev_op: None,
        }
    }

    pub fn new_with_prev(data: ArrayD<f32>, prev_op: Rc<dyn Operation>) -> Tensor {
        let data = DataContainer {
            array: data,
            grad: None,
            num_consumers: 0,
        };
        Tensor {
            container: Rc::new(RefCell::new(data)),
            prev_op: Some(prev_op),
        }
    }

    pub fn zeros(shape: &[usize]) -> Tensor {
        Tensor::new(ArrayD::zeros(IxDyn(shape)))
    }

    /// Glorot (Xavier) uniform initialization for a `[fan_in, fan_out]` weight matrix.
    pub fn glorot_uniform<R: Rng + ?Sized>(fan_in: usize, fan_out: usize, rng: &mut R) -> Tensor {
        let limit = (6.0 / (fan_in + fan_out) as f32).sqrt();
        let weight: Array2<f32> =
            Array2::random_using((fan_in, fan_out), Uniform::new(-limit, limit), rng);
        Tensor::new(weight.into_dyn())
    }

    /// Runs backpropagation from this tensor, seeding its gradient with ones.
    pub fn backward(&self) {
        // Reset counts left over from a graph that was built but never fully walked.
        self.zero_graph();
        self.build_graph();

        let start_grad = ArrayD::ones(self.container.borrow().array.raw_dim());
        self.backward_internal(start_grad);
    }

    pub(crate) fn backward_internal(&self, grad: ArrayD<f32>) {
        {
            let mut container = self.container.borrow_mut();
            debug_assert_eq!(container.array.shape(), grad.shape());
            let new_grad = match container.grad.take() {
                Some(existing) => existing + &grad,
                None => grad,
            };
            container.grad = Some(new_grad);

            container.num_consumers = container.num_consumers.saturating_sub(1);
            if container.num_consumers > 0 {
                return;
            }
        }
        if let Some(op) = &self.prev_op {
            op.backward(self);
        }
    }

    pub(crate) fn zero_graph(&self) {
        self.container.borrow_mut().num_consumers = 0;
        if let Some(op) = &self.prev_op {
            op.zero_graph();
        }
    }

    pub(crate) fn build_graph(&self) {
        let consumers = {
            let mut container = self.container.borrow_mut();
            container.num_consumers += 1;
            container.num_consumers
        };
        if consumers > 1 {
            return;
        }
        if let Some(op) = &self.prev_op {
            op.build_graph();
        }
    }

    pub fn grad(&self) -> Option<ArrayD<f32>> {
        self.container.borrow().grad.clone()
    }

    pub fn zero_grad(&self) {
        self.container.borrow_mut().grad = None;
    }

    pub fn data(&self) -> ArrayD<f32> {
        self.container.borrow().array.clone()
    }

    pub fn update_data(&self, data: ArrayD<f32>) {
        self.container.borrow_mut().array = data;
    }

    pub fn add_value(&self, value: &ArrayD<f32>) {
        let mut container = self.container.borrow_mut();
        container.array += value;
    }

    pub fn shape(&self) -> Vec<usize> {
        self.container.borrow().array.shape().to_vec()
    }

    pub fn len(&self) -> usize {
        self.container.borrow().array.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sum of all elements, convenient for reading back scalar losses.
    pub fn item(&self) -> f32 {
        self.container.borrow().array.sum()
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn shared_graph_accumulates_gradients() {
        let test_0 = Tensor::new(array![[1.0, 2.0, 3.0, 4.0]].into_dyn());
        let test_1 = test_0.clone() + test_0.clone();
        let test_2 = test_1.clone() * test_1.clone();
        test_2.backward();

        assert_eq!(
            test_0.grad(),
            Some(array![[8.0, 16.0, 24.0, 32.0]].into_dyn())
        );
        assert_eq!(
            test_1.grad(),
            Some(array![[4.0, 8.0, 12.0, 16.0]].into_dyn())
        );
        assert_eq!(test_2.grad(), Some(array![[1.0, 1.0, 1.0, 1.0]].into_dyn()));
    }

    #[test]
    fn repeated_backward_on_fresh_graphs_accumulates_into_leaves() {
        let leaf = Tensor::new(array![2.0, 3.0].into_dyn());
        (leaf.clone() * leaf.clone()).sum().backward();
        (leaf.clone() * leaf.clone()).sum().backward();
        assert_eq!(leaf.grad(), Some(array![8.0, 12.0].into_dyn()));

        leaf.zero_grad();
        assert!(leaf.grad().is_none());
    }

    #[test]
    fn glorot_uniform_stays_within_limit() {
        let mut rng = StdRng::seed_from_u64(7);
        let weight = Tensor::glorot_uniform(4, 128, &mut rng);
        let limit = (6.0f32 / 132.0).sqrt();
        assert_eq!(weight.shape(), vec![4, 128]);
        assert!(weight.data().iter().all(|w| w.abs() <= limit));
    }

    #[test]
    fn add_value_updates_in_place() {
        let tensor = Tensor::new(array![1.0, 1.0].into_dyn());
        let alias = tensor.clone();
        tensor.add_value(&array![0.5, -1.0].into_dyn());
        assert_eq!(alias.data(), array![1.5, 0.0].into_dyn());
    }
}
