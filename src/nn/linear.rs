use ndarray::{Array1, Array2, ShapeError};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::tensor::Tensor;

/// Activation applied to the output of a dense layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    Linear,
    Relu,
    Softmax,
}

impl Activation {
    pub fn apply(self, x: Tensor) -> Tensor {
        match self {
            Activation::Linear => x,
            Activation::Relu => x.relu(),
            Activation::Softmax => x.softmax(),
        }
    }
}

/// Fully connected layer computing `activation(x @ weight + bias)` for a `[batch, in]` input.
#[derive(Debug, Clone)]
pub struct LinearLayer {
    weight: Tensor,
    bias: Tensor,
    activation: Activation,
}

impl LinearLayer {
    /// Glorot-uniform weights and zero bias.
    pub fn new<R: Rng + ?Sized>(
        units_in: usize,
        units_out: usize,
        activation: Activation,
        rng: &mut R,
    ) -> LinearLayer {
        LinearLayer {
            weight: Tensor::glorot_uniform(units_in, units_out, rng),
            bias: Tensor::zeros(&[units_out]),
            activation,
        }
    }

    /// Rebuilds a layer from row-major `[units_in, units_out]` weights and a bias vector.
    pub fn from_parts(
        units_in: usize,
        units_out: usize,
        weight: Vec<f32>,
        bias: Vec<f32>,
        activation: Activation,
    ) -> Result<LinearLayer, ShapeError> {
        let weight = Array2::from_shape_vec((units_in, units_out), weight)?;
        let bias = Array1::from_shape_vec(units_out, bias)?;
        Ok(LinearLayer {
            weight: Tensor::new(weight.into_dyn()),
            bias: Tensor::new(bias.into_dyn()),
            activation,
        })
    }

    pub fn forward(&self, x: &Tensor) -> Tensor {
        let batch = x.shape()[0];
        let z = x.matmul(&self.weight) + self.bias.broadcast_to(&[batch, self.units_out()]);
        self.activation.apply(z)
    }

    pub fn parameters(&self) -> Vec<Tensor> {
        vec![self.weight.clone(), self.bias.clone()]
    }

    pub fn units_in(&self) -> usize {
        self.weight.shape()[0]
    }

    pub fn units_out(&self) -> usize {
        self.weight.shape()[1]
    }

    pub fn activation(&self) -> Activation {
        self.activation
    }

    pub fn weight_values(&self) -> Vec<f32> {
        self.weight.data().iter().copied().collect()
    }

    pub fn bias_values(&self) -> Vec<f32> {
        self.bias.data().iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn forward_applies_weight_bias_and_relu() {
        let layer = LinearLayer::from_parts(
            2,
            2,
            vec![1.0, -1.0, 2.0, 1.0],
            vec![0.5, -10.0],
            Activation::Relu,
        )
        .unwrap();
        let x = Tensor::new(array![[1.0, 1.0], [2.0, 0.0]].into_dyn());
        let y = layer.forward(&x);
        assert_eq!(y.data(), array![[3.5, 0.0], [2.5, 0.0]].into_dyn());
    }

    #[test]
    fn new_layer_has_zero_bias_and_expected_shape() {
        let mut rng = StdRng::seed_from_u64(1);
        let layer = LinearLayer::new(4, 128, Activation::Relu, &mut rng);
        assert_eq!(layer.units_in(), 4);
        assert_eq!(layer.units_out(), 128);
        assert!(layer.bias_values().iter().all(|b| *b == 0.0));
        assert_eq!(layer.weight_values().len(), 4 * 128);
    }

    #[test]
    fn backward_reaches_weight_and_bias() {
        let mut rng = StdRng::seed_from_u64(3);
        let layer = LinearLayer::new(3, 2, Activation::Linear, &mut rng);
        let x = Tensor::new(array![[1.0, 2.0, 3.0], [0.0, 1.0, 0.0]].into_dyn());
        layer.forward(&x).sum().backward();

        let params = layer.parameters();
        assert_eq!(
            params[0].grad(),
            Some(array![[1.0, 1.0], [3.0, 3.0], [3.0, 3.0]].into_dyn())
        );
        assert_eq!(params[1].grad(), Some(array![2.0, 2.0].into_dyn()));
    }

    #[test]
    fn from_parts_rejects_wrong_length() {
        let result = LinearLayer::from_parts(2, 2, vec![1.0; 3], vec![0.0; 2], Activation::Linear);
        assert!(result.is_err());
    }
}
