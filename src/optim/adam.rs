use ndarray::{ArrayD, ErrorKind, IxDyn, ShapeError};
use serde::{Deserialize, Serialize};

use crate::{optim::optimizer::Optimizer, tensor::Tensor};

pub const DEFAULT_BETA1: f32 = 0.9;
pub const DEFAULT_BETA2: f32 = 0.999;
pub const DEFAULT_EPSILON: f32 = 1e-7;

/// Serializable snapshot of the optimizer: hyperparameters, step counter and moment estimates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdamState {
    pub learning_rate: f32,
    pub beta1: f32,
    pub beta2: f32,
    pub epsilon: f32,
    pub step: u32,
    pub first_moments: Vec<Vec<f32>>,
    pub second_moments: Vec<Vec<f32>>,
}

pub struct AdamOptimizer {
    lr: f32,
    beta1: f32,
    beta2: f32,
    epsilon: f32,
    parameters: Vec<Tensor>,
    m: Vec<ArrayD<f32>>, // First moment vector
    v: Vec<ArrayD<f32>>, // Second moment vector
    t: u32,              // Time step
}

impl AdamOptimizer {
    pub fn new(
        lr: f32,
        beta1: f32,
        beta2: f32,
        epsilon: f32,
        parameters: Vec<Tensor>,
    ) -> AdamOptimizer {
        let m = parameters
            .iter()
            .map(|p| ArrayD::zeros(p.shape()))
            .collect();
        let v = parameters
            .iter()
            .map(|p| ArrayD::zeros(p.shape()))
            .collect();
        AdamOptimizer {
            lr,
            beta1,
            beta2,
            epsilon,
            parameters,
            m,
            v,
            t: 0,
        }
    }

    pub fn new_with_defaults(lr: f32, parameters: Vec<Tensor>) -> AdamOptimizer {
        AdamOptimizer::new(lr, DEFAULT_BETA1, DEFAULT_BETA2, DEFAULT_EPSILON, parameters)
    }

    /// Restores an optimizer for `parameters` from a saved state.
    ///
    /// Moment vectors are reshaped to the parameter shapes; a length mismatch is an error.
    pub fn from_state(state: &AdamState, parameters: Vec<Tensor>) -> Result<AdamOptimizer, ShapeError> {
        let reshape = |moments: &[Vec<f32>]| -> Result<Vec<ArrayD<f32>>, ShapeError> {
            if moments.len() != parameters.len() {
                return Err(ShapeError::from_kind(ErrorKind::IncompatibleShape));
            }
            parameters
                .iter()
                .zip(moments)
                .map(|(p, values)| ArrayD::from_shape_vec(IxDyn(&p.shape()), values.clone()))
                .collect()
        };
        let m = reshape(&state.first_moments)?;
        let v = reshape(&state.second_moments)?;
        Ok(AdamOptimizer {
            lr: state.learning_rate,
            beta1: state.beta1,
            beta2: state.beta2,
            epsilon: state.epsilon,
            parameters,
            m,
            v,
            t: state.step,
        })
    }

    pub fn state(&self) -> AdamState {
        let flatten = |moments: &[ArrayD<f32>]| -> Vec<Vec<f32>> {
            moments
                .iter()
                .map(|array| array.iter().copied().collect())
                .collect()
        };
        AdamState {
            learning_rate: self.lr,
            beta1: self.beta1,
            beta2: self.beta2,
            epsilon: self.epsilon,
            step: self.t,
            first_moments: flatten(&self.m),
            second_moments: flatten(&self.v),
        }
    }

    pub fn steps(&self) -> u32 {
        self.t
    }
}

impl Optimizer for AdamOptimizer {
    fn step(&mut self) {
        self.t += 1;
        let bias_correction1 = 1.0 - self.beta1.powi(self.t as i32);
        let bias_correction2 = 1.0 - self.beta2.powi(self.t as i32);
        for (idx, param) in self.parameters.iter().enumerate() {
            // Parameters outside the current graph have no gradient to apply.
            let Some(grad) = param.grad() else {
                continue;
            };
            self.m[idx] = &self.m[idx] * self.beta1 + &grad * (1.0 - self.beta1);
            self.v[idx] = &self.v[idx] * self.beta2 + grad.mapv(|g| g * g) * (1.0 - self.beta2);

            let m_hat = &self.m[idx] / bias_correction1;
            let v_hat = &self.v[idx] / bias_correction2;

            let update = m_hat / (v_hat.mapv(f32::sqrt) + self.epsilon) * -self.lr;
            param.add_value(&update);
        }
    }

    fn zero_grad(&self) {
        for param in self.parameters.iter() {
            param.zero_grad();
        }
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::nn::{Activation, Mlp};

    #[test]
    fn adam_minimizes_quadratic() {
        let w = Tensor::new(array![0.0].into_dyn());
        let mut optimiser = AdamOptimizer::new_with_defaults(0.05, vec![w.clone()]);
        let initial = 9.0;
        for _ in 0..200 {
            optimiser.zero_grad();
            let diff = w.clone() + -3.0;
            let loss = (diff.clone() * diff).sum();
            loss.backward();
            optimiser.step();
        }
        let final_loss = (w.data()[0] - 3.0).powi(2);
        assert!(final_loss < initial / 10.0, "loss {final_loss}");
        assert_eq!(optimiser.steps(), 200);
    }

    #[test]
    fn test_adam_optimizer_on_mlp() {
        let mut rng = StdRng::seed_from_u64(11);
        let mlp = Mlp::new(3, 16, 1, 2, Activation::Linear, &mut rng);
        let before: Vec<Vec<f32>> = mlp.layers().iter().map(|l| l.weight_values()).collect();

        let mut optimiser = AdamOptimizer::new(0.001, 0.9, 0.999, 1e-8, mlp.parameters());
        let input = Tensor::new(array![[1.0, 2.0, 3.0], [0.5, -1.0, 0.0]].into_dyn());
        let expected = Tensor::new(array![[1.0, 0.0], [0.0, 1.0]].into_dyn());
        let diff = mlp.forward(&input) + -expected;
        let loss = (diff.clone() * diff).sum();
        loss.backward();
        optimiser.step();

        let after: Vec<Vec<f32>> = mlp.layers().iter().map(|l| l.weight_values()).collect();
        assert_ne!(before, after);
    }

    #[test]
    fn state_round_trip_restores_moments() {
        let w = Tensor::new(array![[1.0, 2.0], [3.0, 4.0]].into_dyn());
        let mut optimiser = AdamOptimizer::new_with_defaults(0.01, vec![w.clone()]);
        (w.clone() * w.clone()).sum().backward();
        optimiser.step();

        let state = optimiser.state();
        assert_eq!(state.step, 1);
        assert_eq!(state.first_moments[0].len(), 4);

        let restored = AdamOptimizer::from_state(&state, vec![w.clone()]).unwrap();
        assert_eq!(restored.state(), state);
    }

    #[test]
    fn from_state_rejects_mismatched_moments() {
        let w = Tensor::new(array![1.0, 2.0].into_dyn());
        let mut state = AdamOptimizer::new_with_defaults(0.01, vec![w.clone()]).state();
        state.first_moments[0].push(0.0);
        assert!(AdamOptimizer::from_state(&state, vec![w]).is_err());
    }
}
