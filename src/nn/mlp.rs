use rand::Rng;

use crate::tensor::Tensor;

use super::{Activation, LinearLayer};

/// Stack of dense layers: `hidden_layers` relu layers of width `hidden`, then an output layer.
#[derive(Debug, Clone)]
pub struct Mlp {
    layers: Vec<LinearLayer>,
}

impl Mlp {
    pub fn new<R: Rng + ?Sized>(
        units_in: usize,
        hidden: usize,
        hidden_layers: usize,
        units_out: usize,
        output_activation: Activation,
        rng: &mut R,
    ) -> Mlp {
        let mut layers = Vec::with_capacity(hidden_layers + 1);
        let mut width = units_in;
        for _ in 0..hidden_layers {
            layers.push(LinearLayer::new(width, hidden, Activation::Relu, rng));
            width = hidden;
        }
        layers.push(LinearLayer::new(width, units_out, output_activation, rng));
        Mlp { layers }
    }

    pub fn from_layers(layers: Vec<LinearLayer>) -> Mlp {
        Mlp { layers }
    }

    pub fn forward(&self, x: &Tensor) -> Tensor {
        let mut x = x.clone();
        for layer in self.layers.iter() {
            x = layer.forward(&x);
        }
        x
    }

    pub fn parameters(&self) -> Vec<Tensor> {
        self.layers
            .iter()
            .flat_map(|layer| layer.parameters())
            .collect()
    }

    pub fn layers(&self) -> &[LinearLayer] {
        &self.layers
    }
}
