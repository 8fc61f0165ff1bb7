//! Decision policies mapping observations to jump signals.

use crate::schema::{Activation, Genome};

use super::evolution::EvolutionError;

/// Anything that turns an observation into an output vector.
///
/// The session only reads the first output and jumps when it exceeds the
/// configured threshold.
pub trait Policy {
    fn activate(&self, observation: &[f32]) -> Vec<f32>;
}

impl<F> Policy for F
where
    F: Fn(&[f32]) -> Vec<f32>,
{
    fn activate(&self, observation: &[f32]) -> Vec<f32> {
        self(observation)
    }
}

/// Dense layer with pre-validated shapes.
#[derive(Debug, Clone)]
struct DenseLayer {
    inputs: usize,
    outputs: usize,
    weights: Vec<f32>,
    biases: Vec<f32>,
}

impl DenseLayer {
    fn forward(&self, input: &[f32], activation: Activation, output: &mut Vec<f32>) {
        output.clear();
        output.extend((0..self.outputs).map(|o| {
            let row = &self.weights[o * self.inputs..(o + 1) * self.inputs];
            let sum: f32 = row.iter().zip(input).map(|(w, x)| w * x).sum();
            activation.apply(sum + self.biases[o])
        }));
    }
}

/// Fully connected feed-forward network decoded from a genome.
#[derive(Debug, Clone)]
pub struct FeedForwardNetwork {
    layers: Vec<DenseLayer>,
    activation: Activation,
}

impl FeedForwardNetwork {
    /// Decode a genome. Fails if layer shapes do not chain.
    pub fn from_genome(genome: &Genome, activation: Activation) -> Result<Self, EvolutionError> {
        if !genome.is_well_formed() {
            return Err(EvolutionError::InvalidGenome);
        }

        let layers = genome
            .layers
            .iter()
            .map(|l| DenseLayer {
                inputs: l.inputs,
                outputs: l.outputs,
                weights: l.weights.clone(),
                biases: l.biases.clone(),
            })
            .collect();

        Ok(Self { layers, activation })
    }

    pub fn inputs(&self) -> usize {
        self.layers.first().map_or(0, |l| l.inputs)
    }

    pub fn outputs(&self) -> usize {
        self.layers.last().map_or(0, |l| l.outputs)
    }
}

impl Policy for FeedForwardNetwork {
    fn activate(&self, observation: &[f32]) -> Vec<f32> {
        let mut current = observation.to_vec();
        let mut next = Vec::new();
        for layer in &self.layers {
            layer.forward(&current, self.activation, &mut next);
            std::mem::swap(&mut current, &mut next);
        }
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{LayerGenome, NetworkConfig};

    fn single_layer(weights: Vec<f32>, bias: f32) -> Genome {
        Genome {
            layers: vec![LayerGenome {
                inputs: 3,
                outputs: 1,
                weights,
                biases: vec![bias],
            }],
        }
    }

    #[test]
    fn test_closure_policy() {
        let policy = |obs: &[f32]| vec![obs[0] * 2.0];
        assert_eq!(policy.activate(&[1.5, 0.0, 0.0]), vec![3.0]);
    }

    #[test]
    fn test_zeroed_network_outputs_activation_of_zero() {
        let genome = Genome::zeroed(&NetworkConfig::default());
        let tanh = FeedForwardNetwork::from_genome(&genome, Activation::Tanh).unwrap();
        assert_eq!(tanh.activate(&[350.0, 10.0, 20.0]), vec![0.0]);

        let sigmoid = FeedForwardNetwork::from_genome(&genome, Activation::Sigmoid).unwrap();
        assert_eq!(sigmoid.activate(&[350.0, 10.0, 20.0]), vec![0.5]);
    }

    #[test]
    fn test_weighted_sum() {
        let genome = single_layer(vec![1.0, -1.0, 0.5], 0.25);
        let net = FeedForwardNetwork::from_genome(&genome, Activation::Identity).unwrap();
        // 2 - 1 + 1 + 0.25
        assert_eq!(net.activate(&[2.0, 1.0, 2.0]), vec![2.25]);
    }

    #[test]
    fn test_hidden_layers_chain() {
        let network = NetworkConfig {
            hidden: vec![4, 2],
            outputs: 2,
            activation: Activation::Relu,
            ..Default::default()
        };
        let mut genome = Genome::zeroed(&network);
        for gene in genome.genes_mut() {
            *gene = 1.0;
        }
        let net = FeedForwardNetwork::from_genome(&genome, network.activation).unwrap();
        assert_eq!(net.inputs(), 3);
        assert_eq!(net.outputs(), 2);

        // hidden1 = 1+1+1+1 = 4 each, hidden2 = 4*4+1 = 17, out = 2*17+1 = 35
        assert_eq!(net.activate(&[1.0, 1.0, 1.0]), vec![35.0, 35.0]);
    }

    #[test]
    fn test_malformed_genome_is_rejected() {
        let genome = single_layer(vec![1.0, 2.0], 0.0);
        assert!(matches!(
            FeedForwardNetwork::from_genome(&genome, Activation::Tanh),
            Err(EvolutionError::InvalidGenome)
        ));

        let empty = Genome { layers: Vec::new() };
        assert!(FeedForwardNetwork::from_genome(&empty, Activation::Tanh).is_err());
    }
}
