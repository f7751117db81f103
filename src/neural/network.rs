//! Two-layer policy network and forward propagation.

use super::topology::Topology;
use ndarray::{Array1, Array2, ArrayView1};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Bias initialization half-range
const BIAS_INIT: f64 = 0.1;

/// A single affine layer: `weights` is (outputs × inputs)
#[derive(Clone, Debug, PartialEq)]
pub struct Layer {
    pub weights: Array2<f64>,
    pub biases: Array1<f64>,
}

impl Serialize for Layer {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;
        let shape = self.weights.shape();
        let weights_data: Vec<f64> = self.weights.iter().copied().collect();
        let biases_data: Vec<f64> = self.biases.iter().copied().collect();

        let mut state = serializer.serialize_struct("Layer", 3)?;
        state.serialize_field("shape", &[shape[0], shape[1]])?;
        state.serialize_field("weights", &weights_data)?;
        state.serialize_field("biases", &biases_data)?;
        state.end()
    }
}

impl<'de> Deserialize<'de> for Layer {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct LayerData {
            shape: [usize; 2],
            weights: Vec<f64>,
            biases: Vec<f64>,
        }

        let data = LayerData::deserialize(deserializer)?;
        if data.biases.len() != data.shape[0] {
            return Err(serde::de::Error::custom(format!(
                "bias length {} does not match {} rows",
                data.biases.len(),
                data.shape[0]
            )));
        }
        let weights = Array2::from_shape_vec((data.shape[0], data.shape[1]), data.weights)
            .map_err(serde::de::Error::custom)?;
        let biases = Array1::from_vec(data.biases);

        Ok(Layer { weights, biases })
    }
}

impl Layer {
    /// Fan-in scaled random layer with `outputs` rows and `inputs` columns
    pub fn random<R: Rng + ?Sized>(outputs: usize, inputs: usize, rng: &mut R) -> Self {
        let scale = 1.0 / (inputs.max(1) as f64).sqrt();
        let weights = Array2::from_shape_fn((outputs, inputs), |_| rng.gen_range(-scale..=scale));
        let biases = Array1::from_shape_fn(outputs, |_| rng.gen_range(-BIAS_INIT..=BIAS_INIT));
        Self { weights, biases }
    }

    /// (outputs, inputs)
    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        self.weights.dim()
    }

    /// `weights · input + biases`
    #[inline]
    pub fn affine(&self, input: ArrayView1<'_, f64>) -> Array1<f64> {
        self.weights.dot(&input) + &self.biases
    }

    fn is_finite(&self) -> bool {
        self.weights.iter().all(|w| w.is_finite()) && self.biases.iter().all(|b| b.is_finite())
    }
}

/// Activations produced by one forward pass
#[derive(Clone, Debug)]
pub struct ForwardPass {
    pub hidden: Array1<f64>,
    /// Interleaved (mean, log std) pairs, no output nonlinearity
    pub raw_outputs: Array1<f64>,
}

/// Input → tanh hidden → linear output network
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PolicyNetwork {
    /// Input to hidden, (hidden × input)
    pub hidden: Layer,
    /// Hidden to output, (output × hidden)
    pub output: Layer,
}

impl PolicyNetwork {
    /// Freshly initialized network for a topology
    pub fn new<R: Rng + ?Sized>(topology: Topology, rng: &mut R) -> Self {
        Self {
            hidden: Layer::random(topology.hidden_size, topology.input_size, rng),
            output: Layer::random(topology.output_size, topology.hidden_size, rng),
        }
    }

    /// Dimensions implied by the stored matrices
    pub fn topology(&self) -> Topology {
        let (hidden_size, input_size) = self.hidden.shape();
        Topology {
            input_size,
            hidden_size,
            output_size: self.output.shape().0,
        }
    }

    /// True if both layers are internally consistent and chain together
    pub fn is_consistent(&self) -> bool {
        let (h_rows, _) = self.hidden.shape();
        let (o_rows, o_cols) = self.output.shape();
        self.hidden.biases.len() == h_rows && self.output.biases.len() == o_rows && o_cols == h_rows
    }

    /// Reallocate both layers if either shape differs from `topology`.
    /// Returns true when a reallocation happened.
    pub fn ensure_shapes<R: Rng + ?Sized>(&mut self, topology: Topology, rng: &mut R) -> bool {
        if self.is_consistent() && self.topology() == topology {
            return false;
        }
        *self = Self::new(topology, rng);
        true
    }

    /// Hidden activations only: `tanh(W_ih · input + b_h)`
    pub fn hidden_activations(&self, input: &[f64]) -> Array1<f64> {
        let (_, input_size) = self.hidden.shape();
        assert_eq!(
            input.len(),
            input_size,
            "input length does not match network topology"
        );
        let mut hidden = self.hidden.affine(ArrayView1::from(input));
        hidden.mapv_inplace(f64::tanh);
        hidden
    }

    /// Full forward pass
    pub fn forward(&self, input: &[f64]) -> ForwardPass {
        let hidden = self.hidden_activations(input);
        let raw_outputs = self.output.affine(hidden.view());
        ForwardPass {
            hidden,
            raw_outputs,
        }
    }

    /// Get total number of parameters (weights + biases)
    pub fn parameter_count(&self) -> usize {
        [&self.hidden, &self.output]
            .iter()
            .map(|l| l.weights.len() + l.biases.len())
            .sum()
    }

    /// Check if network is usable (consistent shapes, no NaN/Inf)
    pub fn is_valid(&self) -> bool {
        self.is_consistent() && self.hidden.is_finite() && self.output.is_finite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn topology(input: usize, hidden: usize, output: usize) -> Topology {
        Topology {
            input_size: input,
            hidden_size: hidden,
            output_size: output,
        }
    }

    #[test]
    fn test_forward_lengths_across_topologies() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for hidden in [5, 12, 30] {
            for (input, output) in [(10, 2), (23, 12), (40, 30)] {
                let net = PolicyNetwork::new(topology(input, hidden, output), &mut rng);
                let pass = net.forward(&vec![0.25; input]);
                assert_eq!(pass.hidden.len(), hidden);
                assert_eq!(pass.raw_outputs.len(), output);
            }
        }
    }

    #[test]
    fn test_forward_is_deterministic() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let net = PolicyNetwork::new(topology(10, 8, 6), &mut rng);
        let input: Vec<f64> = (0..10).map(|i| i as f64 * 0.1 - 0.5).collect();
        let a = net.forward(&input);
        let b = net.forward(&input);
        assert_eq!(a.raw_outputs, b.raw_outputs);
        assert_eq!(a.hidden, b.hidden);
    }

    #[test]
    fn test_hidden_is_tanh_bounded() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let net = PolicyNetwork::new(topology(10, 20, 4), &mut rng);
        let hidden = net.hidden_activations(&[50.0; 10]);
        assert!(hidden.iter().all(|h| (-1.0..=1.0).contains(h)));
    }

    #[test]
    fn test_forward_matches_manual_computation() {
        let net = PolicyNetwork {
            hidden: Layer {
                weights: Array2::from_shape_vec((2, 2), vec![1.0, 0.0, 0.5, -1.0]).unwrap(),
                biases: Array1::from_vec(vec![0.0, 0.1]),
            },
            output: Layer {
                weights: Array2::from_shape_vec((2, 2), vec![2.0, 0.0, 0.0, -1.0]).unwrap(),
                biases: Array1::from_vec(vec![0.5, 0.0]),
            },
        };
        let pass = net.forward(&[0.3, 0.2]);
        let h0 = 0.3f64.tanh();
        let h1 = (0.15 - 0.2 + 0.1f64).tanh();
        assert!((pass.hidden[0] - h0).abs() < 1e-12);
        assert!((pass.hidden[1] - h1).abs() < 1e-12);
        assert!((pass.raw_outputs[0] - (2.0 * h0 + 0.5)).abs() < 1e-12);
        assert!((pass.raw_outputs[1] + h1).abs() < 1e-12);
    }

    #[test]
    fn test_ensure_shapes_keeps_matching_weights() {
        let mut rng = ChaCha8Rng::seed_from_u64(6);
        let mut net = PolicyNetwork::new(topology(10, 8, 6), &mut rng);
        let before = net.clone();
        assert!(!net.ensure_shapes(topology(10, 8, 6), &mut rng));
        assert_eq!(net, before);
    }

    #[test]
    fn test_ensure_shapes_reallocates_both_layers() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut net = PolicyNetwork::new(topology(10, 8, 6), &mut rng);
        assert!(net.ensure_shapes(topology(10, 8, 10), &mut rng));
        assert_eq!(net.topology(), topology(10, 8, 10));
        assert_eq!(net.hidden.biases.len(), 8);
        assert_eq!(net.output.biases.len(), 10);
    }

    #[test]
    fn test_initial_weights_are_small() {
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let net = PolicyNetwork::new(topology(16, 30, 8), &mut rng);
        let scale = 1.0 / 16f64.sqrt();
        assert!(net.hidden.weights.iter().all(|w| w.abs() <= scale));
        assert!(net.hidden.biases.iter().all(|b| b.abs() <= BIAS_INIT));
    }

    #[test]
    fn test_network_validity() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let mut net = PolicyNetwork::new(topology(10, 5, 2), &mut rng);
        assert!(net.is_valid());
        net.output.weights[[0, 0]] = f64::NAN;
        assert!(!net.is_valid());
    }

    #[test]
    #[should_panic(expected = "input length")]
    fn test_forward_rejects_wrong_length() {
        let mut rng = ChaCha8Rng::seed_from_u64(10);
        let net = PolicyNetwork::new(topology(10, 5, 2), &mut rng);
        net.forward(&[0.0; 9]);
    }

    #[test]
    fn test_serialization_is_exact() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let net = PolicyNetwork::new(topology(12, 7, 4), &mut rng);
        let serialized = bincode::serialize(&net).unwrap();
        let deserialized: PolicyNetwork = bincode::deserialize(&serialized).unwrap();
        assert_eq!(net, deserialized);
        for (a, b) in net.hidden.weights.iter().zip(deserialized.hidden.weights.iter()) {
            assert_eq!(a.to_bits(), b.to_bits());
        }
    }

    #[test]
    fn test_parameter_count() {
        let mut rng = ChaCha8Rng::seed_from_u64(12);
        let net = PolicyNetwork::new(topology(10, 5, 8), &mut rng);
        assert_eq!(net.parameter_count(), 10 * 5 + 5 + 5 * 8 + 8);
    }
}
