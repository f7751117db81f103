//! Online policy-gradient (REINFORCE) learning from a sliding experience window.
//!
//! Experiences accumulate in a fixed-capacity FIFO. Once the buffer is full and
//! the frame timer has elapsed, the whole buffer is used as one batch: returns
//! are discounted and normalized, score-function gradients are backpropagated
//! through the current weights, and a single gradient-ascent step is applied.

use super::actions::{ActionDetail, STD_FLOOR};
use super::network::PolicyNetwork;
use crate::config::LearningConfig;
use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// One tick of recorded behavior
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Experience {
    pub state: Vec<f64>,
    pub action_details: Vec<ActionDetail>,
    pub reward: f64,
}

/// Fixed-capacity FIFO of experiences
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExperienceBuffer {
    capacity: usize,
    entries: VecDeque<Experience>,
}

impl ExperienceBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    /// Append, evicting the oldest entry when full
    pub fn push(&mut self, experience: Experience) {
        if self.capacity == 0 {
            return;
        }
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(experience);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.entries.len() == self.capacity
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Oldest first
    pub fn iter(&self) -> impl Iterator<Item = &Experience> {
        self.entries.iter()
    }

    /// Contiguous view of the entries, oldest first
    pub fn as_batch(&mut self) -> &[Experience] {
        self.entries.make_contiguous()
    }
}

/// `G_t = r_t + γ·G_{t+1}`, scanning backwards
pub fn discounted_returns(rewards: &[f64], gamma: f64) -> Vec<f64> {
    let mut returns = vec![0.0; rewards.len()];
    let mut running = 0.0;
    for (t, &r) in rewards.iter().enumerate().rev() {
        running = r + gamma * running;
        returns[t] = running;
    }
    returns
}

/// `(G_t − mean) / (std + ε)` using the population standard deviation
pub fn normalize_returns(returns: &[f64], epsilon: f64) -> Vec<f64> {
    if returns.is_empty() {
        return Vec::new();
    }
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let std = (returns.iter().map(|g| (g - mean).powi(2)).sum::<f64>() / n).sqrt();
    returns.iter().map(|g| (g - mean) / (std + epsilon)).collect()
}

/// Gradient of `log N(sampled; mean, std)` w.r.t. the raw mean and raw log-std outputs
#[inline]
pub fn log_prob_gradients(detail: &ActionDetail, epsilon: f64) -> (f64, f64) {
    let diff = detail.sampled_value - detail.mean;
    let std = detail.std_dev;
    let d_mean = diff / (std * std + epsilon);
    let d_std = diff * diff / (std * std * std + epsilon) - 1.0 / (std + epsilon);
    // d std / d raw = exp(raw) = std − floor
    let d_log_std = d_std * (std - STD_FLOOR);
    (d_mean, d_log_std)
}

/// Summed parameter gradients for one batch
#[derive(Clone, Debug)]
pub struct Gradients {
    pub weights_ih: Array2<f64>,
    pub biases_h: Array1<f64>,
    pub weights_ho: Array2<f64>,
    pub biases_o: Array1<f64>,
}

impl Gradients {
    fn zeros(network: &PolicyNetwork) -> Self {
        Self {
            weights_ih: Array2::zeros(network.hidden.weights.dim()),
            biases_h: Array1::zeros(network.hidden.biases.len()),
            weights_ho: Array2::zeros(network.output.weights.dim()),
            biases_o: Array1::zeros(network.output.biases.len()),
        }
    }

    fn is_finite(&self) -> bool {
        self.weights_ih.iter().all(|g| g.is_finite())
            && self.biases_h.iter().all(|g| g.is_finite())
            && self.weights_ho.iter().all(|g| g.is_finite())
            && self.biases_o.iter().all(|g| g.is_finite())
    }
}

#[inline]
fn outer(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> Array2<f64> {
    a.insert_axis(Axis(1)).dot(&b.insert_axis(Axis(0)))
}

/// Check that every experience fits the network's current shapes
fn batch_fits(network: &PolicyNetwork, batch: &[Experience]) -> bool {
    let topology = network.topology();
    batch.iter().all(|e| {
        e.state.len() == topology.input_size
            && e.action_details.iter().all(|d| d.slot + 1 < topology.output_size)
    })
}

/// Accumulate score-function gradients over a batch, weighted by `advantages`.
/// Hidden activations are recomputed from each stored state with the current weights.
pub fn compute_gradients(
    network: &PolicyNetwork,
    batch: &[Experience],
    advantages: &[f64],
    epsilon: f64,
) -> Gradients {
    let mut grads = Gradients::zeros(network);
    let output_size = network.output.biases.len();

    for (experience, &advantage) in batch.iter().zip(advantages) {
        let hidden = network.hidden_activations(&experience.state);

        let mut output_grad = Array1::<f64>::zeros(output_size);
        for detail in &experience.action_details {
            let (d_mean, d_log_std) = log_prob_gradients(detail, epsilon);
            output_grad[detail.slot] += advantage * d_mean;
            output_grad[detail.slot + 1] += advantage * d_log_std;
        }

        grads.weights_ho += &outer(output_grad.view(), hidden.view());
        grads.biases_o += &output_grad;

        let back = network.output.weights.t().dot(&output_grad);
        let hidden_error = &back * &hidden.mapv(|h| 1.0 - h * h);

        let state = ArrayView1::from(experience.state.as_slice());
        grads.weights_ih += &outer(hidden_error.view(), state);
        grads.biases_h += &hidden_error;
    }

    grads
}

/// Result of a training attempt
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrainOutcome {
    /// Weights updated; carries the batch's mean discounted return
    Applied { mean_return: f64 },
    /// Batch discarded without touching the weights
    Rejected,
}

/// REINFORCE learner state attached to a brain
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReinforceTrainer {
    pub learning_rate: f64,
    pub discount_factor: f64,
    pub epsilon: f64,
    pub update_count: u64,
    pub rejected_batches: u64,
}

impl ReinforceTrainer {
    pub fn new(learning_rate: f64, discount_factor: f64, epsilon: f64) -> Self {
        Self {
            learning_rate,
            discount_factor,
            epsilon,
            update_count: 0,
            rejected_batches: 0,
        }
    }

    pub fn from_config(config: &LearningConfig) -> Self {
        Self::new(config.learning_rate, config.discount_factor, config.epsilon)
    }

    /// Run one gradient-ascent step over the whole batch.
    /// Nothing is written to the network unless every gradient is finite.
    pub fn train(&mut self, network: &mut PolicyNetwork, batch: &[Experience]) -> TrainOutcome {
        if batch.is_empty() || !batch_fits(network, batch) {
            self.rejected_batches += 1;
            return TrainOutcome::Rejected;
        }

        let rewards: Vec<f64> = batch.iter().map(|e| e.reward).collect();
        let returns = discounted_returns(&rewards, self.discount_factor);
        let advantages = normalize_returns(&returns, self.epsilon);
        let grads = compute_gradients(network, batch, &advantages, self.epsilon);

        if !grads.is_finite() {
            self.rejected_batches += 1;
            return TrainOutcome::Rejected;
        }

        let step = self.learning_rate / batch.len() as f64;
        network.hidden.weights.scaled_add(step, &grads.weights_ih);
        network.hidden.biases.scaled_add(step, &grads.biases_h);
        network.output.weights.scaled_add(step, &grads.weights_ho);
        network.output.biases.scaled_add(step, &grads.biases_o);
        self.update_count += 1;

        let mean_return = returns.iter().sum::<f64>() / returns.len() as f64;
        TrainOutcome::Applied { mean_return }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neural::actions::{self, gaussian_log_prob, ActionChannel, ActionLabel};
    use crate::neural::topology::{ActuatorKind, Topology};
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn topology() -> Topology {
        Topology {
            input_size: 6,
            hidden_size: 5,
            output_size: 4,
        }
    }

    fn label(node: usize) -> ActionLabel {
        ActionLabel {
            actuator: ActuatorKind::Eater,
            node,
            channel: ActionChannel::Exertion,
        }
    }

    fn experience(network: &PolicyNetwork, rng: &mut ChaCha8Rng, reward: f64) -> Experience {
        let state: Vec<f64> = (0..network.topology().input_size)
            .map(|_| rng.gen_range(-1.0..1.0))
            .collect();
        let raw = network.forward(&state).raw_outputs.to_vec();
        let action_details = (0..raw.len() / 2)
            .map(|i| actions::sample(&raw, i * 2, label(i), rng))
            .collect();
        Experience {
            state,
            action_details,
            reward,
        }
    }

    fn batch(network: &PolicyNetwork, rng: &mut ChaCha8Rng) -> Vec<Experience> {
        (0..10).map(|t| experience(network, rng, (t as f64 * 0.7).sin())).collect()
    }

    #[test]
    fn test_buffer_fifo_eviction() {
        let mut buffer = ExperienceBuffer::new(10);
        for i in 0..11 {
            buffer.push(Experience {
                state: vec![i as f64],
                action_details: Vec::new(),
                reward: i as f64,
            });
        }
        assert_eq!(buffer.len(), 10);
        assert!(buffer.is_full());
        assert_eq!(buffer.iter().next().unwrap().reward, 1.0);
        assert_eq!(buffer.iter().last().unwrap().reward, 10.0);
    }

    #[test]
    fn test_discounted_returns_geometric() {
        let gamma: f64 = 0.99;
        let returns = discounted_returns(&[1.0; 10], gamma);
        for (t, g) in returns.iter().enumerate() {
            let remaining = (10 - t) as i32;
            let expected = (1.0 - gamma.powi(remaining)) / (1.0 - gamma);
            assert!((g - expected).abs() < 1e-9, "t={t}: {g} vs {expected}");
        }
        assert!(returns.windows(2).all(|w| w[0] > w[1]));
    }

    #[test]
    fn test_normalized_returns_moments() {
        let normalized = normalize_returns(&[1.0, 2.0, 3.0, 4.0], 1e-8);
        let mean = normalized.iter().sum::<f64>() / 4.0;
        let var = normalized.iter().map(|a| (a - mean).powi(2)).sum::<f64>() / 4.0;
        assert!(mean.abs() < 1e-12);
        assert!((var - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_constant_returns_normalize_to_zero() {
        let normalized = normalize_returns(&[2.0; 5], 1e-8);
        assert!(normalized.iter().all(|a| *a == 0.0));
    }

    #[test]
    fn test_log_prob_gradients_match_finite_differences() {
        let mut rng = ChaCha8Rng::seed_from_u64(21);
        let (mean, raw_log_std) = (0.3, -0.2);
        let detail = actions::sample(&[mean, raw_log_std], 0, label(0), &mut rng);
        let (d_mean, d_log_std) = log_prob_gradients(&detail, 1e-12);

        let h = 1e-6;
        let lp =
            |m: f64, s: f64| gaussian_log_prob(detail.sampled_value, m, actions::std_from_raw(s));
        let fd_mean = (lp(mean + h, raw_log_std) - lp(mean - h, raw_log_std)) / (2.0 * h);
        let fd_std = (lp(mean, raw_log_std + h) - lp(mean, raw_log_std - h)) / (2.0 * h);

        assert!((d_mean - fd_mean).abs() < 1e-5);
        assert!((d_log_std - fd_std).abs() < 1e-5);
    }

    #[test]
    fn test_gradients_match_objective_finite_differences() {
        let mut rng = ChaCha8Rng::seed_from_u64(22);
        let network = PolicyNetwork::new(topology(), &mut rng);
        let batch = batch(&network, &mut rng);
        let advantages: Vec<f64> = (0..batch.len()).map(|t| t as f64 - 4.5).collect();
        let grads = compute_gradients(&network, &batch, &advantages, 1e-12);

        // Σ_t A_t Σ_a log π(a_t | s_t) with the sampled actions held fixed
        let objective = |net: &PolicyNetwork| -> f64 {
            batch
                .iter()
                .zip(&advantages)
                .map(|(e, a)| {
                    let raw = net.forward(&e.state).raw_outputs;
                    let lp: f64 = e
                        .action_details
                        .iter()
                        .map(|d| {
                            gaussian_log_prob(
                                d.sampled_value,
                                raw[d.slot],
                                actions::std_from_raw(raw[d.slot + 1]),
                            )
                        })
                        .sum();
                    a * lp
                })
                .sum()
        };

        let h = 1e-6;
        for &(i, j) in &[(0, 0), (2, 3), (4, 5)] {
            let mut plus = network.clone();
            let mut minus = network.clone();
            plus.hidden.weights[[i, j]] += h;
            minus.hidden.weights[[i, j]] -= h;
            let fd = (objective(&plus) - objective(&minus)) / (2.0 * h);
            assert!((grads.weights_ih[[i, j]] - fd).abs() < 1e-4, "ih[{i},{j}]");
        }
        for &(i, j) in &[(0, 0), (1, 4), (3, 2)] {
            let mut plus = network.clone();
            let mut minus = network.clone();
            plus.output.weights[[i, j]] += h;
            minus.output.weights[[i, j]] -= h;
            let fd = (objective(&plus) - objective(&minus)) / (2.0 * h);
            assert!((grads.weights_ho[[i, j]] - fd).abs() < 1e-4, "ho[{i},{j}]");
        }
    }

    #[test]
    fn test_doubling_learning_rate_doubles_update() {
        let mut rng = ChaCha8Rng::seed_from_u64(23);
        let network = PolicyNetwork::new(topology(), &mut rng);
        let batch = batch(&network, &mut rng);

        let mut slow = network.clone();
        let mut fast = network.clone();
        let mut slow_trainer = ReinforceTrainer::new(0.001, 0.99, 1e-8);
        let mut fast_trainer = ReinforceTrainer::new(0.002, 0.99, 1e-8);
        assert!(matches!(slow_trainer.train(&mut slow, &batch), TrainOutcome::Applied { .. }));
        assert!(matches!(fast_trainer.train(&mut fast, &batch), TrainOutcome::Applied { .. }));

        let slow_delta = &slow.output.weights - &network.output.weights;
        let fast_delta = &fast.output.weights - &network.output.weights;
        assert!(slow_delta.iter().any(|d| d.abs() > 1e-9));
        for (s, f) in slow_delta.iter().zip(fast_delta.iter()) {
            assert!((f - 2.0 * s).abs() < 1e-12);
        }
        let slow_delta = &slow.hidden.weights - &network.hidden.weights;
        let fast_delta = &fast.hidden.weights - &network.hidden.weights;
        for (s, f) in slow_delta.iter().zip(fast_delta.iter()) {
            assert!((f - 2.0 * s).abs() < 1e-12);
        }
    }

    #[test]
    fn test_training_raises_log_prob_of_best_action() {
        let mut rng = ChaCha8Rng::seed_from_u64(24);
        let mut network = PolicyNetwork::new(topology(), &mut rng);
        let mut batch = batch(&network, &mut rng);
        for (t, e) in batch.iter_mut().enumerate() {
            e.reward = if t == 9 { 10.0 } else { 0.0 };
            if t != 9 {
                e.action_details.clear();
            }
        }
        let last = batch[9].clone();
        let lp = |net: &PolicyNetwork| -> f64 {
            let raw = net.forward(&last.state).raw_outputs;
            last.action_details
                .iter()
                .map(|d| {
                    let std = actions::std_from_raw(raw[d.slot + 1]);
                    gaussian_log_prob(d.sampled_value, raw[d.slot], std)
                })
                .sum()
        };

        let before = lp(&network);
        let mut trainer = ReinforceTrainer::new(0.05, 0.0, 1e-8);
        trainer.train(&mut network, &batch);
        assert!(lp(&network) > before);
    }

    #[test]
    fn test_mismatched_batch_is_rejected_untouched() {
        let mut rng = ChaCha8Rng::seed_from_u64(25);
        let mut network = PolicyNetwork::new(topology(), &mut rng);
        let mut batch = batch(&network, &mut rng);
        batch[3].state.push(0.0);
        let before = network.clone();

        let mut trainer = ReinforceTrainer::new(0.001, 0.99, 1e-8);
        assert_eq!(trainer.train(&mut network, &batch), TrainOutcome::Rejected);
        assert_eq!(network, before);
        assert_eq!(trainer.rejected_batches, 1);
    }

    #[test]
    fn test_non_finite_batch_is_rejected_untouched() {
        let mut rng = ChaCha8Rng::seed_from_u64(26);
        let mut network = PolicyNetwork::new(topology(), &mut rng);
        let mut batch = batch(&network, &mut rng);
        batch[0].reward = f64::NAN;
        let before = network.clone();

        let mut trainer = ReinforceTrainer::new(0.001, 0.99, 1e-8);
        assert_eq!(trainer.train(&mut network, &batch), TrainOutcome::Rejected);
        assert_eq!(network, before);
    }

    #[test]
    fn test_mean_return_reported() {
        let mut rng = ChaCha8Rng::seed_from_u64(27);
        let mut network = PolicyNetwork::new(topology(), &mut rng);
        let mut batch = batch(&network, &mut rng);
        for e in &mut batch {
            e.reward = 1.0;
        }
        let mut trainer = ReinforceTrainer::new(0.001, 0.0, 1e-8);
        assert_eq!(
            trainer.train(&mut network, &batch),
            TrainOutcome::Applied { mean_return: 1.0 }
        );
    }
}
