//! Per-step training scalars

use super::sink::MetricsSink;
use crate::rl::Agent;
use anyhow::Result;

pub const AVERAGE_Q: &str = "average_q";
pub const AVERAGE_LOSS: &str = "average_loss";

/// Forwards the agent's running averages to a sink after every training step
///
/// Parameter and gradient norms the agent captured during the step go out
/// at the same step, as `<param>/param_norm` and `<param>/grad_norm`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TrainingStepObserver;

impl TrainingStepObserver {
    pub fn new() -> Self {
        Self
    }

    pub fn observe<A: Agent + ?Sized>(
        &self,
        agent: &mut A,
        step: u64,
        sink: &mut dyn MetricsSink,
    ) -> Result<()> {
        sink.scalar(AVERAGE_Q, agent.average_q(), step)?;
        sink.scalar(AVERAGE_LOSS, agent.average_loss(), step)?;
        for norms in agent.take_parameter_norms() {
            sink.scalar(&norms.param_scalar_name(), norms.param_norm, step)?;
            sink.scalar(&norms.grad_scalar_name(), norms.grad_norm, step)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MemorySink;
    use crate::rl::ParameterNorms;
    use crate::testing::StubAgent;

    #[test]
    fn test_emits_both_scalars_at_step() {
        let mut agent = StubAgent::new(3).with_averages(0.75, 0.125);
        let mut sink = MemorySink::new();

        TrainingStepObserver::new().observe(&mut agent, 42, &mut sink).unwrap();

        assert_eq!(sink.series(AVERAGE_Q), vec![(42, 0.75)]);
        assert_eq!(sink.series(AVERAGE_LOSS), vec![(42, 0.125)]);
        assert_eq!(sink.events().len(), 2);
    }

    #[test]
    fn test_parameter_norms_emitted_once() {
        let mut agent = StubAgent::new(0).with_pending_norms(vec![ParameterNorms {
            name: "fc1.weight".to_string(),
            param_norm: 2.5,
            grad_norm: 0.5,
        }]);
        let mut sink = MemorySink::new();
        let observer = TrainingStepObserver::new();

        observer.observe(&mut agent, 7, &mut sink).unwrap();
        observer.observe(&mut agent, 8, &mut sink).unwrap();

        assert_eq!(sink.series("fc1.weight/param_norm"), vec![(7, 2.5)]);
        assert_eq!(sink.series("fc1.weight/grad_norm"), vec![(7, 0.5)]);
        assert_eq!(sink.count(AVERAGE_Q), 2);
    }
}
