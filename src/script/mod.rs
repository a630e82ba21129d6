//! Declarative request steps from the config file, run as a [`TestScript`].
mod step;


use async_trait::async_trait;
use tracing::debug;

use crate::config::types::StepConfig;
use crate::engine::{TestScript, VuContext};
use crate::error::{ConfigError, ScriptError};

use step::Step;

/// Runs its steps in order once per iteration.
#[derive(Debug, Clone)]
pub struct StepScript {
    steps: Vec<Step>,
}

impl StepScript {
    /// # Errors
    ///
    /// Returns an error when no steps are given or a step is malformed.
    pub fn from_config(steps: &[StepConfig]) -> Result<Self, ConfigError> {
        if steps.is_empty() {
            return Err(ConfigError::MissingSteps);
        }
        let steps = steps
            .iter()
            .enumerate()
            .map(|(index, config)| Step::from_config(index, config))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { steps })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

#[async_trait]
impl TestScript for StepScript {
    type Data = ();

    async fn setup(&self, _ctx: &mut VuContext) -> Result<Self::Data, ScriptError> {
        debug!("Step script with {} step(s) ready", self.steps.len());
        Ok(())
    }

    async fn iteration(&self, ctx: &mut VuContext, _data: &Self::Data) -> Result<(), ScriptError> {
        for step in &self.steps {
            step.run(ctx).await?;
        }
        Ok(())
    }
}
