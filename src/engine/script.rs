use async_trait::async_trait;

use crate::error::ScriptError;

use super::VuContext;

/// A load test: one setup, many concurrent iterations, one teardown.
///
/// `setup` runs once before any execution starts; its data is shared by
/// reference with every iteration and with `teardown`. An error from
/// `iteration` only fails that iteration.
#[async_trait]
pub trait TestScript: Send + Sync + 'static {
    type Data: Send + Sync + 'static;

    /// # Errors
    ///
    /// An error aborts the test before any load is generated.
    async fn setup(&self, ctx: &mut VuContext) -> Result<Self::Data, ScriptError>;

    /// # Errors
    ///
    /// An error is counted in `iterations_failed`.
    async fn iteration(&self, ctx: &mut VuContext, data: &Self::Data) -> Result<(), ScriptError>;

    /// # Errors
    ///
    /// An error is logged and attached to the result.
    async fn teardown(&self, _ctx: &mut VuContext, _data: &Self::Data) -> Result<(), ScriptError> {
        Ok(())
    }
}
