mod executor;
mod lifecycle;
mod model;
mod policy;

pub use executor::{ActionOutcome, RemediationExecutor};
pub use lifecycle::{
    ActiveLifecycleProvider, DockerCliProvider, LifecycleError, LifecycleProvider,
    SimulatedLifecycleProvider,
};
pub use model::{ActionType, RemediationAction};
pub use policy::{ActionPlan, plan_for};

#[cfg(test)]
pub(crate) use lifecycle::{MockLifecycleProvider, MockStep};
