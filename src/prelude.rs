pub use crate::client::{HttpClient, ReqwestClient, SwarmResponse};
pub use crate::config::SwarmConfiguration;
pub use crate::logger::{DiagnosticWriter, StdoutDiagnostics};
pub use crate::swarm::{
    Behavior, Pacing, Scheduler, SwarmUser, Task, TaskError, TaskFunction, TaskResult,
};
pub use crate::{task, SwarmAttack, SwarmError, SwarmSummary};
