//! Helpers and objects for building swarm behaviors.
//!
//! A swarm is managed with a handful of objects:
//!
//! - [`Behavior`](./struct.Behavior.html) a named collection of tasks plus the pacing
//!   interval users wait between them.
//! - [`Task`](./struct.Task.html) a named, weighted async function that makes one request.
//! - [`SwarmUser`](./struct.SwarmUser.html) the state a simulated user carries into each
//!   task: its client, its random source, and where diagnostics go.
//! - [`Scheduler`](./trait.Scheduler.html) the interface behaviors are declared through.
//!
//! ## Declaring a behavior
//!
//! ```rust
//! use tweetswarm::prelude::*;
//!
//! fn declare<S: Scheduler>(scheduler: &mut S) -> Result<(), SwarmError> {
//!     scheduler.register_task(task!(ping).set_name("ping"))?;
//!     scheduler.register_task(task!(ping).set_name("ping twice").set_weight(2)?)?;
//!     scheduler.set_pacing(0.5, 1.0)
//! }
//!
//! async fn ping(user: &mut SwarmUser) -> TaskResult {
//!     let _response = user.get("/ping").await?;
//!
//!     Ok(())
//! }
//!
//! let mut behavior = Behavior::new("pinger");
//! declare(&mut behavior).unwrap();
//! assert_eq!(behavior.tasks.len(), 2);
//! ```

use rand::rngs::StdRng;
use rand::Rng;
use serde_json::Value;
use std::sync::Arc;
use std::{fmt, future::Future, pin::Pin, time::Duration};

use crate::client::{HttpClient, SwarmResponse};
use crate::logger::DiagnosticWriter;
use crate::util;
use crate::SwarmError;

/// task!(foo) expands to Task::new(foo), but also does some boxing to work around a
/// limitation in the compiler.
#[macro_export]
macro_rules! task {
    ($task_func:ident) => {
        $crate::swarm::Task::new(std::sync::Arc::new(move |s| {
            std::boxed::Box::pin($task_func(s))
        }))
    };
}

/// The function signature every task implements.
pub type TaskFunction = Arc<
    dyn for<'r> Fn(&'r mut SwarmUser) -> Pin<Box<dyn Future<Output = TaskResult> + Send + 'r>>
        + Send
        + Sync,
>;

/// Tasks return `Ok(())` for every HTTP response the server sends, including errors.
/// Only transport failures are returned as a [`TaskError`].
pub type TaskResult = Result<(), TaskError>;

/// Why a task could not complete its request.
#[derive(Debug)]
pub enum TaskError {
    /// Wraps a [`reqwest::Error`](https://docs.rs/reqwest/*/reqwest/struct.Error.html).
    Reqwest(reqwest::Error),
    /// Wraps a [`url::ParseError`](https://docs.rs/url/*/url/enum.ParseError.html).
    Url(url::ParseError),
}
impl TaskError {
    fn describe(&self) -> &str {
        match *self {
            TaskError::Reqwest(_) => "reqwest::Error",
            TaskError::Url(_) => "url::ParseError",
        }
    }
}

impl fmt::Display for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            TaskError::Reqwest(ref source) => {
                write!(f, "TaskError: {} ({})", self.describe(), source)
            }
            TaskError::Url(ref source) => write!(f, "TaskError: {} ({})", self.describe(), source),
        }
    }
}

impl std::error::Error for TaskError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match *self {
            TaskError::Reqwest(ref source) => Some(source),
            TaskError::Url(ref source) => Some(source),
        }
    }
}

/// Auto-convert Reqwest errors.
impl From<reqwest::Error> for TaskError {
    fn from(err: reqwest::Error) -> TaskError {
        TaskError::Reqwest(err)
    }
}

/// Auto-convert Url errors.
impl From<url::ParseError> for TaskError {
    fn from(err: url::ParseError) -> TaskError {
        TaskError::Url(err)
    }
}

/// Commands sent from the parent to user threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwarmUserCommand {
    /// Finish the current task and exit.
    Exit,
}

/// The interface a behavior is declared through.
///
/// The scheduler owns concurrency, timing and task selection. A behavior only tells it
/// which tasks exist and how long users idle between them.
pub trait Scheduler {
    /// Add a task. Tasks with higher weight are selected proportionally more often.
    fn register_task(&mut self, task: Task) -> Result<(), SwarmError>;

    /// Declare the uniform idle interval, in seconds, between two tasks of one user.
    fn set_pacing(&mut self, min_wait: f64, max_wait: f64) -> Result<(), SwarmError>;
}

/// An individual task within a [`Behavior`](./struct.Behavior.html).
#[derive(Clone)]
pub struct Task {
    /// An index into [`Behavior`](./struct.Behavior.html)`.tasks`.
    pub tasks_index: usize,
    /// Name used in logs and by `--list`.
    pub name: String,
    /// An integer value that controls the frequency that this task will be run.
    pub weight: usize,
    /// A required function that is executed each time this task runs.
    pub function: TaskFunction,
}
impl Task {
    /// Wrap a task function with weight 1 and no name. Usually called through the
    /// [`task!`](../macro.task.html) macro.
    pub fn new(function: TaskFunction) -> Self {
        trace!("new task");
        Task {
            tasks_index: usize::MAX,
            name: "".to_string(),
            weight: 1,
            function,
        }
    }

    /// Set the name shown in logs and by `--list`.
    pub fn set_name(mut self, name: &str) -> Self {
        trace!("[{}] set_name: {}", self.tasks_index, name);
        self.name = name.to_string();
        self
    }

    /// Sets a weight on an individual task. A task with weight 3 runs three times as
    /// often as a task with weight 1 in the same behavior.
    pub fn set_weight(mut self, weight: usize) -> Result<Self, SwarmError> {
        trace!("{} [{}] set_weight: {}", self.name, self.tasks_index, weight);
        if weight == 0 {
            return Err(SwarmError::InvalidWeight {
                weight,
                detail: "Weight must be set to at least 1.".to_string(),
            });
        }
        self.weight = weight;
        Ok(self)
    }
}
impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Task")
            .field("tasks_index", &self.tasks_index)
            .field("name", &self.name)
            .field("weight", &self.weight)
            .finish()
    }
}

/// Bounds of the uniformly sampled idle interval between two tasks.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pacing {
    min_wait: Duration,
    max_wait: Duration,
}
impl Pacing {
    /// Both bounds are in seconds and inclusive.
    pub fn new(min_wait: f64, max_wait: f64) -> Result<Self, SwarmError> {
        let invalid = |detail: &str| SwarmError::InvalidWaitTime {
            min_wait,
            max_wait,
            detail: detail.to_string(),
        };
        if !min_wait.is_finite() || !max_wait.is_finite() {
            return Err(invalid("Wait times must be finite."));
        }
        if min_wait < 0.0 {
            return Err(invalid("Wait times can not be negative."));
        }
        if min_wait > max_wait {
            return Err(invalid("min_wait can't be larger than max_wait."));
        }
        let to_duration = |seconds: f64| {
            Duration::try_from_secs_f64(seconds)
                .map_err(|e| invalid(&format!("Wait time {} is out of range ({}).", seconds, e)))
        };
        Ok(Pacing {
            min_wait: to_duration(min_wait)?,
            max_wait: to_duration(max_wait)?,
        })
    }

    /// Shortest idle interval.
    pub fn min_wait(&self) -> Duration {
        self.min_wait
    }

    /// Longest idle interval.
    pub fn max_wait(&self) -> Duration {
        self.max_wait
    }

    /// Draw one idle interval.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        if self.min_wait == self.max_wait {
            return self.min_wait;
        }
        Duration::from_secs_f64(
            rng.random_range(self.min_wait.as_secs_f64()..=self.max_wait.as_secs_f64()),
        )
    }
}

/// A named set of tasks, and the pacing its users follow.
#[derive(Clone, Debug)]
pub struct Behavior {
    /// The name of the behavior, selected with `--behavior`.
    pub name: String,
    /// One copy of each registered task.
    pub tasks: Vec<Task>,
    /// Indexes into `tasks`, each repeated by its weight (reduced by the gcd of all
    /// weights). Users pick uniformly from this list.
    pub weighted_tasks: Vec<usize>,
    /// Idle interval between tasks, no pause if not set.
    pub pacing: Option<Pacing>,
}
impl Behavior {
    /// Create an empty behavior. Tasks and pacing are declared through the
    /// [`Scheduler`](./trait.Scheduler.html) interface.
    pub fn new(name: &str) -> Self {
        trace!("new behavior: name: {}", &name);
        Behavior {
            name: name.to_string(),
            tasks: Vec::new(),
            weighted_tasks: Vec::new(),
            pacing: None,
        }
    }

    /// Human readable pacing, used by `--list`.
    pub fn describe_pacing(&self) -> String {
        match self.pacing {
            Some(pacing) => format!(
                "{:?} to {:?}",
                pacing.min_wait(),
                pacing.max_wait()
            ),
            None => "none".to_string(),
        }
    }

    // Rebuild the weighted list after the set of tasks changes.
    fn weight_tasks(&mut self) {
        let divisor = self
            .tasks
            .iter()
            .fold(0, |divisor, task| util::gcd(divisor, task.weight));
        self.weighted_tasks = self
            .tasks
            .iter()
            .flat_map(|task| std::iter::repeat(task.tasks_index).take(task.weight / divisor))
            .collect();
        debug!(
            "{} weighted tasks (gcd {}): {:?}",
            self.name, divisor, self.weighted_tasks
        );
    }
}

impl Scheduler for Behavior {
    fn register_task(&mut self, mut task: Task) -> Result<(), SwarmError> {
        trace!("{} register_task: {}", self.name, task.name);
        if task.weight == 0 {
            return Err(SwarmError::InvalidWeight {
                weight: task.weight,
                detail: format!("Task {} must have a weight of at least 1.", task.name),
            });
        }
        task.tasks_index = self.tasks.len();
        self.tasks.push(task);
        self.weight_tasks();
        Ok(())
    }

    fn set_pacing(&mut self, min_wait: f64, max_wait: f64) -> Result<(), SwarmError> {
        trace!(
            "{} set_pacing: min: {} max: {}",
            self.name,
            min_wait,
            max_wait
        );
        self.pacing = Some(Pacing::new(min_wait, max_wait)?);
        Ok(())
    }
}

/// The state a simulated user carries from task to task.
pub struct SwarmUser {
    /// Which user this is, in launch order.
    pub weighted_users_index: usize,
    client: Arc<dyn HttpClient>,
    rng: StdRng,
    diagnostics: Arc<dyn DiagnosticWriter>,
}
impl SwarmUser {
    /// Create a user sharing `client` and `diagnostics` with the rest of the swarm, and
    /// owning `rng`.
    pub fn new(
        weighted_users_index: usize,
        client: Arc<dyn HttpClient>,
        rng: StdRng,
        diagnostics: Arc<dyn DiagnosticWriter>,
    ) -> Self {
        trace!("new user {}", weighted_users_index);
        SwarmUser {
            weighted_users_index,
            client,
            rng,
            diagnostics,
        }
    }

    /// The random source owned by this user.
    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// POST a JSON body to `path`.
    pub async fn post(
        &self,
        path: &str,
        body: &Value,
        headers: &[(&str, &str)],
    ) -> Result<SwarmResponse, TaskError> {
        let response = self.client.post(path, body, headers).await?;
        debug!(
            "[user {}]: POST {} returned {}",
            self.weighted_users_index, path, response.status
        );
        Ok(response)
    }

    /// GET `path`.
    pub async fn get(&self, path: &str) -> Result<SwarmResponse, TaskError> {
        let response = self.client.get(path).await?;
        debug!(
            "[user {}]: GET {} returned {}",
            self.weighted_users_index, path, response.status
        );
        Ok(response)
    }

    /// Write a line to the diagnostic sink.
    pub fn diagnostic(&self, line: &str) {
        self.diagnostics.write_line(line);
    }
}
